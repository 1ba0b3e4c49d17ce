mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{init, run, show, InitArgs, RunArgs, ShowArgs};
use config::Config;
use std::path::PathBuf;

/// Outline CLI - block-tree notes from the terminal
#[derive(Parser, Debug)]
#[command(name = "outline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log engine activity at debug level
    #[arg(long, global = true)]
    verbose: bool,

    /// Config file (defaults to outline.config.json in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize an article store and create an article
    Init(InitArgs),

    /// Print an article's block tree
    Show(ShowArgs),

    /// Replay an edit script against an article
    Run(RunArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();
    let config = Config::load(&cwd, cli.config.as_deref())?;

    match cli.command {
        Command::Init(args) => init(args, &cwd, &config).await,
        Command::Show(args) => show(args, &cwd, &config).await,
        Command::Run(args) => run(args, &cwd, &config).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = execute(cli).await {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
