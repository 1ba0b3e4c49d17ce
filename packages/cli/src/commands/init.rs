use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use outline_editor::ArticleId;
use outline_workspace::{article_path, ArticleStore};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Article id (also the file name, `<id>.json`)
    pub id: String,

    /// Article title
    #[arg(short, long)]
    pub title: Option<String>,
}

pub async fn init(args: InitArgs, cwd: &str, config: &Config) -> Result<()> {
    println!("{}", "📝 Initializing Outline article...".bright_blue().bold());

    // Write a default config the first time
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);
    if !config_path.exists() {
        fs::write(&config_path, serde_json::to_string_pretty(config)?)?;
        println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    }

    let data_dir = config.get_data_dir(cwd);
    let store = ArticleStore::open(&data_dir).await?;

    let id = ArticleId::new(args.id);
    let title = args.title.unwrap_or_else(|| id.to_string());
    let article = store.create_article(id, &title).await?;

    println!(
        "  {} Created {}",
        "✓".green(),
        article_path(&data_dir, article.id()).display()
    );
    println!();
    println!("✨ {} \"{}\" is ready", "Done".green().bold(), title);

    Ok(())
}
