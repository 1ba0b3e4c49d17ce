use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use outline_editor::{Article, ArticleId, BlockId, BlockTree};
use outline_workspace::ArticleStore;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Article id
    pub id: String,

    /// Print the stored JSON record instead of the tree
    #[arg(long)]
    pub json: bool,
}

pub async fn show(args: ShowArgs, cwd: &str, config: &Config) -> Result<()> {
    let store = ArticleStore::open(config.get_data_dir(cwd)).await?;
    let article = store.article(&ArticleId::new(args.id)).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&article.to_record())?);
    } else {
        print_article(&article);
    }
    Ok(())
}

pub fn print_article(article: &Article) {
    println!("{} {}", "📄".bold(), article.title.bold());
    for line in render_tree(article.tree()) {
        println!("{}", line);
    }
    println!(
        "   {} blocks, {} history entries",
        article.tree().len(),
        article.history().len()
    );
}

/// One line per block, indented by depth, with the block id dimmed
pub fn render_tree(tree: &BlockTree) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack: Vec<(&BlockId, usize)> = tree.roots().iter().rev().map(|id| (id, 0)).collect();

    while let Some((id, depth)) = stack.pop() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let marker = if node.collapsed && !node.children().is_empty() {
            "▸"
        } else {
            "•"
        };
        let text = if node.text.is_empty() {
            "(empty)".dimmed().to_string()
        } else {
            node.text.clone()
        };
        lines.push(format!(
            "{}{} {}  {}",
            "  ".repeat(depth + 1),
            marker,
            text,
            id.as_str().dimmed()
        ));

        stack.extend(node.children().iter().rev().map(|child| (child, depth + 1)));
    }
    lines
}
