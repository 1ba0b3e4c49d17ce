use crate::commands::show::print_article;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use outline_editor::{
    layout_regions, ArticleId, BlockId, ChangeKind, Direction, DispatchOutcome, EditSession, EditorError,
    PendingPreview, Point,
};
use outline_workspace::ArticleStore;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const ROW_HEIGHT: f64 = 32.0;
const ROW_WIDTH: f64 = 800.0;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Article id
    pub id: String,

    /// Edit script, one command per line
    pub script: PathBuf,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: `{command}` expects {expected}")]
    BadArguments {
        line: usize,
        command: &'static str,
        expected: &'static str,
    },
}

/// One line of an edit script
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    /// `add <label> <after|-> [text]`
    Add {
        label: String,
        after: Option<String>,
        text: String,
    },
    /// `text <block> [text]`
    Text { block: String, text: String },
    /// `move <block> up|down`
    Move { block: String, direction: Direction },
    Indent { block: String },
    Outdent { block: String },
    Delete { block: String },
    /// `drop <block> <x> <y>`: drag the block's row and release at (x, y)
    Drop { block: String, x: f64, y: f64 },
    Undo,
    Redo,
    Cancel,
    Show,
}

pub fn parse_script(source: &str) -> Result<Vec<(usize, ScriptCommand)>, ScriptError> {
    let mut commands = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (command, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
        let rest = rest.trim_start();
        let words: Vec<&str> = rest.split_whitespace().collect();
        let bad = |command: &'static str, expected: &'static str| ScriptError::BadArguments {
            line,
            command,
            expected,
        };

        let parsed = match command {
            "add" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                match (parts.next(), parts.next()) {
                    (Some(label), Some(after)) if !label.is_empty() => ScriptCommand::Add {
                        label: label.to_string(),
                        after: (after != "-").then(|| after.to_string()),
                        text: parts.next().unwrap_or("").trim().to_string(),
                    },
                    _ => return Err(bad("add", "a label and an anchor block (or `-`)")),
                }
            }
            "text" => match rest.split_once(char::is_whitespace) {
                Some((block, text)) => ScriptCommand::Text {
                    block: block.to_string(),
                    text: text.trim().to_string(),
                },
                None if !rest.is_empty() => ScriptCommand::Text {
                    block: rest.to_string(),
                    text: String::new(),
                },
                None => return Err(bad("text", "a block")),
            },
            "move" => match words.as_slice() {
                [block, "up"] => ScriptCommand::Move {
                    block: block.to_string(),
                    direction: Direction::Up,
                },
                [block, "down"] => ScriptCommand::Move {
                    block: block.to_string(),
                    direction: Direction::Down,
                },
                _ => return Err(bad("move", "a block and `up` or `down`")),
            },
            "indent" | "outdent" | "delete" => {
                let [block] = words.as_slice() else {
                    return Err(match command {
                        "indent" => bad("indent", "one block"),
                        "outdent" => bad("outdent", "one block"),
                        _ => bad("delete", "one block"),
                    });
                };
                let block = block.to_string();
                match command {
                    "indent" => ScriptCommand::Indent { block },
                    "outdent" => ScriptCommand::Outdent { block },
                    _ => ScriptCommand::Delete { block },
                }
            }
            "drop" => match words.as_slice() {
                [block, x, y] => match (x.parse(), y.parse()) {
                    (Ok(x), Ok(y)) => ScriptCommand::Drop {
                        block: block.to_string(),
                        x,
                        y,
                    },
                    _ => return Err(bad("drop", "a block and numeric x y")),
                },
                _ => return Err(bad("drop", "a block and numeric x y")),
            },
            "undo" => ScriptCommand::Undo,
            "redo" => ScriptCommand::Redo,
            "cancel" => ScriptCommand::Cancel,
            "show" => ScriptCommand::Show,
            other => {
                return Err(ScriptError::UnknownCommand {
                    line,
                    command: other.to_string(),
                })
            }
        };
        commands.push((line, parsed));
    }

    Ok(commands)
}

pub async fn run(args: RunArgs, cwd: &str, config: &Config) -> Result<()> {
    let source = fs::read_to_string(&args.script)?;
    let commands = parse_script(&source)?;
    tracing::debug!("Parsed {} commands from {}", commands.len(), args.script.display());

    let store = ArticleStore::open(config.get_data_dir(cwd)).await?;
    let article = store.article(&ArticleId::new(args.id)).await?;
    let mut session = EditSession::new("cli", article, store, config.editor.clone());

    println!("▶️  {} {} commands", "Running".green().bold(), commands.len());
    println!();

    let mut labels: HashMap<String, BlockId> = HashMap::new();
    if let Some(first) = session.article().tree().roots().first() {
        labels.insert("first".to_string(), first.clone());
    }

    let mut failures = 0;
    for (line, command) in commands {
        let result = execute(&mut session, &mut labels, &command).await;
        match result {
            Ok(outcome) => report(line, &command, &outcome),
            Err(err) if err.is_silent() => {
                println!("  {} line {}: skipped ({})", "·".dimmed(), line, err.to_string().dimmed());
            }
            Err(err) => {
                tracing::warn!("Line {} failed: {}", line, err);
                failures += 1;
                println!("  {} line {}: {}", "✗".red(), line, err);
            }
        }
    }

    println!();
    print_article(session.article());

    if failures > 0 {
        println!("   {} {}", "Failures:".red(), failures);
    }
    Ok(())
}

fn resolve(labels: &HashMap<String, BlockId>, block: &str) -> BlockId {
    labels
        .get(block)
        .cloned()
        .unwrap_or_else(|| BlockId::from(block))
}

async fn execute(
    session: &mut EditSession<ArticleStore>,
    labels: &mut HashMap<String, BlockId>,
    command: &ScriptCommand,
) -> Result<DispatchOutcome, EditorError> {
    match command {
        ScriptCommand::Add { label, after, text } => {
            let after = after.as_deref().map(|block| resolve(labels, block));
            let id = session.create_block(after.as_ref(), text.clone()).await?;
            labels.insert(label.clone(), id.clone());
            Ok(DispatchOutcome::TextApplied {
                block_id: id,
                text: text.clone(),
            })
        }
        ScriptCommand::Text { block, text } => session.edit_text(&resolve(labels, block), text.clone()).await,
        ScriptCommand::Move { block, direction } => session.move_block(&resolve(labels, block), *direction).await,
        ScriptCommand::Indent { block } => session.indent(&resolve(labels, block)).await,
        ScriptCommand::Outdent { block } => session.outdent(&resolve(labels, block)).await,
        ScriptCommand::Delete { block } => session.delete(&resolve(labels, block)).await,
        ScriptCommand::Drop { block, x, y } => {
            let block_id = resolve(labels, block);
            let indent_unit = session.config().placement.indent_unit;
            let regions = layout_regions(session.article().tree(), ROW_HEIGHT, indent_unit, ROW_WIDTH);
            let origin = regions
                .iter()
                .find(|region| region.id == block_id)
                .map(|region| Point::new(region.rect.left + 8.0, region.rect.center_y()))
                .ok_or_else(|| EditorError::NotFound(block_id.clone()))?;

            let drag = session.start_drag(&block_id, origin)?;
            session.drop_block(drag, Point::new(*x, *y), &regions).await
        }
        ScriptCommand::Undo => session.undo().await,
        ScriptCommand::Redo => session.redo().await,
        ScriptCommand::Cancel => {
            session.cancel_preview();
            Ok(DispatchOutcome::Nothing)
        }
        ScriptCommand::Show => {
            print_article(session.article());
            Ok(DispatchOutcome::Nothing)
        }
    }
}

fn report(line: usize, command: &ScriptCommand, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Nothing => {
            if !matches!(command, ScriptCommand::Show | ScriptCommand::Cancel) {
                println!("  {} line {}: nothing to do", "·".dimmed(), line);
            }
        }
        DispatchOutcome::Previewing(preview) => {
            println!("  {} line {}: preview (repeat to confirm)", "?".yellow(), line);
            println!("      {}", render_preview(preview));
            for change in &preview.attachment_diff {
                let sign = match change.kind {
                    ChangeKind::Added => "+".green(),
                    _ => "-".red(),
                };
                println!("      {} {} ({})", sign, change.attachment.source, change.attachment.label);
            }
        }
        DispatchOutcome::TextApplied { block_id, text } => {
            println!("  {} line {}: {} = {:?}", "✓".green(), line, block_id.as_str().dimmed(), text);
        }
        DispatchOutcome::StructureApplied(action) => {
            let subject = action.subject().map(|id| id.to_string()).unwrap_or_default();
            println!("  {} line {}: {} {}", "✓".green(), line, action.name(), subject.dimmed());
        }
    }
}

fn render_preview(preview: &PendingPreview) -> String {
    preview
        .text_diff
        .iter()
        .map(|run| match run.kind {
            ChangeKind::Same => run.value.normal().to_string(),
            ChangeKind::Added => run.value.green().underline().to_string(),
            ChangeKind::Removed => run.value.red().strikethrough().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = "
            # build a small outline
            add intro first Hello world
            add tail -
            move tail up
            indent tail
            text intro Hi
            drop tail 10 75.5
            undo
            redo
            cancel
            show
        ";

        let commands: Vec<ScriptCommand> = parse_script(script)
            .unwrap()
            .into_iter()
            .map(|(_, command)| command)
            .collect();

        assert_eq!(
            commands,
            vec![
                ScriptCommand::Add {
                    label: "intro".into(),
                    after: Some("first".into()),
                    text: "Hello world".into(),
                },
                ScriptCommand::Add {
                    label: "tail".into(),
                    after: None,
                    text: String::new(),
                },
                ScriptCommand::Move {
                    block: "tail".into(),
                    direction: Direction::Up,
                },
                ScriptCommand::Indent { block: "tail".into() },
                ScriptCommand::Text {
                    block: "intro".into(),
                    text: "Hi".into(),
                },
                ScriptCommand::Drop {
                    block: "tail".into(),
                    x: 10.0,
                    y: 75.5,
                },
                ScriptCommand::Undo,
                ScriptCommand::Redo,
                ScriptCommand::Cancel,
                ScriptCommand::Show,
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        assert_eq!(
            parse_script("undo\nfly away").unwrap_err(),
            ScriptError::UnknownCommand {
                line: 2,
                command: "fly".into()
            }
        );
        assert!(matches!(
            parse_script("move a sideways").unwrap_err(),
            ScriptError::BadArguments { line: 1, command: "move", .. }
        ));
        assert!(matches!(
            parse_script("indent").unwrap_err(),
            ScriptError::BadArguments { command: "indent", .. }
        ));
    }

    #[tokio::test]
    async fn test_run_script_against_store() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        let config = Config::default();

        let store = ArticleStore::open(config.get_data_dir(&cwd)).await.unwrap();
        store.create_article(ArticleId::from("notes"), "Notes").await.unwrap();
        drop(store);

        let script = dir.path().join("edit.txt");
        fs::write(&script, "add b first beta\nadd c b gamma\nindent c\nmove first up\nadd d c delta\nundo\n").unwrap();

        run(
            RunArgs {
                id: "notes".into(),
                script,
            },
            &cwd,
            &config,
        )
        .await
        .unwrap();

        let store = ArticleStore::open(config.get_data_dir(&cwd)).await.unwrap();
        let article = store.article(&ArticleId::from("notes")).await.unwrap();
        assert_eq!(article.tree().len(), 3);
        assert_eq!(article.tree().roots().len(), 2);
        let second = &article.tree().roots()[1];
        assert_eq!(article.text(second).unwrap(), "beta");
        assert_eq!(article.tree().child_count(Some(second)), 1);
    }
}
