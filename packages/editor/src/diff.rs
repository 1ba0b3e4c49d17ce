//! # Diff Preview
//!
//! Character and attachment diffs shown before a text undo/redo is committed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffTag};
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Same,
    Added,
    Removed,
}

/// A run of consecutive characters sharing one change kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRun {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub value: String,
}

impl DiffRun {
    pub fn same(value: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Same,
            value: value.into(),
        }
    }

    pub fn added(value: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Added,
            value: value.into(),
        }
    }

    pub fn removed(value: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Removed,
            value: value.into(),
        }
    }
}

/// Character-level LCS diff from `current` to `target`, over Unicode scalar values
pub fn diff_text(current: &str, target: &str) -> Vec<DiffRun> {
    let old: Vec<char> = current.chars().collect();
    let new: Vec<char> = target.chars().collect();
    let mut runs: Vec<DiffRun> = Vec::new();

    for op in capture_diff_slices(Algorithm::Lcs, &old, &new) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => push_run(&mut runs, ChangeKind::Same, &old[old_range]),
            DiffTag::Delete => push_run(&mut runs, ChangeKind::Removed, &old[old_range]),
            DiffTag::Insert => push_run(&mut runs, ChangeKind::Added, &new[new_range]),
            DiffTag::Replace => {
                push_run(&mut runs, ChangeKind::Removed, &old[old_range]);
                push_run(&mut runs, ChangeKind::Added, &new[new_range]);
            }
        }
    }
    runs
}

fn push_run(runs: &mut Vec<DiffRun>, kind: ChangeKind, chars: &[char]) {
    if chars.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some(last) if last.kind == kind => last.value.extend(chars),
        _ => runs.push(DiffRun {
            kind,
            value: chars.iter().collect(),
        }),
    }
}

/// True when every run is `same`
pub fn is_unchanged(runs: &[DiffRun]) -> bool {
    runs.iter().all(|run| run.kind == ChangeKind::Same)
}

/// An embedded resource referenced from block text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Attachment {
    pub source: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub attachment: Attachment,
}

/// Pulls attachments out of opaque block text
pub trait AttachmentExtractor: Send + Sync {
    fn attachments(&self, text: &str) -> Vec<Attachment>;
}

/// Markdown image syntax: `![label](source)`
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownImages;

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").expect("image pattern is valid"))
}

impl AttachmentExtractor for MarkdownImages {
    fn attachments(&self, text: &str) -> Vec<Attachment> {
        image_pattern()
            .captures_iter(text)
            .map(|caps| Attachment {
                label: caps[1].to_string(),
                source: caps[2].to_string(),
            })
            .collect()
    }
}

/// Multiset symmetric difference keyed by `(source, label)`
pub fn diff_attachments(current: &[Attachment], target: &[Attachment]) -> Vec<AttachmentChange> {
    let mut balance: BTreeMap<&Attachment, i64> = BTreeMap::new();
    for attachment in current {
        *balance.entry(attachment).or_default() -= 1;
    }
    for attachment in target {
        *balance.entry(attachment).or_default() += 1;
    }

    let mut changes = Vec::new();
    for (attachment, count) in balance {
        let kind = if count > 0 {
            ChangeKind::Added
        } else {
            ChangeKind::Removed
        };
        for _ in 0..count.unsigned_abs() {
            changes.push(AttachmentChange {
                kind,
                attachment: attachment.clone(),
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_diff() {
        assert_eq!(
            diff_text("ab", "axb"),
            vec![DiffRun::same("a"), DiffRun::added("x"), DiffRun::same("b")]
        );
    }

    #[test]
    fn test_removal_diff() {
        assert_eq!(
            diff_text("hello world", "hello"),
            vec![DiffRun::same("hello"), DiffRun::removed(" world")]
        );
    }

    #[test]
    fn test_identical_text_is_unchanged() {
        let runs = diff_text("same", "same");
        assert_eq!(runs, vec![DiffRun::same("same")]);
        assert!(is_unchanged(&runs));
        assert!(is_unchanged(&diff_text("", "")));
    }

    #[test]
    fn test_multibyte_characters() {
        assert_eq!(
            diff_text("héllo", "hé🙂llo"),
            vec![DiffRun::same("hé"), DiffRun::added("🙂"), DiffRun::same("llo")]
        );
    }

    #[test]
    fn test_markdown_images() {
        let found = MarkdownImages.attachments("see ![cat](img/cat.png) and ![](b.gif)");
        assert_eq!(
            found,
            vec![
                Attachment {
                    source: "img/cat.png".into(),
                    label: "cat".into()
                },
                Attachment {
                    source: "b.gif".into(),
                    label: "".into()
                },
            ]
        );
    }

    #[test]
    fn test_attachment_multiset_difference() {
        let cat = Attachment {
            source: "cat.png".into(),
            label: "cat".into(),
        };
        let dog = Attachment {
            source: "dog.png".into(),
            label: "dog".into(),
        };

        let changes = diff_attachments(&[cat.clone(), cat.clone(), dog.clone()], &[cat.clone(), dog.clone(), dog.clone()]);

        assert_eq!(
            changes,
            vec![
                AttachmentChange {
                    kind: ChangeKind::Removed,
                    attachment: cat
                },
                AttachmentChange {
                    kind: ChangeKind::Added,
                    attachment: dog
                },
            ]
        );
    }

    #[test]
    fn test_equal_attachments_cancel() {
        let a = Attachment {
            source: "a.png".into(),
            label: "a".into(),
        };
        assert!(diff_attachments(&[a.clone()], &[a]).is_empty());
    }
}
