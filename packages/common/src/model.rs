//! Serializable article model
//!
//! These are the nested, owned shapes exchanged with persistence and
//! written to disk. The editor keeps its live tree in an arena and
//! converts at the boundary.

use crate::ids::{ArticleId, BlockId};
use crate::result::CommonResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A block and its entire subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSnapshot {
    pub id: BlockId,

    #[serde(default)]
    pub text: String,

    /// View state only, never structural
    #[serde(default)]
    pub collapsed: bool,

    #[serde(default)]
    pub children: Vec<BlockSnapshot>,
}

impl BlockSnapshot {
    pub fn new(id: impl Into<BlockId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            collapsed: false,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<BlockSnapshot>) -> Self {
        self.children = children;
        self
    }

    /// Number of blocks in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(BlockSnapshot::node_count).sum::<usize>()
    }
}

/// Before/after text of one accepted edit on one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub block_id: BlockId,
    pub before: String,
    pub after: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Returns `None` when the edit did not change the text
    pub fn new(
        id: impl Into<String>,
        block_id: BlockId,
        before: String,
        after: String,
    ) -> Option<Self> {
        if before == after {
            return None;
        }
        Some(Self {
            id: id.into(),
            block_id,
            before,
            after,
            timestamp: Utc::now(),
        })
    }
}

/// On-disk / wire form of an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: ArticleId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub blocks: Vec<BlockSnapshot>,

    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    #[serde(default)]
    pub redo_history: Vec<HistoryEntry>,

    pub updated_at: DateTime<Utc>,
}

impl ArticleRecord {
    pub fn from_json(json: &str) -> CommonResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> CommonResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommonError;

    #[test]
    fn test_history_entry_requires_change() {
        let block = BlockId::from("b1");
        assert!(HistoryEntry::new("h1", block.clone(), "same".into(), "same".into()).is_none());
        assert!(HistoryEntry::new("h2", block, "a".into(), "b".into()).is_some());
    }

    #[test]
    fn test_snapshot_node_count() {
        let tree = BlockSnapshot::new("a", "").with_children(vec![
            BlockSnapshot::new("b", ""),
            BlockSnapshot::new("c", "").with_children(vec![BlockSnapshot::new("d", "")]),
        ]);
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_record_json_is_camel_case() {
        let record = ArticleRecord {
            id: ArticleId::from("notes"),
            title: "Notes".to_string(),
            blocks: vec![BlockSnapshot::new("b1", "hello")],
            history: vec![],
            redo_history: vec![],
            updated_at: Utc::now(),
        };

        let json = record.to_json_pretty().unwrap();
        assert!(json.contains("\"redoHistory\""));
        assert!(json.contains("\"updatedAt\""));

        let back = ArticleRecord::from_json(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_malformed_record_is_json_error() {
        let err = ArticleRecord::from_json("{\"title\": 3}").unwrap_err();
        assert!(matches!(err, CommonError::Json(_)));
    }
}
