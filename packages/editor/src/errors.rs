//! Error types for the editor

use outline_common::BlockId;
use std::fmt;
use thiserror::Error;

/// Which structural boundary rejected an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Move up on a root-level first block
    FirstSibling,
    /// Move down on a last sibling
    LastSibling,
    /// Indent with no previous sibling to nest under
    NoPreviousSibling,
    /// Outdent on a root-level block
    NoParent,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Boundary::FirstSibling => "already the first block",
            Boundary::LastSibling => "already the last block",
            Boundary::NoPreviousSibling => "no previous sibling to indent under",
            Boundary::NoParent => "block has no parent",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Block not found: {0}")]
    NotFound(BlockId),

    #[error("Rejected: {0}")]
    BoundaryRejected(Boundary),

    #[error("Cannot place {block_id} under {parent_id}: target is inside the moved subtree")]
    ForbiddenTarget { block_id: BlockId, parent_id: BlockId },

    #[error("Block already exists: {0}")]
    DuplicateBlock(BlockId),

    #[error("History entry not found: {0}")]
    HistoryEntryNotFound(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl EditorError {
    /// Errors the engine treats as no-ops; history is simply not advanced
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            EditorError::NotFound(_) | EditorError::BoundaryRejected(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_taxonomy() {
        assert!(EditorError::NotFound(BlockId::from("x")).is_silent());
        assert!(EditorError::BoundaryRejected(Boundary::NoParent).is_silent());
        assert!(!EditorError::PersistenceFailure("down".into()).is_silent());
        assert!(!EditorError::ForbiddenTarget {
            block_id: BlockId::from("a"),
            parent_id: BlockId::from("b"),
        }
        .is_silent());
    }
}
