//! # Outline Editor
//!
//! Block-tree structural editing engine for Outline articles.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ gesture: shortcut, drag release, undo/redo  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ placement: pointer + regions → DropTarget   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: optimistic apply + persist         │
//! │  - StructuralAction → Applied{action, inv}  │
//! │  - journaled pre-image, rollback on failure │
//! │  - undo/redo stacks, text diff previews     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ persistence: authoritative store (async)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Arena tree**: blocks live in a flat table; parent and index are derived
//! 2. **Inverses from results**: an action's inverse is computed after it ran
//! 3. **Store authority**: the local tree adopts the position the store reports
//! 4. **No half-applied edits**: a failed write restores the captured pre-image
//!
//! ## Usage
//!
//! ```rust,ignore
//! use outline_editor::{Article, Direction, EditSession, EditorConfig};
//!
//! let article = Article::new("notes".into(), "Notes");
//! let mut session = EditSession::new("local", article, store, EditorConfig::default());
//!
//! let first = session.article().tree().roots()[0].clone();
//! let second = session.create_block(Some(&first), "hello").await?;
//! session.indent(&second).await?;
//!
//! session.undo().await?;
//! session.redo().await?;
//! ```

mod actions;
mod config;
mod diff;
mod document;
mod errors;
mod persistence;
mod placement;
mod session;
mod tree;
mod undo_stack;

pub use actions::{Applied, Captured, Direction, StructuralAction};
pub use config::{EditorConfig, PlacementConfig};
pub use diff::{
    diff_attachments, diff_text, is_unchanged, Attachment, AttachmentChange, AttachmentExtractor, ChangeKind, DiffRun,
    MarkdownImages,
};
pub use document::{Article, Checkpoint};
pub use errors::{Boundary, EditorError};
pub use persistence::{persist_action, reconcile, HistoryTarget, Persisted, Persistence, Relocation};
pub use placement::{
    classify, layout_regions, resolve, BlockRegion, DragSession, DropTarget, Placement, Point, Rect,
};
pub use session::{DispatchOutcome, EditSession};
pub use tree::{BlockLocation, BlockTree, Node, PreImage};
pub use undo_stack::{dispatch, PendingPreview, Plan, PreviewState, Trigger, UndoStack, UndoStackEntry};

// Re-export common types for convenience
pub use outline_common::{ArticleId, ArticleRecord, BlockId, BlockSnapshot, HistoryEntry};
