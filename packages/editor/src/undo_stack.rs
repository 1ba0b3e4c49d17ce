//! # Undo/Redo Coordinator
//!
//! Two bounded stacks of reversible entries plus the dispatch logic that
//! decides what an undo or redo gesture does.
//!
//! ## Design
//!
//! - Structural entries carry the applied action and its inverse. Undo and
//!   redo both apply the top entry's `inverse` and push the materialized
//!   result onto the opposite stack, so the two directions are symmetric.
//! - Text entries point at a [`HistoryEntry`](outline_common::HistoryEntry)
//!   by id. They are not popped until a diff preview has been confirmed (or
//!   turned out to be empty).
//! - Fresh user actions clear the redo stack; undo/redo never do.
//!
//! The preview is an explicit state value threaded through [`dispatch`]:
//!
//! ```text
//! Idle ──undo(text)──→ PreviewingUndo ──undo──→ Idle (revert applied)
//!   ↑                        │
//!   └──── cancel / blur / redo ┘ (preview discarded)
//! ```

use crate::actions::StructuralAction;
use crate::diff::{diff_attachments, diff_text, is_unchanged, AttachmentChange, AttachmentExtractor, DiffRun};
use crate::document::Article;
use outline_common::BlockId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UndoStackEntry {
    Text {
        block_id: BlockId,
        history_entry_id: String,
    },

    /// `action` is the change in effect; applying `inverse` reverts it
    Structure {
        action: StructuralAction,
        inverse: StructuralAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Undo,
    Redo,
}

impl Trigger {
    pub fn opposite(self) -> Self {
        match self {
            Trigger::Undo => Trigger::Redo,
            Trigger::Redo => Trigger::Undo,
        }
    }
}

/// A text undo/redo waiting for a second matching gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPreview {
    pub trigger: Trigger,
    pub block_id: BlockId,
    pub history_entry_id: String,
    pub current: String,
    pub target: String,
    pub text_diff: Vec<DiffRun>,
    pub attachment_diff: Vec<AttachmentChange>,
}

impl PendingPreview {
    /// True when confirming would change nothing visible
    pub fn is_noop(&self) -> bool {
        is_unchanged(&self.text_diff) && self.attachment_diff.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PreviewState {
    #[default]
    Idle,
    PreviewingUndo(PendingPreview),
    PreviewingRedo(PendingPreview),
}

impl PreviewState {
    pub fn pending(&self) -> Option<&PendingPreview> {
        match self {
            PreviewState::Idle => None,
            PreviewState::PreviewingUndo(preview) | PreviewState::PreviewingRedo(preview) => Some(preview),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PreviewState::Idle)
    }

    fn previewing(preview: PendingPreview) -> Self {
        match preview.trigger {
            Trigger::Undo => PreviewState::PreviewingUndo(preview),
            Trigger::Redo => PreviewState::PreviewingRedo(preview),
        }
    }
}

/// What the caller has to carry out after [`dispatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// The stack was empty
    Empty,

    /// A preview was opened; nothing changed yet
    Preview(PendingPreview),

    /// Popped text entry to revert (undo) or reapply (redo)
    Text {
        block_id: BlockId,
        history_entry_id: String,
    },

    /// Popped structural entry; apply its `inverse`
    Structure {
        action: StructuralAction,
        inverse: StructuralAction,
    },

    /// Popped text entry whose block or history record no longer exists
    Stale(UndoStackEntry),
}

/// Undo/redo stack for one article session
#[derive(Debug)]
pub struct UndoStack {
    /// Most recent last
    undo_stack: Vec<UndoStackEntry>,

    /// Most recent last
    redo_stack: Vec<UndoStackEntry>,

    /// Maximum number of entries per stack (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a fresh user action, invalidating anything redoable
    pub fn push(&mut self, entry: UndoStackEntry) {
        self.push_to(Trigger::Undo, entry);
        self.redo_stack.clear();
    }

    /// Push onto the stack `trigger` pops from, without touching the other one
    pub fn push_to(&mut self, trigger: Trigger, entry: UndoStackEntry) {
        let max_levels = self.max_levels;
        let stack = self.stack_mut(trigger);
        stack.push(entry);
        if max_levels > 0 && stack.len() > max_levels {
            stack.remove(0);
        }
    }

    pub fn pop(&mut self, trigger: Trigger) -> Option<UndoStackEntry> {
        self.stack_mut(trigger).pop()
    }

    pub fn peek(&self, trigger: Trigger) -> Option<&UndoStackEntry> {
        match trigger {
            Trigger::Undo => self.undo_stack.last(),
            Trigger::Redo => self.redo_stack.last(),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn stack_mut(&mut self, trigger: Trigger) -> &mut Vec<UndoStackEntry> {
        match trigger {
            Trigger::Undo => &mut self.undo_stack,
            Trigger::Redo => &mut self.redo_stack,
        }
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Decide what an undo/redo gesture does, given the current preview state.
///
/// A pending preview for the other trigger is discarded first. A pending
/// preview for the same trigger is confirmed. Otherwise the top entry is
/// inspected: structural entries are popped at once, text entries open a
/// preview unless the diff is empty.
pub fn dispatch(
    stack: &mut UndoStack,
    state: PreviewState,
    trigger: Trigger,
    article: &Article,
    extractor: &dyn AttachmentExtractor,
) -> (PreviewState, Plan) {
    if let Some(pending) = state.pending() {
        if pending.trigger == trigger {
            if let Some(plan) = confirm(stack, pending) {
                debug!(block = %pending.block_id, ?trigger, "preview confirmed");
                return (PreviewState::Idle, plan);
            }
            warn!(block = %pending.block_id, ?trigger, "preview no longer matches the stack; discarding");
        } else {
            debug!(block = %pending.block_id, ?trigger, "preview cancelled by opposite trigger");
        }
    }

    let Some(top) = stack.peek(trigger) else {
        return (PreviewState::Idle, Plan::Empty);
    };

    match top.clone() {
        UndoStackEntry::Structure { action, inverse } => {
            stack.pop(trigger);
            (PreviewState::Idle, Plan::Structure { action, inverse })
        }
        UndoStackEntry::Text {
            block_id,
            history_entry_id,
        } => match preview(trigger, article, &block_id, &history_entry_id, extractor) {
            None => {
                let entry = stack.pop(trigger);
                warn!(block = %block_id, entry = %history_entry_id, "discarding stale text entry");
                (PreviewState::Idle, entry.map(Plan::Stale).unwrap_or(Plan::Empty))
            }
            Some(preview) if preview.is_noop() => {
                stack.pop(trigger);
                (
                    PreviewState::Idle,
                    Plan::Text {
                        block_id,
                        history_entry_id,
                    },
                )
            }
            Some(preview) => {
                debug!(block = %block_id, ?trigger, runs = preview.text_diff.len(), "preview started");
                (PreviewState::previewing(preview.clone()), Plan::Preview(preview))
            }
        },
    }
}

/// Discard any pending preview; the text was never touched
pub fn cancel(state: PreviewState) -> PreviewState {
    if let Some(pending) = state.pending() {
        debug!(block = %pending.block_id, "preview cancelled");
    }
    PreviewState::Idle
}

fn confirm(stack: &mut UndoStack, pending: &PendingPreview) -> Option<Plan> {
    match stack.peek(pending.trigger) {
        Some(UndoStackEntry::Text { history_entry_id, .. }) if *history_entry_id == pending.history_entry_id => {
            stack.pop(pending.trigger);
            Some(Plan::Text {
                block_id: pending.block_id.clone(),
                history_entry_id: pending.history_entry_id.clone(),
            })
        }
        _ => None,
    }
}

/// Build the preview for a text entry, or `None` when it is stale
fn preview(
    trigger: Trigger,
    article: &Article,
    block_id: &BlockId,
    history_entry_id: &str,
    extractor: &dyn AttachmentExtractor,
) -> Option<PendingPreview> {
    let history = match trigger {
        Trigger::Undo => article.history(),
        Trigger::Redo => article.redo_history(),
    };
    let entry = history.iter().rev().find(|entry| entry.id == history_entry_id)?;
    let current = article.text(block_id).ok()?.to_string();
    let target = match trigger {
        Trigger::Undo => entry.before.clone(),
        Trigger::Redo => entry.after.clone(),
    };

    let text_diff = diff_text(&current, &target);
    let attachment_diff = diff_attachments(&extractor.attachments(&current), &extractor.attachments(&target));

    Some(PendingPreview {
        trigger,
        block_id: block_id.clone(),
        history_entry_id: history_entry_id.to_string(),
        current,
        target,
        text_diff,
        attachment_diff,
    })
}
