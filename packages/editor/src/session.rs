//! # Edit Session Management
//!
//! An `EditSession` is one editor's view of one article: the local tree,
//! the undo/redo stacks, the preview state and a handle to the store.
//!
//! Every mutation is applied optimistically. The article journals what the
//! mutation touches; if the store rejects the write, the journaled pre-image
//! is put back and neither stack moves.

use crate::actions::{Applied, Direction, StructuralAction};
use crate::config::EditorConfig;
use crate::diff::{AttachmentExtractor, MarkdownImages};
use crate::document::Article;
use crate::errors::EditorError;
use crate::persistence::{persist_action, reconcile, HistoryTarget, Persistence};
use crate::placement::{BlockRegion, DragSession, DropTarget, Point};
use crate::undo_stack::{self, PendingPreview, Plan, PreviewState, Trigger, UndoStack, UndoStackEntry};
use outline_common::BlockId;
use tracing::{debug, info, warn};

/// What a gesture ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Nothing,

    /// A diff preview is waiting for a second matching gesture
    Previewing(PendingPreview),

    TextApplied {
        block_id: BlockId,
        text: String,
    },

    StructureApplied(StructuralAction),
}

pub struct EditSession<P> {
    /// Unique session identifier
    pub id: String,

    article: Article,
    stack: UndoStack,
    preview: PreviewState,
    persistence: P,
    extractor: Box<dyn AttachmentExtractor>,
    config: EditorConfig,
}

impl<P: Persistence> EditSession<P> {
    pub fn new(id: impl Into<String>, article: Article, persistence: P, config: EditorConfig) -> Self {
        Self {
            id: id.into(),
            article,
            stack: UndoStack::with_max_levels(config.max_undo_levels),
            preview: PreviewState::Idle,
            persistence,
            extractor: Box::new(MarkdownImages),
            config,
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn AttachmentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.stack
    }

    pub fn preview(&self) -> &PreviewState {
        &self.preview
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Perform a user-initiated structural action and record it
    pub async fn perform(&mut self, action: StructuralAction) -> Result<DispatchOutcome, EditorError> {
        self.cancel_preview();

        let applied = self.execute(&action).await?;
        info!(session = %self.id, action = applied.action.name(), "action recorded");
        self.stack.push(UndoStackEntry::Structure {
            action: applied.action.clone(),
            inverse: applied.inverse,
        });
        self.discard_redo_text().await;
        Ok(DispatchOutcome::StructureApplied(applied.action))
    }

    /// The redo stack was just cleared, so no text entry can be redone
    async fn discard_redo_text(&mut self) {
        if self.article.redo_history().is_empty() {
            return;
        }
        let (_, checkpoint) = self.article.checkpointed(|article| Ok(article.clear_redo_history()));
        if let Err(err) = self.persistence.discard_redo_text(self.article.id()).await {
            warn!(session = %self.id, %err, "failed to discard redo history; keeping it");
            self.article.rollback(checkpoint);
        }
    }

    /// Insert a new block after `after` (or at the end), returning its id
    pub async fn create_block(&mut self, after: Option<&BlockId>, text: impl Into<String>) -> Result<BlockId, EditorError> {
        let block_id = self.article.next_block_id();
        self.perform(StructuralAction::create(block_id.clone(), after.cloned(), text))
            .await?;
        Ok(block_id)
    }

    pub async fn move_block(&mut self, block_id: &BlockId, direction: Direction) -> Result<DispatchOutcome, EditorError> {
        self.perform(StructuralAction::move_block(block_id.clone(), direction))
            .await
    }

    pub async fn indent(&mut self, block_id: &BlockId) -> Result<DispatchOutcome, EditorError> {
        self.perform(StructuralAction::indent(block_id.clone())).await
    }

    pub async fn outdent(&mut self, block_id: &BlockId) -> Result<DispatchOutcome, EditorError> {
        self.perform(StructuralAction::outdent(block_id.clone())).await
    }

    pub async fn delete(&mut self, block_id: &BlockId) -> Result<DispatchOutcome, EditorError> {
        self.perform(StructuralAction::delete(block_id.clone())).await
    }

    pub async fn reorder(
        &mut self,
        block_id: &BlockId,
        parent_id: Option<BlockId>,
        index: usize,
    ) -> Result<DispatchOutcome, EditorError> {
        self.perform(StructuralAction::reorder(block_id.clone(), parent_id, index))
            .await
    }

    /// Replace a block's text; unchanged text records nothing
    pub async fn edit_text(&mut self, block_id: &BlockId, text: impl Into<String>) -> Result<DispatchOutcome, EditorError> {
        self.cancel_preview();

        let text = text.into();
        let (result, checkpoint) = self.article.checkpointed(|article| article.set_text(block_id, text));
        let entry = match result {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(DispatchOutcome::Nothing),
            Err(err) => {
                self.article.rollback(checkpoint);
                return Err(err);
            }
        };

        if let Err(err) = self.persistence.save_text(self.article.id(), &entry).await {
            warn!(session = %self.id, block = %block_id, %err, "text save failed; rolling back");
            self.article.rollback(checkpoint);
            return Err(err);
        }

        self.stack.push(UndoStackEntry::Text {
            block_id: block_id.clone(),
            history_entry_id: entry.id,
        });
        Ok(DispatchOutcome::TextApplied {
            block_id: block_id.clone(),
            text: entry.after,
        })
    }

    pub async fn undo(&mut self) -> Result<DispatchOutcome, EditorError> {
        self.step(Trigger::Undo).await
    }

    pub async fn redo(&mut self) -> Result<DispatchOutcome, EditorError> {
        self.step(Trigger::Redo).await
    }

    /// Discard a pending preview, leaving the text as it was
    pub fn cancel_preview(&mut self) {
        self.preview = undo_stack::cancel(std::mem::take(&mut self.preview));
    }

    /// End of the focus session
    pub fn blur(&mut self) {
        self.cancel_preview();
    }

    pub fn start_drag(&self, block_id: &BlockId, origin: Point) -> Result<DragSession, EditorError> {
        DragSession::start(self.article.tree(), block_id, origin)
    }

    /// Track the pointer during a drag
    pub fn drag_update(&self, drag: &mut DragSession, pointer: Point, regions: &[BlockRegion]) -> Option<DropTarget> {
        drag.update(self.article.tree(), &self.config.placement, pointer, regions)
            .cloned()
    }

    /// Release a drag at `pointer`; no valid target means no change
    pub async fn drop_block(
        &mut self,
        mut drag: DragSession,
        pointer: Point,
        regions: &[BlockRegion],
    ) -> Result<DispatchOutcome, EditorError> {
        drag.update(self.article.tree(), &self.config.placement, pointer, regions);
        let block_id = drag.block_id().clone();
        let Some(target) = drag.finish() else {
            debug!(session = %self.id, block = %block_id, "drop without target");
            return Ok(DispatchOutcome::Nothing);
        };

        let action = target.to_action(self.article.tree(), &block_id)?;
        self.perform(action).await
    }

    async fn step(&mut self, trigger: Trigger) -> Result<DispatchOutcome, EditorError> {
        let state = std::mem::take(&mut self.preview);
        let (state, plan) = undo_stack::dispatch(&mut self.stack, state, trigger, &self.article, self.extractor.as_ref());
        self.preview = state;

        match plan {
            Plan::Empty | Plan::Stale(_) => Ok(DispatchOutcome::Nothing),
            Plan::Preview(preview) => Ok(DispatchOutcome::Previewing(preview)),
            Plan::Text {
                block_id,
                history_entry_id,
            } => self.step_text(trigger, block_id, history_entry_id).await,
            Plan::Structure { action, inverse } => match self.execute(&inverse).await {
                Ok(applied) => {
                    self.stack.push_to(
                        trigger.opposite(),
                        UndoStackEntry::Structure {
                            action: applied.action.clone(),
                            inverse: applied.inverse,
                        },
                    );
                    Ok(DispatchOutcome::StructureApplied(applied.action))
                }
                Err(err) => {
                    self.stack
                        .push_to(trigger, UndoStackEntry::Structure { action, inverse });
                    Err(err)
                }
            },
        }
    }

    async fn step_text(
        &mut self,
        trigger: Trigger,
        block_id: BlockId,
        history_entry_id: String,
    ) -> Result<DispatchOutcome, EditorError> {
        let (result, checkpoint) = self.article.checkpointed(|article| match trigger {
            Trigger::Undo => article.revert_text(&history_entry_id),
            Trigger::Redo => article.reapply_text(&history_entry_id),
        });

        let persisted = match result {
            Ok(_) => {
                let target = HistoryTarget::Entry(history_entry_id.clone());
                match trigger {
                    Trigger::Undo => self.persistence.undo_text(self.article.id(), &target).await,
                    Trigger::Redo => self.persistence.redo_text(self.article.id(), &target).await,
                }
            }
            Err(err) => Err(err),
        };

        let entry = UndoStackEntry::Text {
            block_id: block_id.clone(),
            history_entry_id,
        };
        match persisted {
            Ok(()) => {
                self.stack.push_to(trigger.opposite(), entry);
                let text = self.article.text(&block_id)?.to_string();
                Ok(DispatchOutcome::TextApplied { block_id, text })
            }
            Err(err) => {
                warn!(session = %self.id, block = %block_id, %err, "text {:?} failed; rolling back", trigger);
                self.article.rollback(checkpoint);
                self.stack.push_to(trigger, entry);
                Err(err)
            }
        }
    }

    /// Apply locally, persist, then adopt the store's answer or roll back
    async fn execute(&mut self, action: &StructuralAction) -> Result<Applied, EditorError> {
        let (result, checkpoint) = self.article.checkpointed(|article| article.apply(action));
        let applied = match result {
            Ok(applied) => applied,
            Err(err) => {
                self.article.rollback(checkpoint);
                return Err(err);
            }
        };

        match persist_action(&self.persistence, self.article.id(), self.article.tree(), &applied).await {
            Ok(persisted) => reconcile(&mut self.article, applied, &persisted),
            Err(err) => {
                warn!(session = %self.id, action = applied.action.name(), %err, "persistence failed; rolling back");
                self.article.rollback(checkpoint);
                Err(err)
            }
        }
    }
}
