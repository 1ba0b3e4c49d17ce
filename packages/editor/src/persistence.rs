//! # Persistence Boundary
//!
//! The authoritative store is an external collaborator with one endpoint per
//! operation. Structural endpoints answer with the position the store
//! actually used, which is folded back into the local tree and into the
//! inverse recorded for undo.

use crate::actions::{Applied, Direction, StructuralAction};
use crate::errors::EditorError;
use crate::placement::Placement;
use crate::tree::BlockTree;
use crate::Article;
use outline_common::{ArticleId, BlockId, BlockSnapshot, HistoryEntry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Authoritative position reported by the store.
///
/// For deletes this is where the block was before removal; otherwise it is
/// where the block ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persisted {
    pub parent_id: Option<BlockId>,
    pub index: usize,
}

/// Arbitrary move request, with the neighbour it was dropped against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relocation {
    pub parent_id: Option<BlockId>,
    pub index: usize,
    pub anchor_id: Option<BlockId>,
    pub placement: Option<Placement>,
}

impl Relocation {
    /// Describe where `block_id` currently sits in `tree`
    pub fn from_tree(tree: &BlockTree, block_id: &BlockId) -> Result<Self, EditorError> {
        let loc = tree
            .find_block(block_id)
            .ok_or_else(|| EditorError::NotFound(block_id.clone()))?;

        let (anchor_id, placement) = if loc.index > 0 {
            (Some(loc.siblings[loc.index - 1].clone()), Some(Placement::After))
        } else if let Some(next) = loc.siblings.get(1) {
            (Some(next.clone()), Some(Placement::Before))
        } else if let Some(parent) = &loc.parent {
            (Some(parent.clone()), Some(Placement::Inside))
        } else {
            (None, None)
        };

        Ok(Self {
            parent_id: loc.parent,
            index: loc.index,
            anchor_id,
            placement,
        })
    }
}

/// Which history entry a text undo/redo refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryTarget {
    Entry(String),
    MostRecent,
}

#[allow(async_fn_in_trait)]
pub trait Persistence {
    /// Insert `block` right after `after`, or at the end of the root list
    async fn insert_sibling(
        &self,
        article: &ArticleId,
        after: Option<&BlockId>,
        block: &BlockSnapshot,
    ) -> Result<Persisted, EditorError>;

    /// Delete a block and its whole subtree
    async fn delete_block(&self, article: &ArticleId, block_id: &BlockId) -> Result<Persisted, EditorError>;

    async fn move_block(
        &self,
        article: &ArticleId,
        block_id: &BlockId,
        direction: Direction,
    ) -> Result<Persisted, EditorError>;

    async fn indent_block(
        &self,
        article: &ArticleId,
        block_id: &BlockId,
        release_trailing: usize,
    ) -> Result<Persisted, EditorError>;

    async fn outdent_block(&self, article: &ArticleId, block_id: &BlockId) -> Result<Persisted, EditorError>;

    async fn relocate_block(
        &self,
        article: &ArticleId,
        block_id: &BlockId,
        relocation: &Relocation,
    ) -> Result<Persisted, EditorError>;

    async fn restore_block(
        &self,
        article: &ArticleId,
        snapshot: &BlockSnapshot,
        parent_id: Option<&BlockId>,
        index: usize,
    ) -> Result<Persisted, EditorError>;

    async fn save_text(&self, article: &ArticleId, entry: &HistoryEntry) -> Result<(), EditorError>;

    async fn undo_text(&self, article: &ArticleId, target: &HistoryTarget) -> Result<(), EditorError>;

    async fn redo_text(&self, article: &ArticleId, target: &HistoryTarget) -> Result<(), EditorError>;

    /// Forget every redoable text entry once nothing can redo them
    async fn discard_redo_text(&self, article: &ArticleId) -> Result<(), EditorError>;
}

/// Send an applied action to the store.
///
/// `tree` is the local tree after the action. Sequence steps are sent in
/// order; if one fails, the steps already accepted are compensated with
/// their inverses on a best-effort basis.
pub async fn persist_action<P: Persistence>(
    persistence: &P,
    article: &ArticleId,
    tree: &BlockTree,
    applied: &Applied,
) -> Result<Persisted, EditorError> {
    let StructuralAction::Sequence { steps } = &applied.action else {
        return persist_step(persistence, article, tree, &applied.action).await;
    };
    let inverse_steps = match &applied.inverse {
        StructuralAction::Sequence { steps } => steps.as_slice(),
        _ => &[],
    };

    let mut last = None;
    for (done, step) in steps.iter().enumerate() {
        match persist_step(persistence, article, tree, step).await {
            Ok(persisted) => last = Some(persisted),
            Err(err) => {
                warn!(step = step.name(), %err, "sequence step failed; compensating");
                // Inverse steps are stored last-to-first
                for inverse in inverse_steps.iter().skip(steps.len() - done) {
                    if let Err(compensation) = persist_step(persistence, article, tree, inverse).await {
                        warn!(step = inverse.name(), %compensation, "compensation failed");
                    }
                }
                return Err(err);
            }
        }
    }
    last.ok_or_else(|| EditorError::PersistenceFailure("empty sequence".to_string()))
}

async fn persist_step<P: Persistence>(
    persistence: &P,
    article: &ArticleId,
    tree: &BlockTree,
    action: &StructuralAction,
) -> Result<Persisted, EditorError> {
    debug!(action = action.name(), block = ?action.subject(), "persisting");
    match action {
        StructuralAction::Move { block_id, direction } => persistence.move_block(article, block_id, *direction).await,
        StructuralAction::Reorder { block_id, .. } => {
            let relocation = Relocation::from_tree(tree, block_id)?;
            persistence.relocate_block(article, block_id, &relocation).await
        }
        StructuralAction::Indent {
            block_id,
            release_trailing,
        } => persistence.indent_block(article, block_id, *release_trailing).await,
        StructuralAction::Outdent { block_id } => persistence.outdent_block(article, block_id).await,
        StructuralAction::Create {
            block_id,
            fallback_id,
            text,
        } => {
            let block = BlockSnapshot::new(block_id.clone(), text.clone());
            persistence.insert_sibling(article, fallback_id.as_ref(), &block).await
        }
        StructuralAction::Delete { block_id, .. } => persistence.delete_block(article, block_id).await,
        StructuralAction::Restore {
            snapshot,
            parent_id,
            index,
        } => {
            persistence
                .restore_block(article, snapshot, parent_id.as_ref(), *index)
                .await
        }
        StructuralAction::Sequence { .. } => Err(EditorError::PersistenceFailure(
            "nested sequences cannot be persisted".to_string(),
        )),
    }
}

/// Fold the store's answer back into the local article and the recorded action
pub fn reconcile(article: &mut Article, applied: Applied, persisted: &Persisted) -> Result<Applied, EditorError> {
    let Applied { action, inverse } = applied;

    match (action, inverse) {
        (
            StructuralAction::Delete { block_id, captured },
            StructuralAction::Restore { snapshot, .. },
        ) => {
            let captured = captured.map(|mut captured| {
                captured.parent_id = persisted.parent_id.clone();
                captured.index = persisted.index;
                captured
            });
            Ok(Applied {
                action: StructuralAction::Delete { block_id, captured },
                inverse: StructuralAction::Restore {
                    snapshot,
                    parent_id: persisted.parent_id.clone(),
                    index: persisted.index,
                },
            })
        }
        (action, inverse) => {
            let Some(block_id) = action.subject().cloned() else {
                return Ok(Applied { action, inverse });
            };
            let Some(loc) = article.find_block(&block_id) else {
                return Ok(Applied { action, inverse });
            };

            if loc.parent == persisted.parent_id && loc.index == persisted.index {
                return Ok(Applied { action, inverse });
            }

            debug!(
                block = %block_id,
                local_index = loc.index,
                index = persisted.index,
                "adopting authoritative position"
            );
            let index = article.relocate(&block_id, persisted.parent_id.as_ref(), persisted.index)?;

            Ok(match (action, inverse) {
                (
                    StructuralAction::Reorder {
                        block_id,
                        from_parent_id,
                        from_index,
                        ..
                    },
                    StructuralAction::Reorder {
                        to_parent_id, to_index, ..
                    },
                ) => Applied {
                    action: StructuralAction::Reorder {
                        block_id: block_id.clone(),
                        from_parent_id,
                        from_index,
                        to_parent_id: persisted.parent_id.clone(),
                        to_index: index,
                    },
                    inverse: StructuralAction::Reorder {
                        block_id,
                        from_parent_id: persisted.parent_id.clone(),
                        from_index: index,
                        to_parent_id,
                        to_index,
                    },
                },
                (action, inverse) => Applied { action, inverse },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> BlockTree {
        BlockTree::from_snapshots(&[
            BlockSnapshot::new("p", "").with_children(vec![BlockSnapshot::new("c", "")]),
            BlockSnapshot::new("q", ""),
        ])
        .unwrap()
    }

    #[test]
    fn test_relocation_anchors() {
        let tree = tree();

        let only_child = Relocation::from_tree(&tree, &BlockId::from("c")).unwrap();
        assert_eq!(only_child.anchor_id, Some(BlockId::from("p")));
        assert_eq!(only_child.placement, Some(Placement::Inside));

        let second_root = Relocation::from_tree(&tree, &BlockId::from("q")).unwrap();
        assert_eq!(second_root.anchor_id, Some(BlockId::from("p")));
        assert_eq!(second_root.placement, Some(Placement::After));
        assert_eq!(second_root.index, 1);

        let first_root = Relocation::from_tree(&tree, &BlockId::from("p")).unwrap();
        assert_eq!(first_root.anchor_id, Some(BlockId::from("q")));
        assert_eq!(first_root.placement, Some(Placement::Before));
    }

    #[test]
    fn test_history_target_json() {
        let json = serde_json::to_string(&HistoryTarget::Entry("h3".into())).unwrap();
        assert_eq!(json, r#"{"entry":"h3"}"#);
        let json = serde_json::to_string(&HistoryTarget::MostRecent).unwrap();
        assert_eq!(json, r#""mostRecent""#);
    }
}
