//! # Structural Actions
//!
//! Reversible mutations of the block tree.
//!
//! ## Design
//!
//! Applying an action returns an [`Applied`] pair: the *materialized* action
//! (filled in with what actually happened, e.g. the real source location of a
//! reorder or the captured subtree of a delete) and its inverse, computed from
//! that result rather than guessed up front.
//!
//! | Action | Inverse |
//! |---|---|
//! | `move(id, dir)` | `move(id, opposite)` |
//! | `indent(id, n)` | `outdent(id)` |
//! | `outdent(id)` absorbing `n` followers | `indent(id, n)` |
//! | `reorder(id, to)` | `reorder(id, from)` |
//! | `create(id)` | `delete(id)` |
//! | `delete(id)` | `restore(snapshot, parent, index)` |
//! | `restore(snapshot, ..)` | `delete(snapshot.id)` |
//! | `sequence[a, b]` | `sequence[b⁻¹, a⁻¹]` |
//!
//! Moving the first child of a nested list up climbs out of its parent:
//! it runs as `sequence[outdent, move up]` and is recorded as one entry.

use crate::errors::{Boundary, EditorError};
use crate::tree::BlockTree;
use outline_common::{BlockId, BlockSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Subtree and former position captured by a delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captured {
    pub snapshot: BlockSnapshot,
    pub parent_id: Option<BlockId>,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StructuralAction {
    /// Swap with the adjacent sibling
    Move {
        block_id: BlockId,
        direction: Direction,
    },

    /// Detach and reinsert anywhere; `from_*` are filled in when applied
    Reorder {
        block_id: BlockId,
        from_parent_id: Option<BlockId>,
        from_index: usize,
        to_parent_id: Option<BlockId>,
        to_index: usize,
    },

    /// Nest under the previous sibling, then hand the block's last
    /// `release_trailing` children back to follow it
    Indent {
        block_id: BlockId,
        #[serde(default)]
        release_trailing: usize,
    },

    /// Become the next sibling of the former parent, absorbing followers
    Outdent { block_id: BlockId },

    /// Insert a new block right after `fallback_id` (or at the end of the root list)
    Create {
        block_id: BlockId,
        fallback_id: Option<BlockId>,
        #[serde(default)]
        text: String,
    },

    Delete {
        block_id: BlockId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        captured: Option<Captured>,
    },

    Restore {
        snapshot: BlockSnapshot,
        parent_id: Option<BlockId>,
        index: usize,
    },

    /// Steps applied atomically, in order
    Sequence { steps: Vec<StructuralAction> },
}

/// Outcome of a successful apply
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub action: StructuralAction,
    pub inverse: StructuralAction,
}

impl StructuralAction {
    pub fn move_block(block_id: impl Into<BlockId>, direction: Direction) -> Self {
        StructuralAction::Move {
            block_id: block_id.into(),
            direction,
        }
    }

    pub fn indent(block_id: impl Into<BlockId>) -> Self {
        StructuralAction::Indent {
            block_id: block_id.into(),
            release_trailing: 0,
        }
    }

    pub fn outdent(block_id: impl Into<BlockId>) -> Self {
        StructuralAction::Outdent {
            block_id: block_id.into(),
        }
    }

    /// A reorder whose source location is resolved at apply time
    pub fn reorder(block_id: impl Into<BlockId>, to_parent_id: Option<BlockId>, to_index: usize) -> Self {
        StructuralAction::Reorder {
            block_id: block_id.into(),
            from_parent_id: None,
            from_index: 0,
            to_parent_id,
            to_index,
        }
    }

    pub fn create(block_id: impl Into<BlockId>, fallback_id: Option<BlockId>, text: impl Into<String>) -> Self {
        StructuralAction::Create {
            block_id: block_id.into(),
            fallback_id,
            text: text.into(),
        }
    }

    pub fn delete(block_id: impl Into<BlockId>) -> Self {
        StructuralAction::Delete {
            block_id: block_id.into(),
            captured: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StructuralAction::Move { .. } => "move",
            StructuralAction::Reorder { .. } => "reorder",
            StructuralAction::Indent { .. } => "indent",
            StructuralAction::Outdent { .. } => "outdent",
            StructuralAction::Create { .. } => "create",
            StructuralAction::Delete { .. } => "delete",
            StructuralAction::Restore { .. } => "restore",
            StructuralAction::Sequence { .. } => "sequence",
        }
    }

    /// The block this action is about
    pub fn subject(&self) -> Option<&BlockId> {
        match self {
            StructuralAction::Move { block_id, .. }
            | StructuralAction::Reorder { block_id, .. }
            | StructuralAction::Indent { block_id, .. }
            | StructuralAction::Outdent { block_id }
            | StructuralAction::Create { block_id, .. }
            | StructuralAction::Delete { block_id, .. } => Some(block_id),
            StructuralAction::Restore { snapshot, .. } => Some(&snapshot.id),
            StructuralAction::Sequence { steps } => steps.first().and_then(StructuralAction::subject),
        }
    }

    /// Apply to `tree`, returning the materialized action and its inverse
    pub fn apply(&self, tree: &mut BlockTree) -> Result<Applied, EditorError> {
        let result = match self {
            StructuralAction::Move { block_id, direction } => apply_move(tree, block_id, *direction),
            StructuralAction::Reorder {
                block_id,
                to_parent_id,
                to_index,
                ..
            } => apply_reorder(tree, block_id, to_parent_id.as_ref(), *to_index),
            StructuralAction::Indent {
                block_id,
                release_trailing,
            } => apply_indent(tree, block_id, *release_trailing),
            StructuralAction::Outdent { block_id } => apply_outdent(tree, block_id),
            StructuralAction::Create {
                block_id,
                fallback_id,
                text,
            } => apply_create(tree, block_id, fallback_id.as_ref(), text),
            StructuralAction::Delete { block_id, .. } => apply_delete(tree, block_id),
            StructuralAction::Restore {
                snapshot,
                parent_id,
                index,
            } => apply_restore(tree, snapshot, parent_id.as_ref(), *index),
            StructuralAction::Sequence { steps } => apply_sequence(tree, steps),
        };

        match &result {
            Ok(applied) => debug!(action = applied.action.name(), block = ?self.subject(), "structural action applied"),
            Err(err) => debug!(action = self.name(), block = ?self.subject(), %err, "structural action rejected"),
        }
        result
    }
}

fn locate(tree: &BlockTree, block_id: &BlockId) -> Result<crate::tree::BlockLocation, EditorError> {
    tree.find_block(block_id)
        .ok_or_else(|| EditorError::NotFound(block_id.clone()))
}

fn apply_move(tree: &mut BlockTree, block_id: &BlockId, direction: Direction) -> Result<Applied, EditorError> {
    let loc = locate(tree, block_id)?;

    let target = match direction {
        Direction::Up if loc.is_first() => {
            if loc.parent.is_none() {
                return Err(EditorError::BoundaryRejected(Boundary::FirstSibling));
            }
            // Climb one level: become the sibling just before the former parent
            return apply_sequence(
                tree,
                &[
                    StructuralAction::outdent(block_id.clone()),
                    StructuralAction::move_block(block_id.clone(), Direction::Up),
                ],
            );
        }
        Direction::Up => loc.index - 1,
        Direction::Down if loc.is_last() => {
            return Err(EditorError::BoundaryRejected(Boundary::LastSibling));
        }
        Direction::Down => loc.index + 1,
    };

    tree.detach(block_id)?;
    tree.attach(block_id, loc.parent.as_ref(), target)?;

    Ok(Applied {
        action: StructuralAction::move_block(block_id.clone(), direction),
        inverse: StructuralAction::move_block(block_id.clone(), direction.opposite()),
    })
}

fn apply_reorder(
    tree: &mut BlockTree,
    block_id: &BlockId,
    to_parent: Option<&BlockId>,
    to_index: usize,
) -> Result<Applied, EditorError> {
    let loc = locate(tree, block_id)?;
    let index = tree.relocate(block_id, to_parent, to_index)?;

    Ok(Applied {
        action: StructuralAction::Reorder {
            block_id: block_id.clone(),
            from_parent_id: loc.parent.clone(),
            from_index: loc.index,
            to_parent_id: to_parent.cloned(),
            to_index: index,
        },
        inverse: StructuralAction::Reorder {
            block_id: block_id.clone(),
            from_parent_id: to_parent.cloned(),
            from_index: index,
            to_parent_id: loc.parent,
            to_index: loc.index,
        },
    })
}

fn apply_indent(tree: &mut BlockTree, block_id: &BlockId, release_trailing: usize) -> Result<Applied, EditorError> {
    let loc = locate(tree, block_id)?;
    if loc.is_first() {
        return Err(EditorError::BoundaryRejected(Boundary::NoPreviousSibling));
    }
    let new_parent = loc.siblings[loc.index - 1].clone();

    tree.detach(block_id)?;
    let end = tree.child_count(Some(&new_parent));
    let position = tree.attach(block_id, Some(&new_parent), end)?;

    let children = tree.children_of(Some(block_id)).unwrap_or_default().to_vec();
    let release = release_trailing.min(children.len());
    for (offset, child) in children[children.len() - release..].iter().enumerate() {
        tree.detach(child)?;
        tree.attach(child, Some(&new_parent), position + 1 + offset)?;
    }

    Ok(Applied {
        action: StructuralAction::Indent {
            block_id: block_id.clone(),
            release_trailing: release,
        },
        inverse: StructuralAction::outdent(block_id.clone()),
    })
}

fn apply_outdent(tree: &mut BlockTree, block_id: &BlockId) -> Result<Applied, EditorError> {
    let loc = locate(tree, block_id)?;
    let parent = loc
        .parent
        .clone()
        .ok_or(EditorError::BoundaryRejected(Boundary::NoParent))?;
    let parent_loc = locate(tree, &parent)?;
    let followers = loc.siblings[loc.index + 1..].to_vec();

    tree.detach(block_id)?;
    tree.attach(block_id, parent_loc.parent.as_ref(), parent_loc.index + 1)?;

    // Followers keep reading order by becoming trailing children
    for follower in &followers {
        tree.detach(follower)?;
        let end = tree.child_count(Some(block_id));
        tree.attach(follower, Some(block_id), end)?;
    }

    Ok(Applied {
        action: StructuralAction::outdent(block_id.clone()),
        inverse: StructuralAction::Indent {
            block_id: block_id.clone(),
            release_trailing: followers.len(),
        },
    })
}

fn apply_create(
    tree: &mut BlockTree,
    block_id: &BlockId,
    fallback_id: Option<&BlockId>,
    text: &str,
) -> Result<Applied, EditorError> {
    let (parent, index) = match fallback_id {
        Some(reference) => {
            let loc = locate(tree, reference)?;
            (loc.parent, loc.index + 1)
        }
        None => (None, tree.roots().len()),
    };

    tree.insert_snapshot(&BlockSnapshot::new(block_id.clone(), text), parent.as_ref(), index)?;

    Ok(Applied {
        action: StructuralAction::create(block_id.clone(), fallback_id.cloned(), text),
        inverse: StructuralAction::delete(block_id.clone()),
    })
}

fn apply_delete(tree: &mut BlockTree, block_id: &BlockId) -> Result<Applied, EditorError> {
    let (snapshot, parent_id, index) = tree.remove_subtree(block_id)?;

    Ok(Applied {
        action: StructuralAction::Delete {
            block_id: block_id.clone(),
            captured: Some(Captured {
                snapshot: snapshot.clone(),
                parent_id: parent_id.clone(),
                index,
            }),
        },
        inverse: StructuralAction::Restore {
            snapshot,
            parent_id,
            index,
        },
    })
}

fn apply_restore(
    tree: &mut BlockTree,
    snapshot: &BlockSnapshot,
    parent_id: Option<&BlockId>,
    index: usize,
) -> Result<Applied, EditorError> {
    let index = tree.insert_snapshot(snapshot, parent_id, index)?;

    Ok(Applied {
        action: StructuralAction::Restore {
            snapshot: snapshot.clone(),
            parent_id: parent_id.cloned(),
            index,
        },
        inverse: StructuralAction::delete(snapshot.id.clone()),
    })
}

fn apply_sequence(tree: &mut BlockTree, steps: &[StructuralAction]) -> Result<Applied, EditorError> {
    let mut done: Vec<Applied> = Vec::with_capacity(steps.len());

    for step in steps {
        match step.apply(tree) {
            Ok(applied) => done.push(applied),
            Err(err) => {
                for applied in done.iter().rev() {
                    if let Err(rollback) = applied.inverse.apply(tree) {
                        warn!(%rollback, "failed to roll back partial sequence");
                    }
                }
                return Err(err);
            }
        }
    }

    Ok(Applied {
        action: StructuralAction::Sequence {
            steps: done.iter().map(|a| a.action.clone()).collect(),
        },
        inverse: StructuralAction::Sequence {
            steps: done.iter().rev().map(|a| a.inverse.clone()).collect(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> BlockId {
        BlockId::from(s)
    }

    fn tree(blocks: Vec<BlockSnapshot>) -> BlockTree {
        BlockTree::from_snapshots(&blocks).unwrap()
    }

    fn leaf(s: &str) -> BlockSnapshot {
        BlockSnapshot::new(s, s.to_uppercase())
    }

    fn ids(tree: &BlockTree, parent: Option<&str>) -> Vec<String> {
        let parent = parent.map(id);
        tree.children_of(parent.as_ref())
            .unwrap()
            .iter()
            .map(|b| b.to_string())
            .collect()
    }

    #[test]
    fn test_move_swaps_siblings() {
        let mut t = tree(vec![leaf("a"), leaf("b"), leaf("c")]);
        let applied = StructuralAction::move_block("b", Direction::Down).apply(&mut t).unwrap();

        assert_eq!(ids(&t, None), vec!["a", "c", "b"]);
        assert_eq!(applied.inverse, StructuralAction::move_block("b", Direction::Up));
    }

    #[test]
    fn test_move_down_on_last_is_rejected() {
        let mut t = tree(vec![leaf("a"), leaf("b")]);
        let err = StructuralAction::move_block("b", Direction::Down).apply(&mut t).unwrap_err();
        assert_eq!(err, EditorError::BoundaryRejected(Boundary::LastSibling));
    }

    #[test]
    fn test_move_up_on_root_first_is_rejected() {
        let mut t = tree(vec![leaf("a"), leaf("b")]);
        let err = StructuralAction::move_block("a", Direction::Up).apply(&mut t).unwrap_err();
        assert_eq!(err, EditorError::BoundaryRejected(Boundary::FirstSibling));
    }

    #[test]
    fn test_move_up_on_nested_first_climbs() {
        // g[p[b, c], d]
        let mut t = tree(vec![leaf("g").with_children(vec![
            leaf("p").with_children(vec![leaf("b"), leaf("c")]),
            leaf("d"),
        ])]);

        let applied = StructuralAction::move_block("b", Direction::Up).apply(&mut t).unwrap();

        // b lands just before its former parent and absorbs c
        assert_eq!(ids(&t, Some("g")), vec!["b", "p", "d"]);
        assert_eq!(ids(&t, Some("b")), vec!["c"]);
        assert!(ids(&t, Some("p")).is_empty());
        assert!(matches!(applied.action, StructuralAction::Sequence { ref steps } if steps.len() == 2));
    }

    #[test]
    fn test_indent_nests_under_previous_sibling() {
        let mut t = tree(vec![leaf("a").with_children(vec![leaf("x")]), leaf("b")]);
        StructuralAction::indent("b").apply(&mut t).unwrap();

        assert_eq!(ids(&t, None), vec!["a"]);
        assert_eq!(ids(&t, Some("a")), vec!["x", "b"]);
    }

    #[test]
    fn test_indent_first_is_rejected() {
        let mut t = tree(vec![leaf("a"), leaf("b")]);
        let err = StructuralAction::indent("a").apply(&mut t).unwrap_err();
        assert_eq!(err, EditorError::BoundaryRejected(Boundary::NoPreviousSibling));
    }

    #[test]
    fn test_outdent_absorbs_followers() {
        // g[p[a, b, c]]
        let mut t = tree(vec![leaf("g").with_children(vec![
            leaf("p").with_children(vec![leaf("a"), leaf("b"), leaf("c")]),
        ])]);

        let applied = StructuralAction::outdent("b").apply(&mut t).unwrap();

        assert_eq!(ids(&t, Some("g")), vec!["p", "b"]);
        assert_eq!(ids(&t, Some("p")), vec!["a"]);
        assert_eq!(ids(&t, Some("b")), vec!["c"]);
        assert_eq!(
            applied.inverse,
            StructuralAction::Indent {
                block_id: id("b"),
                release_trailing: 1
            }
        );
    }

    #[test]
    fn test_outdent_root_is_rejected() {
        let mut t = tree(vec![leaf("a")]);
        let err = StructuralAction::outdent("a").apply(&mut t).unwrap_err();
        assert_eq!(err, EditorError::BoundaryRejected(Boundary::NoParent));
    }

    #[test]
    fn test_reorder_records_source_location() {
        let mut t = tree(vec![leaf("a"), leaf("b"), leaf("c")]);
        let applied = StructuralAction::reorder("a", Some(id("c")), 5).apply(&mut t).unwrap();

        assert_eq!(ids(&t, Some("c")), vec!["a"]);
        assert_eq!(
            applied.inverse,
            StructuralAction::Reorder {
                block_id: id("a"),
                from_parent_id: Some(id("c")),
                from_index: 0,
                to_parent_id: None,
                to_index: 0,
            }
        );
    }

    #[test]
    fn test_reorder_into_descendant_is_forbidden() {
        let mut t = tree(vec![leaf("a").with_children(vec![leaf("b")])]);
        let err = StructuralAction::reorder("a", Some(id("b")), 0).apply(&mut t).unwrap_err();
        assert!(matches!(err, EditorError::ForbiddenTarget { .. }));
    }

    #[test]
    fn test_create_inserts_after_reference() {
        let mut t = tree(vec![leaf("a").with_children(vec![leaf("x"), leaf("y")])]);
        StructuralAction::create("n", Some(id("x")), "new").apply(&mut t).unwrap();

        assert_eq!(ids(&t, Some("a")), vec!["x", "n", "y"]);
        assert_eq!(t.text(&id("n")), Some("new"));
    }

    #[test]
    fn test_create_duplicate_id_fails() {
        let mut t = tree(vec![leaf("a")]);
        let err = StructuralAction::create("a", None, "").apply(&mut t).unwrap_err();
        assert_eq!(err, EditorError::DuplicateBlock(id("a")));
    }

    #[test]
    fn test_delete_captures_subtree() {
        let mut t = tree(vec![leaf("a").with_children(vec![leaf("b").with_children(vec![leaf("c")])])]);
        let applied = StructuralAction::delete("a").apply(&mut t).unwrap();

        assert!(t.is_empty());
        match applied.action {
            StructuralAction::Delete {
                captured: Some(captured),
                ..
            } => {
                assert_eq!(captured.snapshot.node_count(), 3);
                assert_eq!(captured.parent_id, None);
                assert_eq!(captured.index, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failed_sequence_rolls_back() {
        let original = tree(vec![leaf("a"), leaf("b")]);
        let mut t = original.clone();

        let action = StructuralAction::Sequence {
            steps: vec![
                StructuralAction::move_block("a", Direction::Down),
                StructuralAction::outdent("a"),
            ],
        };
        assert!(action.apply(&mut t).is_err());
        assert!(t.structurally_eq(&original));
    }

    #[test]
    fn test_action_json_is_tagged() {
        let action = StructuralAction::Indent {
            block_id: id("b"),
            release_trailing: 2,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"indent","blockId":"b","releaseTrailing":2}"#);

        let parsed: StructuralAction = serde_json::from_str(r#"{"type":"indent","blockId":"b"}"#).unwrap();
        assert_eq!(parsed, StructuralAction::indent("b"));
    }
}
