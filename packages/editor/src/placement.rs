//! # Drop Placement
//!
//! Resolves a pointer position over the rendered block rows into a drop
//! target: which block, which zone (`before` / `inside` / `after`), and the
//! effective parent and index the dragged block would land at.
//!
//! The dragged block and its descendants form the *forbidden set*; they are
//! never candidates and never a resolved parent.

use crate::actions::StructuralAction;
use crate::config::PlacementConfig;
use crate::errors::EditorError;
use crate::tree::BlockTree;
use outline_common::BlockId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.top && y <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = (self.left + self.width).max(other.left + other.width);
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }
}

/// The on-screen row of one visible block (its own row, not its children)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRegion {
    pub id: BlockId,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before,
    Inside,
    After,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTarget {
    pub target_id: BlockId,
    pub placement: Placement,
    pub parent_id: Option<BlockId>,
    pub index: usize,
    /// Depth the dropped block will have
    pub depth: usize,
}

impl DropTarget {
    /// Turn the target into a reorder of `block_id`.
    ///
    /// `index` is expressed against the tree with the dragged block still in
    /// place; a reorder detaches first, so a block that precedes the insertion
    /// point in the same parent shifts it by one.
    pub fn to_action(&self, tree: &BlockTree, block_id: &BlockId) -> Result<StructuralAction, EditorError> {
        let loc = tree
            .find_block(block_id)
            .ok_or_else(|| EditorError::NotFound(block_id.clone()))?;

        let mut index = self.index;
        if loc.parent == self.parent_id && loc.index < index {
            index -= 1;
        }
        Ok(StructuralAction::reorder(block_id.clone(), self.parent_id.clone(), index))
    }
}

/// Classify a vertical ratio within the candidate row
pub fn classify(ratio: f64, config: &PlacementConfig) -> Placement {
    if ratio < config.before_ratio {
        Placement::Before
    } else if ratio > config.after_ratio {
        Placement::After
    } else {
        Placement::Inside
    }
}

/// Resolve the drop target for `pointer`, or `None` when nothing valid is under it
pub fn resolve(
    tree: &BlockTree,
    config: &PlacementConfig,
    pointer: Point,
    regions: &[BlockRegion],
    forbidden: &HashSet<BlockId>,
) -> Option<DropTarget> {
    let candidate = regions
        .iter()
        .filter(|region| !forbidden.contains(&region.id) && tree.contains(&region.id))
        .min_by(|a, b| {
            let da = (a.rect.center_y() - pointer.y).abs();
            let db = (b.rect.center_y() - pointer.y).abs();
            da.total_cmp(&db)
        })?;

    let rect = candidate.rect;
    let ratio = if rect.height > 0.0 {
        (pointer.y - rect.top) / rect.height
    } else {
        0.5
    };
    let placement = classify(ratio, config);

    let mut target = candidate.id.clone();
    let mut target_rect = rect;

    if placement != Placement::Inside && config.climb {
        while let Some(loc) = tree.find_block(&target) {
            let Some(parent) = loc.parent.clone() else {
                break;
            };
            // edges are judged with the dragged subtree already lifted out
            let mut remaining = loc.siblings.iter().filter(|sibling| !forbidden.contains(*sibling));
            let at_edge = match placement {
                Placement::After => remaining.next_back() == Some(&target),
                Placement::Before => remaining.next() == Some(&target),
                Placement::Inside => false,
            };
            if !at_edge || forbidden.contains(&parent) {
                break;
            }

            let left_of_threshold = pointer.x < target_rect.left + config.indent_unit;
            let outside = !subtree_bounds(tree, &target, target_rect, regions).contains_y(pointer.y);
            if !(left_of_threshold || outside) {
                break;
            }

            target_rect = region_rect(regions, &parent).unwrap_or(Rect {
                left: target_rect.left - config.indent_unit,
                ..target_rect
            });
            target = parent;
        }
    }

    let loc = tree.find_block(&target)?;
    let (parent_id, index, depth) = match placement {
        Placement::Inside => (
            Some(target.clone()),
            tree.child_count(Some(&target)),
            loc.depth() + 1,
        ),
        Placement::Before => (loc.parent.clone(), loc.index, loc.depth()),
        Placement::After => (loc.parent.clone(), loc.index + 1, loc.depth()),
    };

    if let Some(parent) = &parent_id {
        if forbidden.contains(parent) {
            debug!(%parent, "drop target rejected: inside dragged subtree");
            return None;
        }
    }

    Some(DropTarget {
        target_id: target,
        placement,
        parent_id,
        index,
        depth,
    })
}

fn region_rect(regions: &[BlockRegion], id: &BlockId) -> Option<Rect> {
    regions.iter().find(|region| &region.id == id).map(|region| region.rect)
}

/// Union of a block's row with the rows of its visible descendants
fn subtree_bounds(tree: &BlockTree, id: &BlockId, rect: Rect, regions: &[BlockRegion]) -> Rect {
    tree.descendants(id)
        .iter()
        .filter_map(|descendant| region_rect(regions, descendant))
        .fold(rect, |acc, r| acc.union(&r))
}

/// Lay out visible rows top to bottom; children of collapsed blocks are hidden
pub fn layout_regions(tree: &BlockTree, row_height: f64, indent_unit: f64, width: f64) -> Vec<BlockRegion> {
    let mut regions = Vec::new();
    let mut stack: Vec<(BlockId, usize)> = tree.roots().iter().rev().map(|id| (id.clone(), 0)).collect();

    while let Some((id, depth)) = stack.pop() {
        let top = regions.len() as f64 * row_height;
        let left = depth as f64 * indent_unit;
        regions.push(BlockRegion {
            id: id.clone(),
            rect: Rect::new(left, top, width - left, row_height),
        });

        if let Some(node) = tree.get(&id) {
            if !node.collapsed {
                stack.extend(node.children().iter().rev().map(|child| (child.clone(), depth + 1)));
            }
        }
    }
    regions
}

/// One pointer drag of one block, from press to release
#[derive(Debug, Clone)]
pub struct DragSession {
    block_id: BlockId,
    origin: Point,
    forbidden: HashSet<BlockId>,
    armed: bool,
    cancelled: bool,
    current: Option<DropTarget>,
}

impl DragSession {
    /// Start dragging `block_id`; the forbidden set is computed once here
    pub fn start(tree: &BlockTree, block_id: &BlockId, origin: Point) -> Result<Self, EditorError> {
        if !tree.contains(block_id) {
            return Err(EditorError::NotFound(block_id.clone()));
        }
        Ok(Self {
            block_id: block_id.clone(),
            origin,
            forbidden: tree.subtree_ids(block_id),
            armed: false,
            cancelled: false,
            current: None,
        })
    }

    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    pub fn forbidden(&self) -> &HashSet<BlockId> {
        &self.forbidden
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn current(&self) -> Option<&DropTarget> {
        self.current.as_ref()
    }

    /// Track the pointer; returns the target to draw an indicator for
    pub fn update(
        &mut self,
        tree: &BlockTree,
        config: &PlacementConfig,
        pointer: Point,
        regions: &[BlockRegion],
    ) -> Option<&DropTarget> {
        if self.cancelled {
            return None;
        }
        if !self.armed {
            if pointer.distance(&self.origin) < config.arm_threshold {
                return None;
            }
            self.armed = true;
        }
        self.current = resolve(tree, config, pointer, regions, &self.forbidden);
        self.current.as_ref()
    }

    /// Abandon the drag, discarding any computed placement.
    ///
    /// A cancelled session stays inert: later pointer updates and the final
    /// release resolve nothing.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.armed = false;
        self.current = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Release the pointer
    pub fn finish(self) -> Option<DropTarget> {
        if self.armed && !self.cancelled {
            self.current
        } else {
            None
        }
    }
}
