//! # Block Tree Store
//!
//! Arena representation of an article's block forest.
//!
//! All blocks live in one table keyed by id. Each node holds its parent id
//! and the ordered ids of its children; the root list is kept separately.
//! Sibling order is dense and 0-based: a block's index is simply its
//! position in the parent's child list.
//!
//! ## Journal
//!
//! While a journal is open, every primitive records the first pre-mutation
//! value of each node (and of the root list) it touches. Committing yields a
//! [`PreImage`] which [`BlockTree::restore`] reinstates verbatim, undoing an
//! optimistic mutation without walking the whole tree.

use crate::errors::EditorError;
use outline_common::{BlockId, BlockSnapshot};
use std::collections::{HashMap, HashSet};

/// One block in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub text: String,
    pub collapsed: bool,
    parent: Option<BlockId>,
    children: Vec<BlockId>,
}

impl Node {
    fn new(text: String, collapsed: bool) -> Self {
        Self {
            text,
            collapsed,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<&BlockId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[BlockId] {
        &self.children
    }
}

/// Where a block sits in the tree
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLocation {
    pub id: BlockId,
    /// `None` for root-level blocks
    pub parent: Option<BlockId>,
    pub index: usize,
    pub siblings: Vec<BlockId>,
    /// Root-to-parent chain
    pub ancestors: Vec<BlockId>,
}

impl BlockLocation {
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.siblings.len()
    }
}

#[derive(Debug, Clone, Default)]
struct Journal {
    nodes: HashMap<BlockId, Option<Node>>,
    roots: Option<Vec<BlockId>>,
}

/// Pre-mutation values of everything a journaled mutation touched
#[derive(Debug, Clone, Default)]
pub struct PreImage {
    nodes: HashMap<BlockId, Option<Node>>,
    roots: Option<Vec<BlockId>>,
}

impl PreImage {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.roots.is_none()
    }

    /// Number of nodes captured (the root list is not counted)
    pub fn touched(&self) -> usize {
        self.nodes.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockTree {
    nodes: HashMap<BlockId, Node>,
    roots: Vec<BlockId>,
    journal: Option<Journal>,
}

impl BlockTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// An arena holding a single empty root block
    pub fn with_root(id: BlockId) -> Self {
        let mut tree = Self::new();
        tree.nodes.insert(id.clone(), Node::new(String::new(), false));
        tree.roots.push(id);
        tree
    }

    /// Build an arena from nested snapshots
    pub fn from_snapshots(blocks: &[BlockSnapshot]) -> Result<Self, EditorError> {
        let mut tree = Self::new();
        for block in blocks {
            let index = tree.roots.len();
            tree.insert_snapshot(block, None, index)?;
        }
        Ok(tree)
    }

    pub fn to_snapshots(&self) -> Vec<BlockSnapshot> {
        self.roots
            .iter()
            .filter_map(|id| self.snapshot(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &BlockId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn text(&self, id: &BlockId) -> Option<&str> {
        self.nodes.get(id).map(|node| node.text.as_str())
    }

    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    /// Children of `parent`, or the root list for `None`
    pub fn children_of(&self, parent: Option<&BlockId>) -> Option<&[BlockId]> {
        match parent {
            None => Some(self.roots.as_slice()),
            Some(id) => self.nodes.get(id).map(|node| node.children.as_slice()),
        }
    }

    pub fn child_count(&self, parent: Option<&BlockId>) -> usize {
        self.children_of(parent).map_or(0, <[BlockId]>::len)
    }

    /// Locate a block, including its root-to-parent ancestor chain
    pub fn find_block(&self, id: &BlockId) -> Option<BlockLocation> {
        let node = self.nodes.get(id)?;
        let siblings = self.children_of(node.parent.as_ref())?;
        let index = siblings.iter().position(|sibling| sibling == id)?;

        Some(BlockLocation {
            id: id.clone(),
            parent: node.parent.clone(),
            index,
            siblings: siblings.to_vec(),
            ancestors: self.ancestors(id),
        })
    }

    /// Root-to-parent chain, O(depth)
    pub fn ancestors(&self, id: &BlockId) -> Vec<BlockId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(id).and_then(|node| node.parent.clone());
        while let Some(parent) = current {
            current = self.nodes.get(&parent).and_then(|node| node.parent.clone());
            chain.push(parent);
        }
        chain.reverse();
        chain
    }

    pub fn depth(&self, id: &BlockId) -> Option<usize> {
        self.nodes.get(id).map(|_| self.ancestors(id).len())
    }

    /// All descendants of `id`, depth-first pre-order, excluding `id`
    pub fn descendants(&self, id: &BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack: Vec<&BlockId> = match self.nodes.get(id) {
            Some(node) => node.children.iter().rev().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next.clone());
            if let Some(node) = self.nodes.get(next) {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// `id` plus all its descendants
    pub fn subtree_ids(&self, id: &BlockId) -> HashSet<BlockId> {
        let mut set: HashSet<BlockId> = self.descendants(id).into_iter().collect();
        if self.contains(id) {
            set.insert(id.clone());
        }
        set
    }

    /// True when `candidate` is `root` or lies beneath it
    pub fn is_within(&self, candidate: &BlockId, root: &BlockId) -> bool {
        let mut current = Some(candidate.clone());
        while let Some(id) = current {
            if &id == root {
                return true;
            }
            current = self.nodes.get(&id).and_then(|node| node.parent.clone());
        }
        false
    }

    /// Capture `id` and its whole subtree
    pub fn snapshot(&self, id: &BlockId) -> Option<BlockSnapshot> {
        let node = self.nodes.get(id)?;
        Some(BlockSnapshot {
            id: id.clone(),
            text: node.text.clone(),
            collapsed: node.collapsed,
            children: node
                .children
                .iter()
                .filter_map(|child| self.snapshot(child))
                .collect(),
        })
    }

    /// Compare ids, text and nesting; `collapsed` is ignored
    pub fn structurally_eq(&self, other: &BlockTree) -> bool {
        self.roots.len() == other.roots.len()
            && self
                .roots
                .iter()
                .zip(&other.roots)
                .all(|(a, b)| self.subtree_eq(a, other, b))
    }

    fn subtree_eq(&self, id: &BlockId, other: &BlockTree, other_id: &BlockId) -> bool {
        if id != other_id {
            return false;
        }
        match (self.nodes.get(id), other.nodes.get(other_id)) {
            (Some(a), Some(b)) => {
                a.text == b.text
                    && a.children.len() == b.children.len()
                    && a.children
                        .iter()
                        .zip(&b.children)
                        .all(|(x, y)| self.subtree_eq(x, other, y))
            }
            _ => false,
        }
    }

    /// Verify parent links, reachability and acyclicity
    pub fn check_integrity(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<(Option<&BlockId>, &BlockId)> =
            self.roots.iter().map(|id| (None, id)).collect();

        while let Some((parent, id)) = stack.pop() {
            if !seen.insert(id.clone()) {
                return Err(format!("block {} reachable twice", id));
            }
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| format!("dangling child id {}", id))?;
            if node.parent.as_ref() != parent {
                return Err(format!("parent link of {} is stale", id));
            }
            stack.extend(node.children.iter().map(|child| (Some(id), child)));
        }

        if seen.len() != self.nodes.len() {
            return Err(format!(
                "{} blocks unreachable from the root list",
                self.nodes.len() - seen.len()
            ));
        }
        Ok(())
    }

    pub fn set_text(&mut self, id: &BlockId, text: String) -> Result<String, EditorError> {
        let node = self.node_mut(id)?;
        Ok(std::mem::replace(&mut node.text, text))
    }

    pub fn set_collapsed(&mut self, id: &BlockId, collapsed: bool) -> Result<(), EditorError> {
        self.node_mut(id)?.collapsed = collapsed;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Primitives. Every mutation below goes through `touch_*` first.
    // ------------------------------------------------------------------

    /// Unlink a block from its parent's child list; the node stays in the arena
    pub(crate) fn detach(&mut self, id: &BlockId) -> Result<(Option<BlockId>, usize), EditorError> {
        let parent = self
            .nodes
            .get(id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))?
            .parent
            .clone();

        let siblings = self.siblings_mut(parent.as_ref())?;
        let index = siblings
            .iter()
            .position(|sibling| sibling == id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))?;
        siblings.remove(index);

        self.node_mut(id)?.parent = None;
        Ok((parent, index))
    }

    /// Link a detached block under `parent` at `index`, clamped to the child count
    pub(crate) fn attach(
        &mut self,
        id: &BlockId,
        parent: Option<&BlockId>,
        index: usize,
    ) -> Result<usize, EditorError> {
        if !self.contains(id) {
            return Err(EditorError::NotFound(id.clone()));
        }
        let siblings = self.siblings_mut(parent)?;
        let index = index.min(siblings.len());
        siblings.insert(index, id.clone());

        self.node_mut(id)?.parent = parent.cloned();
        Ok(index)
    }

    /// Detach then attach, returning the resulting index
    pub(crate) fn relocate(
        &mut self,
        id: &BlockId,
        parent: Option<&BlockId>,
        index: usize,
    ) -> Result<usize, EditorError> {
        if let Some(target) = parent {
            if !self.contains(target) {
                return Err(EditorError::NotFound(target.clone()));
            }
            if self.is_within(target, id) {
                return Err(EditorError::ForbiddenTarget {
                    block_id: id.clone(),
                    parent_id: target.clone(),
                });
            }
        }
        self.detach(id)?;
        self.attach(id, parent, index)
    }

    /// Insert a whole subtree; every id in it must be new to the tree
    pub(crate) fn insert_snapshot(
        &mut self,
        snapshot: &BlockSnapshot,
        parent: Option<&BlockId>,
        index: usize,
    ) -> Result<usize, EditorError> {
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(EditorError::NotFound(parent.clone()));
            }
        }
        let mut incoming = HashSet::new();
        Self::check_new_ids(snapshot, &self.nodes, &mut incoming)?;

        self.add_nodes(snapshot);
        self.attach(&snapshot.id, parent, index)
    }

    fn check_new_ids(
        snapshot: &BlockSnapshot,
        existing: &HashMap<BlockId, Node>,
        incoming: &mut HashSet<BlockId>,
    ) -> Result<(), EditorError> {
        if existing.contains_key(&snapshot.id) || !incoming.insert(snapshot.id.clone()) {
            return Err(EditorError::DuplicateBlock(snapshot.id.clone()));
        }
        for child in &snapshot.children {
            Self::check_new_ids(child, existing, incoming)?;
        }
        Ok(())
    }

    fn add_nodes(&mut self, snapshot: &BlockSnapshot) {
        self.touch_node(&snapshot.id);
        let mut node = Node::new(snapshot.text.clone(), snapshot.collapsed);
        node.children = snapshot.children.iter().map(|c| c.id.clone()).collect();
        self.nodes.insert(snapshot.id.clone(), node);

        for child in &snapshot.children {
            self.add_nodes(child);
            self.touch_node(&child.id);
            if let Some(node) = self.nodes.get_mut(&child.id) {
                node.parent = Some(snapshot.id.clone());
            }
        }
    }

    /// Remove a block and its entire subtree as one unit
    pub(crate) fn remove_subtree(
        &mut self,
        id: &BlockId,
    ) -> Result<(BlockSnapshot, Option<BlockId>, usize), EditorError> {
        let snapshot = self
            .snapshot(id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))?;
        let (parent, index) = self.detach(id)?;

        let mut doomed = self.descendants(id);
        doomed.push(id.clone());
        for block in &doomed {
            self.touch_node(block);
            self.nodes.remove(block);
        }
        Ok((snapshot, parent, index))
    }

    fn node_mut(&mut self, id: &BlockId) -> Result<&mut Node, EditorError> {
        self.touch_node(id);
        self.nodes
            .get_mut(id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))
    }

    fn siblings_mut(&mut self, parent: Option<&BlockId>) -> Result<&mut Vec<BlockId>, EditorError> {
        match parent {
            None => {
                self.touch_roots();
                Ok(&mut self.roots)
            }
            Some(id) => Ok(&mut self.node_mut(id)?.children),
        }
    }

    // ------------------------------------------------------------------
    // Journal
    // ------------------------------------------------------------------

    pub fn begin_journal(&mut self) {
        self.journal = Some(Journal::default());
    }

    pub fn commit_journal(&mut self) -> PreImage {
        let journal = self.journal.take().unwrap_or_default();
        PreImage {
            nodes: journal.nodes,
            roots: journal.roots,
        }
    }

    pub fn is_journaling(&self) -> bool {
        self.journal.is_some()
    }

    /// Reinstate every captured pre-mutation value
    pub fn restore(&mut self, pre_image: PreImage) {
        for (id, node) in pre_image.nodes {
            self.touch_node(&id);
            match node {
                Some(node) => {
                    self.nodes.insert(id, node);
                }
                None => {
                    self.nodes.remove(&id);
                }
            }
        }
        if let Some(roots) = pre_image.roots {
            self.touch_roots();
            self.roots = roots;
        }
    }

    fn touch_node(&mut self, id: &BlockId) {
        if let Some(journal) = &mut self.journal {
            if !journal.nodes.contains_key(id) {
                journal.nodes.insert(id.clone(), self.nodes.get(id).cloned());
            }
        }
    }

    fn touch_roots(&mut self) {
        if let Some(journal) = &mut self.journal {
            if journal.roots.is_none() {
                journal.roots = Some(self.roots.clone());
            }
        }
    }
}
