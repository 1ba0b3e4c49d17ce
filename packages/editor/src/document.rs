//! # Article Handle
//!
//! An article is a title, a block forest, and the text-edit history of its
//! blocks. It is the single owner of its tree: structural changes go through
//! [`Article::apply`], text changes through [`Article::set_text`] and the
//! revert/reapply pair used by text undo/redo.
//!
//! ## Lifecycle
//!
//! ```text
//! Record → Article → apply / set_text → Record
//!   ↓         ↓             ↓             ↓
//! JSON      arena     updated_at++      JSON
//! ```

use crate::actions::{Applied, StructuralAction};
use crate::errors::EditorError;
use crate::tree::{BlockLocation, BlockTree, PreImage};
use chrono::{DateTime, Utc};
use outline_common::{ArticleId, ArticleRecord, BlockId, HistoryEntry, IdGenerator};

#[derive(Debug, Clone)]
pub struct Article {
    id: ArticleId,
    pub title: String,
    tree: BlockTree,
    history: Vec<HistoryEntry>,
    redo_history: Vec<HistoryEntry>,
    updated_at: DateTime<Utc>,

    /// Increments on each accepted mutation
    version: u64,

    ids: IdGenerator,
    history_seq: u64,
}

/// Everything needed to undo one optimistic mutation
#[derive(Debug, Clone)]
pub struct Checkpoint {
    tree: PreImage,
    history: Vec<HistoryEntry>,
    redo_history: Vec<HistoryEntry>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Article {
    /// A fresh article holding one empty block
    pub fn new(id: ArticleId, title: impl Into<String>) -> Self {
        let mut ids = IdGenerator::new(&id);
        let tree = BlockTree::with_root(ids.new_id());

        Self {
            id,
            title: title.into(),
            tree,
            history: Vec::new(),
            redo_history: Vec::new(),
            updated_at: Utc::now(),
            version: 0,
            ids,
            history_seq: 0,
        }
    }

    pub fn from_record(record: ArticleRecord) -> Result<Self, EditorError> {
        let tree = BlockTree::from_snapshots(&record.blocks)?;

        let mut ids = IdGenerator::new(&record.id);
        ids.resume_after(&outline_common::collect_ids(&record.blocks));

        let history_seq = record
            .history
            .iter()
            .chain(&record.redo_history)
            .filter_map(|entry| history_number(&entry.id))
            .max()
            .unwrap_or(0);

        Ok(Self {
            id: record.id,
            title: record.title,
            tree,
            history: record.history,
            redo_history: record.redo_history,
            updated_at: record.updated_at,
            version: 0,
            ids,
            history_seq,
        })
    }

    pub fn to_record(&self) -> ArticleRecord {
        ArticleRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            blocks: self.tree.to_snapshots(),
            history: self.history.clone(),
            redo_history: self.redo_history.clone(),
            updated_at: self.updated_at,
        }
    }

    pub fn id(&self) -> &ArticleId {
        &self.id
    }

    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    pub fn find_block(&self, id: &BlockId) -> Option<BlockLocation> {
        self.tree.find_block(id)
    }

    pub fn text(&self, id: &BlockId) -> Result<&str, EditorError> {
        self.tree
            .text(id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn redo_history(&self) -> &[HistoryEntry] {
        &self.redo_history
    }

    /// Look an entry up in either history list
    pub fn history_entry(&self, entry_id: &str) -> Option<&HistoryEntry> {
        self.history
            .iter()
            .chain(&self.redo_history)
            .find(|entry| entry.id == entry_id)
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn next_block_id(&mut self) -> BlockId {
        self.ids.new_id()
    }

    /// Apply a structural action to the tree
    pub fn apply(&mut self, action: &StructuralAction) -> Result<Applied, EditorError> {
        let applied = action.apply(&mut self.tree)?;
        self.touch();
        Ok(applied)
    }

    /// Replace a block's text, recording history when it actually changed
    pub fn set_text(&mut self, block_id: &BlockId, text: String) -> Result<Option<HistoryEntry>, EditorError> {
        let before = self.text(block_id)?.to_string();
        self.history_seq += 1;
        let Some(entry) = HistoryEntry::new(format!("h{}", self.history_seq), block_id.clone(), before, text.clone())
        else {
            self.history_seq -= 1;
            return Ok(None);
        };

        self.tree.set_text(block_id, text)?;
        self.history.push(entry.clone());
        self.redo_history.clear();
        self.touch();
        Ok(Some(entry))
    }

    /// Record an edit made elsewhere, keeping its id and timestamp
    pub fn apply_history_entry(&mut self, entry: HistoryEntry) -> Result<(), EditorError> {
        self.tree.set_text(&entry.block_id, entry.after.clone())?;
        if let Some(n) = history_number(&entry.id) {
            self.history_seq = self.history_seq.max(n);
        }
        self.history.push(entry);
        self.redo_history.clear();
        self.touch();
        Ok(())
    }

    /// Text undo: restore `before` and move the entry to the redo history
    pub fn revert_text(&mut self, entry_id: &str) -> Result<HistoryEntry, EditorError> {
        let position = self
            .history
            .iter()
            .rposition(|entry| entry.id == entry_id)
            .ok_or_else(|| EditorError::HistoryEntryNotFound(entry_id.to_string()))?;

        let block_id = self.history[position].block_id.clone();
        let before = self.history[position].before.clone();
        self.tree.set_text(&block_id, before)?;

        let entry = self.history.remove(position);
        self.redo_history.push(entry.clone());
        self.touch();
        Ok(entry)
    }

    /// Text redo: restore `after` and move the entry back to the history
    pub fn reapply_text(&mut self, entry_id: &str) -> Result<HistoryEntry, EditorError> {
        let position = self
            .redo_history
            .iter()
            .rposition(|entry| entry.id == entry_id)
            .ok_or_else(|| EditorError::HistoryEntryNotFound(entry_id.to_string()))?;

        let block_id = self.redo_history[position].block_id.clone();
        let after = self.redo_history[position].after.clone();
        self.tree.set_text(&block_id, after)?;

        let entry = self.redo_history.remove(position);
        self.history.push(entry.clone());
        self.touch();
        Ok(entry)
    }

    /// Drop every redoable text entry, returning how many were dropped
    pub fn clear_redo_history(&mut self) -> usize {
        let dropped = self.redo_history.len();
        if dropped > 0 {
            self.redo_history.clear();
            self.touch();
        }
        dropped
    }

    pub fn set_collapsed(&mut self, block_id: &BlockId, collapsed: bool) -> Result<(), EditorError> {
        self.tree.set_collapsed(block_id, collapsed)
    }

    /// Move a block to an authoritative position without recording anything
    pub fn relocate(&mut self, block_id: &BlockId, parent: Option<&BlockId>, index: usize) -> Result<usize, EditorError> {
        let index = self.tree.relocate(block_id, parent, index)?;
        self.touch();
        Ok(index)
    }

    /// Run `f` while journaling, returning its result and the captured pre-image
    pub fn checkpointed<T>(
        &mut self,
        f: impl FnOnce(&mut Article) -> Result<T, EditorError>,
    ) -> (Result<T, EditorError>, Checkpoint) {
        let history = self.history.clone();
        let redo_history = self.redo_history.clone();
        let updated_at = self.updated_at;
        let version = self.version;

        self.tree.begin_journal();
        let result = f(self);
        let tree = self.tree.commit_journal();

        (
            result,
            Checkpoint {
                tree,
                history,
                redo_history,
                updated_at,
                version,
            },
        )
    }

    /// Put back everything captured by a checkpoint
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.tree.restore(checkpoint.tree);
        self.history = checkpoint.history;
        self.redo_history = checkpoint.redo_history;
        self.updated_at = checkpoint.updated_at;
        self.version = checkpoint.version;
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

fn history_number(entry_id: &str) -> Option<u64> {
    entry_id.strip_prefix('h')?.parse().ok()
}
