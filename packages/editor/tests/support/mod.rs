//! In-memory store that mirrors the editor engine, with failure switches

use outline_editor::{
    Article, ArticleId, BlockId, BlockSnapshot, BlockTree, Direction, EditorError, HistoryEntry, HistoryTarget,
    Persisted, Persistence, Relocation, StructuralAction,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub struct Mirror {
    article: Mutex<Article>,
    failing: AtomicBool,
    fail_on: Mutex<Option<&'static str>>,
    append_on_insert: bool,
    calls: Mutex<Vec<&'static str>>,
}

impl Mirror {
    pub fn new(article: &Article) -> Self {
        Self {
            article: Mutex::new(article.clone()),
            failing: AtomicBool::new(false),
            fail_on: Mutex::new(None),
            append_on_insert: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Inserts always land at the end of the root list, whatever was asked
    pub fn appending(article: &Article) -> Self {
        Self {
            append_on_insert: true,
            ..Self::new(article)
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Reject only calls to the named endpoint
    pub fn fail_on(&self, call: &'static str) {
        *self.fail_on.lock().unwrap() = Some(call);
    }

    pub fn tree(&self) -> BlockTree {
        self.article.lock().unwrap().tree().clone()
    }

    pub fn text(&self, block: &str) -> String {
        self.article
            .lock()
            .unwrap()
            .text(&BlockId::from(block))
            .unwrap()
            .to_string()
    }

    pub fn redo_history_len(&self) -> usize {
        self.article.lock().unwrap().redo_history().len()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, call: &'static str) -> Result<(), EditorError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) || *self.fail_on.lock().unwrap() == Some(call) {
            return Err(EditorError::PersistenceFailure(format!("{call} rejected")));
        }
        Ok(())
    }

    fn apply(&self, action: StructuralAction) -> Result<Persisted, EditorError> {
        let mut article = self.article.lock().unwrap();
        let block_id = action.subject().cloned();
        article.apply(&action)?;
        position(&article, block_id.as_ref())
    }
}

fn position(article: &Article, block_id: Option<&BlockId>) -> Result<Persisted, EditorError> {
    let block_id = block_id.ok_or_else(|| EditorError::PersistenceFailure("no subject".into()))?;
    let loc = article
        .find_block(block_id)
        .ok_or_else(|| EditorError::NotFound(block_id.clone()))?;
    Ok(Persisted {
        parent_id: loc.parent,
        index: loc.index,
    })
}

impl Persistence for Mirror {
    async fn insert_sibling(
        &self,
        _article: &ArticleId,
        after: Option<&BlockId>,
        block: &BlockSnapshot,
    ) -> Result<Persisted, EditorError> {
        self.check("insert_sibling")?;
        let after = if self.append_on_insert { None } else { after.cloned() };
        self.apply(StructuralAction::create(block.id.clone(), after, block.text.clone()))
    }

    async fn delete_block(&self, _article: &ArticleId, block_id: &BlockId) -> Result<Persisted, EditorError> {
        self.check("delete_block")?;
        let mut article = self.article.lock().unwrap();
        let before = position(&article, Some(block_id))?;
        article.apply(&StructuralAction::delete(block_id.clone()))?;
        Ok(before)
    }

    async fn move_block(
        &self,
        _article: &ArticleId,
        block_id: &BlockId,
        direction: Direction,
    ) -> Result<Persisted, EditorError> {
        self.check("move_block")?;
        self.apply(StructuralAction::move_block(block_id.clone(), direction))
    }

    async fn indent_block(
        &self,
        _article: &ArticleId,
        block_id: &BlockId,
        release_trailing: usize,
    ) -> Result<Persisted, EditorError> {
        self.check("indent_block")?;
        self.apply(StructuralAction::Indent {
            block_id: block_id.clone(),
            release_trailing,
        })
    }

    async fn outdent_block(&self, _article: &ArticleId, block_id: &BlockId) -> Result<Persisted, EditorError> {
        self.check("outdent_block")?;
        self.apply(StructuralAction::outdent(block_id.clone()))
    }

    async fn relocate_block(
        &self,
        _article: &ArticleId,
        block_id: &BlockId,
        relocation: &Relocation,
    ) -> Result<Persisted, EditorError> {
        self.check("relocate_block")?;
        self.apply(StructuralAction::reorder(
            block_id.clone(),
            relocation.parent_id.clone(),
            relocation.index,
        ))
    }

    async fn restore_block(
        &self,
        _article: &ArticleId,
        snapshot: &BlockSnapshot,
        parent_id: Option<&BlockId>,
        index: usize,
    ) -> Result<Persisted, EditorError> {
        self.check("restore_block")?;
        self.apply(StructuralAction::Restore {
            snapshot: snapshot.clone(),
            parent_id: parent_id.cloned(),
            index,
        })
    }

    async fn save_text(&self, _article: &ArticleId, entry: &HistoryEntry) -> Result<(), EditorError> {
        self.check("save_text")?;
        let mut article = self.article.lock().unwrap();
        article.set_text(&entry.block_id, entry.after.clone())?;
        Ok(())
    }

    async fn undo_text(&self, _article: &ArticleId, target: &HistoryTarget) -> Result<(), EditorError> {
        self.check("undo_text")?;
        let mut article = self.article.lock().unwrap();
        let entry_id = match target {
            HistoryTarget::Entry(id) => id.clone(),
            HistoryTarget::MostRecent => article
                .history()
                .last()
                .map(|entry| entry.id.clone())
                .ok_or_else(|| EditorError::HistoryEntryNotFound("most recent".into()))?,
        };
        article.revert_text(&entry_id)?;
        Ok(())
    }

    async fn redo_text(&self, _article: &ArticleId, target: &HistoryTarget) -> Result<(), EditorError> {
        self.check("redo_text")?;
        let mut article = self.article.lock().unwrap();
        let entry_id = match target {
            HistoryTarget::Entry(id) => id.clone(),
            HistoryTarget::MostRecent => article
                .redo_history()
                .last()
                .map(|entry| entry.id.clone())
                .ok_or_else(|| EditorError::HistoryEntryNotFound("most recent".into()))?,
        };
        article.reapply_text(&entry_id)?;
        Ok(())
    }

    async fn discard_redo_text(&self, _article: &ArticleId) -> Result<(), EditorError> {
        self.check("discard_redo_text")?;
        self.article.lock().unwrap().clear_redo_history();
        Ok(())
    }
}
