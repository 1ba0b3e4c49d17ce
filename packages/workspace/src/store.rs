//! Authoritative article store.
//!
//! Holds one [`Article`] per id behind a `tokio::sync::RwLock` and runs every
//! persistence call through the same engine the editor uses. With a data
//! directory, each accepted mutation is written to `<id>.json` before the
//! call returns; a failed write undoes the in-memory change.

use crate::state::{article_path, parse_record, render_record, StoreError, WorkspaceState};
use outline_common::{ArticleId, ArticleRecord, BlockId, BlockSnapshot, HistoryEntry};
use outline_editor::{
    Article, Direction, EditorError, HistoryTarget, Persisted, Persistence, Relocation, StructuralAction,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

pub struct ArticleStore {
    state: RwLock<WorkspaceState>,
    data_dir: Option<PathBuf>,
    available: AtomicBool,
}

impl ArticleStore {
    /// A store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(WorkspaceState::new()),
            data_dir: None,
            available: AtomicBool::new(true),
        }
    }

    /// Open (creating if needed) a directory of `<id>.json` articles
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let mut state = WorkspaceState::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let json = tokio::fs::read_to_string(&path).await?;
            match parse_record(&json) {
                Ok(article) => state.insert(article),
                Err(e) => tracing::warn!("Skipping unreadable article {}: {}", path.display(), e),
            }
        }
        tracing::info!("Loaded {} articles from {}", state.len(), dir.display());

        Ok(Self {
            state: RwLock::new(state),
            data_dir: Some(dir),
            available: AtomicBool::new(true),
        })
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Create and save a new article holding one empty block
    pub async fn create_article(&self, id: ArticleId, title: &str) -> Result<Article, StoreError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        if state.contains(&id) {
            return Err(StoreError::ArticleExists(id));
        }

        let article = Article::new(id, title);
        self.save(&article).await?;
        state.insert(article.clone());
        tracing::info!("Created article {}", article.id());
        Ok(article)
    }

    /// A copy of the authoritative article, for opening a session
    pub async fn article(&self, id: &ArticleId) -> Result<Article, StoreError> {
        self.ensure_available()?;
        Ok(self.state.read().await.get(id)?.clone())
    }

    pub async fn record(&self, id: &ArticleId) -> Result<ArticleRecord, StoreError> {
        Ok(self.article(id).await?.to_record())
    }

    pub async fn article_ids(&self) -> Vec<ArticleId> {
        self.state.read().await.ids()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    async fn save(&self, article: &Article) -> Result<(), StoreError> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        let path = article_path(dir, article.id());
        tokio::fs::write(&path, render_record(article)?).await?;
        tracing::debug!("Saved {}", path.display());
        Ok(())
    }

    /// Run `f` against the stored article, keeping the change only if it saves
    async fn mutate<T>(
        &self,
        id: &ArticleId,
        f: impl FnOnce(&mut Article) -> Result<T, EditorError>,
    ) -> Result<T, StoreError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let article = state.get_mut(id)?;

        let (result, checkpoint) = article.checkpointed(f);
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                article.rollback(checkpoint);
                tracing::debug!("Rejected change to {}: {}", id, e);
                return Err(e.into());
            }
        };

        if let Err(e) = self.save(article).await {
            tracing::warn!("Failed to save {}, reverting: {}", id, e);
            article.rollback(checkpoint);
            return Err(e);
        }
        Ok(value)
    }

    async fn apply(&self, id: &ArticleId, action: StructuralAction) -> Result<Persisted, EditorError> {
        let persisted = self
            .mutate(id, |article| {
                let block_id = action
                    .subject()
                    .cloned()
                    .ok_or_else(|| EditorError::PersistenceFailure("action has no subject".to_string()))?;
                article.apply(&action)?;
                position(article, &block_id)
            })
            .await?;
        Ok(persisted)
    }
}

fn position(article: &Article, block_id: &BlockId) -> Result<Persisted, EditorError> {
    let loc = article
        .find_block(block_id)
        .ok_or_else(|| EditorError::NotFound(block_id.clone()))?;
    Ok(Persisted {
        parent_id: loc.parent,
        index: loc.index,
    })
}

fn resolve_entry(entries: &[HistoryEntry], target: &HistoryTarget) -> Result<String, EditorError> {
    match target {
        HistoryTarget::Entry(id) => Ok(id.clone()),
        HistoryTarget::MostRecent => entries
            .last()
            .map(|entry| entry.id.clone())
            .ok_or_else(|| EditorError::HistoryEntryNotFound("most recent".to_string())),
    }
}

impl Persistence for ArticleStore {
    async fn insert_sibling(
        &self,
        article: &ArticleId,
        after: Option<&BlockId>,
        block: &BlockSnapshot,
    ) -> Result<Persisted, EditorError> {
        self.apply(
            article,
            StructuralAction::create(block.id.clone(), after.cloned(), block.text.clone()),
        )
        .await
    }

    async fn delete_block(&self, article: &ArticleId, block_id: &BlockId) -> Result<Persisted, EditorError> {
        let persisted = self
            .mutate(article, |article| {
                let before = position(article, block_id)?;
                article.apply(&StructuralAction::delete(block_id.clone()))?;
                Ok(before)
            })
            .await?;
        Ok(persisted)
    }

    async fn move_block(
        &self,
        article: &ArticleId,
        block_id: &BlockId,
        direction: Direction,
    ) -> Result<Persisted, EditorError> {
        self.apply(article, StructuralAction::move_block(block_id.clone(), direction))
            .await
    }

    async fn indent_block(
        &self,
        article: &ArticleId,
        block_id: &BlockId,
        release_trailing: usize,
    ) -> Result<Persisted, EditorError> {
        self.apply(
            article,
            StructuralAction::Indent {
                block_id: block_id.clone(),
                release_trailing,
            },
        )
        .await
    }

    async fn outdent_block(&self, article: &ArticleId, block_id: &BlockId) -> Result<Persisted, EditorError> {
        self.apply(article, StructuralAction::outdent(block_id.clone()))
            .await
    }

    async fn relocate_block(
        &self,
        article: &ArticleId,
        block_id: &BlockId,
        relocation: &Relocation,
    ) -> Result<Persisted, EditorError> {
        self.apply(
            article,
            StructuralAction::reorder(block_id.clone(), relocation.parent_id.clone(), relocation.index),
        )
        .await
    }

    async fn restore_block(
        &self,
        article: &ArticleId,
        snapshot: &BlockSnapshot,
        parent_id: Option<&BlockId>,
        index: usize,
    ) -> Result<Persisted, EditorError> {
        self.apply(
            article,
            StructuralAction::Restore {
                snapshot: snapshot.clone(),
                parent_id: parent_id.cloned(),
                index,
            },
        )
        .await
    }

    async fn save_text(&self, article: &ArticleId, entry: &HistoryEntry) -> Result<(), EditorError> {
        self.mutate(article, |article| article.apply_history_entry(entry.clone()))
        .await?;
        Ok(())
    }

    async fn undo_text(&self, article: &ArticleId, target: &HistoryTarget) -> Result<(), EditorError> {
        self.mutate(article, |article| {
            let entry_id = resolve_entry(article.history(), target)?;
            article.revert_text(&entry_id)?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn redo_text(&self, article: &ArticleId, target: &HistoryTarget) -> Result<(), EditorError> {
        self.mutate(article, |article| {
            let entry_id = resolve_entry(article.redo_history(), target)?;
            article.reapply_text(&entry_id)?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn discard_redo_text(&self, article: &ArticleId) -> Result<(), EditorError> {
        let dropped = self.mutate(article, |article| Ok(article.clear_redo_history())).await?;
        tracing::debug!("Discarded {} redo entries from {}", dropped, article);
        Ok(())
    }
}
