use outline_common::{ArticleId, ArticleRecord, CommonError};
use outline_editor::{Article, EditorError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Article not found: {0}")]
    ArticleNotFound(ArticleId),

    #[error("Article already exists: {0}")]
    ArticleExists(ArticleId),

    #[error("Rejected: {0}")]
    Rejected(#[from] EditorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad article record: {0}")]
    Record(#[from] CommonError),

    #[error("Store unavailable")]
    Unavailable,
}

impl From<StoreError> for EditorError {
    fn from(err: StoreError) -> Self {
        EditorError::PersistenceFailure(err.to_string())
    }
}

// Authoritative copy of every open article
#[derive(Debug, Default)]
pub struct WorkspaceState {
    articles: HashMap<ArticleId, Article>,
}

impl WorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ArticleId) -> Result<&Article, StoreError> {
        self.articles
            .get(id)
            .ok_or_else(|| StoreError::ArticleNotFound(id.clone()))
    }

    pub fn get_mut(&mut self, id: &ArticleId) -> Result<&mut Article, StoreError> {
        self.articles
            .get_mut(id)
            .ok_or_else(|| StoreError::ArticleNotFound(id.clone()))
    }

    pub fn contains(&self, id: &ArticleId) -> bool {
        self.articles.contains_key(id)
    }

    pub fn insert(&mut self, article: Article) {
        self.articles.insert(article.id().clone(), article);
    }

    pub fn ids(&self) -> Vec<ArticleId> {
        let mut ids: Vec<ArticleId> = self.articles.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// `<dir>/<id>.json`
pub fn article_path(dir: &Path, id: &ArticleId) -> PathBuf {
    dir.join(format!("{}.json", id))
}

pub fn parse_record(json: &str) -> Result<Article, StoreError> {
    let record = ArticleRecord::from_json(json)?;
    Ok(Article::from_record(record)?)
}

pub fn render_record(article: &Article) -> Result<String, StoreError> {
    Ok(article.to_record().to_json_pretty()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_becomes_persistence_failure() {
        let err: EditorError = StoreError::Unavailable.into();
        assert_eq!(err, EditorError::PersistenceFailure("Store unavailable".to_string()));
        assert!(!err.is_silent());
    }

    #[test]
    fn test_record_round_trip() {
        let article = Article::new(ArticleId::from("notes"), "Notes");
        let json = render_record(&article).unwrap();
        assert!(json.contains("\"updatedAt\""));

        let parsed = parse_record(&json).unwrap();
        assert_eq!(parsed.to_record(), article.to_record());
    }

    #[test]
    fn test_missing_article() {
        let state = WorkspaceState::new();
        assert!(matches!(
            state.get(&ArticleId::from("nope")),
            Err(StoreError::ArticleNotFound(_))
        ));
    }
}
