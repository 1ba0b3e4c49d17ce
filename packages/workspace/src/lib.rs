//! # Outline Workspace
//!
//! The authoritative side of article editing: an [`ArticleStore`] that keeps
//! every article in memory, applies persistence calls with the editor engine,
//! and writes each accepted change to `<data dir>/<id>.json`.

pub mod state;
pub mod store;

pub use state::{article_path, StoreError, WorkspaceState};
pub use store::ArticleStore;
