use thiserror::Error;

/// Common error type shared by the outline crates
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
