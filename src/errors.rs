//! Error types shared by the store, transport and QR clients.

use thiserror::Error;

/// Errors raised by the collaborators the job talks to.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("order store error: {0}")]
    Store(String),

    #[error("messaging transport error: {0}")]
    Transport(String),

    #[error("QR image error: {0}")]
    Qr(String),

    #[error("column layout error: {0}")]
    Layout(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type WatchResult<T> = std::result::Result<T, WatchError>;
