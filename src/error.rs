//! Error types for content access
//!
//! Application code (CLI, generator) works with `anyhow::Result`; anything
//! that talks to the content API returns a [`ContentError`] so callers can
//! tell a missing document from a failure worth retrying.

use thiserror::Error;

/// Content API errors
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ContentError {
    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ContentError::Transport(_) | ContentError::MalformedResponse(_)
        )
    }
}

impl From<reqwest::Error> for ContentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ContentError::MalformedResponse(e.to_string())
        } else {
            ContentError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(e: serde_json::Error) -> Self {
        ContentError::MalformedResponse(e.to_string())
    }
}
