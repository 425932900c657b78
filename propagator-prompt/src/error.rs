//! Error types for propagator-prompt.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Building the tera context from [`crate::PromptContext`] failed.
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
