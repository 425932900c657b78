//! Error types for propagator-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure, annotated with the file involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (write/save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parse error on load, with the file path and serde_json's line context.
    #[error("failed to parse registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The registry file did not exist at the expected path.
    #[error("registry not found at {path}")]
    RegistryNotFound { path: PathBuf },

    /// `add` was asked to register a repository that is already present.
    #[error("site '{repo}' already exists in the registry")]
    DuplicateSite { repo: String },

    /// Repository identifier is not of the form `owner/name`.
    #[error("invalid repository '{repo}': expected owner/name")]
    InvalidRepo { repo: String },
}

/// Fatal configuration problems. Any of these aborts a run before a single
/// site is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("requirements document not found at {path}")]
    MissingRequirements { path: PathBuf },

    #[error("site registry not found at {path}")]
    MissingRegistry { path: PathBuf },

    #[error("{var} environment variable not set")]
    MissingCredential { var: &'static str },

    #[error("site '{repo}' not found among enabled sites in the registry")]
    UnknownSite { repo: String },

    #[error("site '{repo}' is listed more than once in the registry")]
    DuplicateSite { repo: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}
