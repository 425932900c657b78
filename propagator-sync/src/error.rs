//! Error types for propagator-sync.
//!
//! Every failure inside one site's pipeline is a [`SiteError`]; the pipeline
//! converts it into an error `SiteResult` and never lets it reach the fleet.

use std::path::PathBuf;

use thiserror::Error;

use propagator_prompt::RenderError;

/// Failure of an external `git` invocation.
#[derive(Debug, Error)]
pub enum GitError {
    /// `git` could not be started at all.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// `git` ran and exited non-zero. `stderr` has credentials redacted.
    #[error("{command} failed ({}): {stderr}", exit_label(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Failure of the generative model call.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model API request failed: {0}")]
    Transport(String),

    #[error("model API response could not be decoded: {0}")]
    Decode(String),
}

/// Any failure that ends one site's pipeline in the `error` state.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("prompt error: {0}")]
    Render(#[from] RenderError),

    /// The model proposed a path that would land outside the workspace.
    #[error("refusing to write outside the workspace: {path}")]
    UnsafePath { path: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SiteError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SiteError {
    SiteError::Io {
        path: path.into(),
        source,
    }
}
