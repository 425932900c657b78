use thiserror::Error;

/// Errors that end a fleet run before or instead of producing a summary.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Missing or invalid input; no site was processed.
    #[error(transparent)]
    Config(#[from] propagator_core::ConfigError),

    #[error("failed to open run log: {0}")]
    RunLog(#[source] propagator_sync::SiteError),

    #[error("prompt template error: {0}")]
    Prompt(#[from] propagator_prompt::RenderError),

    #[error("response parser error: {0}")]
    Parser(#[from] regex::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
