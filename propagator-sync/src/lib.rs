//! # propagator-sync
//!
//! The per-site pipeline: materialize a workspace, collect sources, ask the
//! model for changes, parse and apply them, then commit and push.
//!
//! Call [`run_site`] with a [`PipelineContext`]; it always returns a
//! `SiteResult`, never an error. External systems sit behind the [`Vcs`] and
//! [`ModelClient`] traits.

pub mod collector;
pub mod error;
pub mod git;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod proposer;
pub mod runlog;
pub mod workspace;
pub mod writer;

pub use collector::{collect_sources, CollectedFiles};
pub use error::{GitError, ModelError, SiteError};
pub use git::{CommitOutcome, GitCli, Vcs};
pub use model::{AnthropicClient, ModelClient};
pub use parser::{ChangeSet, ResponseParser};
pub use pipeline::{classify, run_site, Outcome, PipelineContext, Stage, StageFailure};
pub use runlog::RunLog;
pub use workspace::Workspace;
pub use writer::{apply_changes, preview_changes, WriteResult};
