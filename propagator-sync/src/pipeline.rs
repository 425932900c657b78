//! Site pipeline: clone → collect → propose → parse → apply → commit → push.
//!
//! Each stage returns a `Result`; [`classify`] is the single place a stage
//! outcome becomes a [`SiteResult`]. The [`Workspace`] guard is dropped
//! before classification, so cleanup runs on every path.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use propagator_core::{RepoId, SiteDescriptor, SiteResult};
use propagator_prompt::{PromptRenderer, CONTEXT_BUDGET_CHARS};

use crate::collector::collect_sources;
use crate::error::SiteError;
use crate::git::{CommitOutcome, Vcs, COMMIT_MESSAGE};
use crate::model::ModelClient;
use crate::parser::ResponseParser;
use crate::proposer::Proposer;
use crate::runlog::RunLog;
use crate::workspace::Workspace;
use crate::writer::{apply_changes, preview_changes, WriteResult};

/// Everything a pipeline run needs. Shared read-only by all workers.
pub struct PipelineContext {
    pub vcs: Arc<dyn Vcs>,
    pub model: Arc<dyn ModelClient>,
    pub renderer: PromptRenderer,
    pub parser: ResponseParser,
    pub log: Arc<RunLog>,
    pub requirements: String,
    /// Parent directory of per-site workspaces.
    pub work_dir: PathBuf,
    pub dry_run: bool,
    pub budget: usize,
}

impl PipelineContext {
    pub fn new(
        vcs: Arc<dyn Vcs>,
        model: Arc<dyn ModelClient>,
        renderer: PromptRenderer,
        log: Arc<RunLog>,
        requirements: String,
        work_dir: PathBuf,
        dry_run: bool,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            vcs,
            model,
            renderer,
            parser: ResponseParser::new()?,
            log,
            requirements,
            work_dir,
            dry_run,
            budget: CONTEXT_BUDGET_CHARS,
        })
    }
}

/// Where a pipeline stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clone,
    Collect,
    Propose,
    Apply,
    Commit,
    Push,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Clone => "clone",
            Stage::Collect => "collect",
            Stage::Propose => "propose",
            Stage::Apply => "apply",
            Stage::Commit => "commit",
            Stage::Push => "push",
        };
        f.write_str(name)
    }
}

/// Terminal states other than error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The model proposed nothing.
    NoChanges,
    DryRun { changes: usize },
    /// Changes applied but identical to `HEAD`.
    NothingToCommit { changes: usize },
    Pushed { changes: usize },
}

#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: SiteError,
    /// Size of the parsed change set, when parsing was reached.
    pub changes: usize,
}

fn at<E: Into<SiteError>>(stage: Stage, changes: usize) -> impl FnOnce(E) -> StageFailure {
    move |error| StageFailure {
        stage,
        error: error.into(),
        changes,
    }
}

/// Map a stage outcome to the site's result.
pub fn classify(repo: &RepoId, outcome: &Result<Outcome, StageFailure>) -> SiteResult {
    let repo = repo.clone();
    match outcome {
        Ok(Outcome::NoChanges) => SiteResult::no_changes(repo, 0),
        Ok(Outcome::NothingToCommit { changes }) => SiteResult::no_changes(repo, *changes),
        Ok(Outcome::DryRun { changes }) => SiteResult::dry_run(repo, *changes),
        Ok(Outcome::Pushed { changes }) => SiteResult::success(repo, *changes),
        Err(failure) => SiteResult::error(repo, failure.changes, failure.error.to_string()),
    }
}

/// Run one site end to end. Never panics on site-level failures and never
/// returns an error: every failure is folded into the returned result.
pub fn run_site(ctx: &PipelineContext, site: &SiteDescriptor) -> SiteResult {
    let log = &ctx.log;
    let rule = "=".repeat(60);
    log.line(&rule);
    log.line(format!("Processing: {} ({})", site.display_name(), site.repo));
    log.line(&rule);

    let outcome = drive(ctx, site);
    match &outcome {
        Ok(Outcome::NoChanges) => log.line("  ⏭️  No changes needed"),
        Ok(Outcome::NothingToCommit { .. }) => {
            log.line("  ⚠️  No changes to commit (files unchanged)")
        }
        Ok(Outcome::DryRun { .. }) => {}
        Ok(Outcome::Pushed { .. }) => log.line(format!("  ✅ Successfully updated {}", site.repo)),
        Err(failure) => {
            tracing::warn!(repo = %site.repo, stage = %failure.stage, "site failed: {}", failure.error);
            let label = match failure.error {
                SiteError::Git(_) => "Git error",
                SiteError::Model(_) => "Model API error",
                _ => "Unexpected error",
            };
            log.line(format!("  ❌ {label}: {}", failure.error));
        }
    }
    classify(&site.repo, &outcome)
}

fn drive(ctx: &PipelineContext, site: &SiteDescriptor) -> Result<Outcome, StageFailure> {
    let log = &ctx.log;

    log.line("  Cloning repository...");
    let workspace = Workspace::materialize(ctx.vcs.as_ref(), &ctx.work_dir, &site.repo)
        .map_err(at(Stage::Clone, 0))?;

    log.line("  Reading site files...");
    let files = collect_sources(workspace.path()).map_err(at(Stage::Collect, 0))?;
    log.line(format!("  Found {} source files", files.len()));

    log.line("  Analyzing with the model...");
    let proposer = Proposer {
        renderer: &ctx.renderer,
        model: ctx.model.as_ref(),
        budget: ctx.budget,
    };
    let proposal = proposer
        .propose(&files, &ctx.requirements, site.display_name())
        .map_err(at(Stage::Propose, 0))?;
    if proposal.files_omitted > 0 {
        log.line(format!(
            "  Sent {} files ({} chars), {} omitted over budget",
            proposal.files_sent, proposal.chars_sent, proposal.files_omitted
        ));
    }

    let changes = ctx.parser.parse(&proposal.response);
    let count = changes.len();
    if changes.is_empty() {
        return Ok(Outcome::NoChanges);
    }
    log.line(format!("  Found {count} files to update"));

    if ctx.dry_run {
        let paths: Vec<_> = changes.paths().collect();
        log.line(format!("  🔍 DRY RUN - Would update: {paths:?}"));
        for preview in preview_changes(workspace.path(), &changes) {
            log.line(format!("    {preview}"));
        }
        return Ok(Outcome::DryRun { changes: count });
    }

    let written = apply_changes(workspace.path(), &changes).map_err(at(Stage::Apply, count))?;
    for (path, result) in &written {
        match result {
            WriteResult::Written { .. } => log.line(format!("    Updated: {path}")),
            WriteResult::Unchanged { .. } => log.line(format!("    Unchanged: {path}")),
        }
    }

    log.line("  Committing changes...");
    let committed = ctx
        .vcs
        .commit_all(workspace.path(), COMMIT_MESSAGE)
        .map_err(at(Stage::Commit, count))?;
    if committed == CommitOutcome::NothingToCommit {
        return Ok(Outcome::NothingToCommit { changes: count });
    }

    log.line("  Pushing to remote...");
    ctx.vcs
        .push(workspace.path())
        .map_err(at(Stage::Push, count))?;
    Ok(Outcome::Pushed { changes: count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GitError, ModelError};
    use propagator_core::SiteStatus;

    fn failure(error: SiteError, changes: usize) -> Result<Outcome, StageFailure> {
        Err(StageFailure {
            stage: Stage::Push,
            error,
            changes,
        })
    }

    #[test]
    fn classify_covers_every_terminal_state() {
        let repo = RepoId::from("acme/site");
        let cases = [
            (Ok(Outcome::NoChanges), SiteStatus::NoChanges, 0),
            (Ok(Outcome::NothingToCommit { changes: 2 }), SiteStatus::NoChanges, 2),
            (Ok(Outcome::DryRun { changes: 3 }), SiteStatus::DryRun, 3),
            (Ok(Outcome::Pushed { changes: 1 }), SiteStatus::Success, 1),
            (
                failure(
                    SiteError::Model(ModelError::Transport("timed out".into())),
                    0,
                ),
                SiteStatus::Error,
                0,
            ),
        ];
        for (outcome, status, changes) in cases {
            let result = classify(&repo, &outcome);
            assert_eq!(result.status, status);
            assert_eq!(result.changes, changes);
            assert_eq!(result.error.is_some(), status == SiteStatus::Error);
        }
    }

    #[test]
    fn error_detail_carries_git_stderr() {
        let repo = RepoId::from("acme/site");
        let outcome = failure(
            SiteError::Git(GitError::Failed {
                command: "git push".into(),
                code: Some(1),
                stderr: "rejected: non-fast-forward".into(),
            }),
            1,
        );
        let result = classify(&repo, &outcome);
        let detail = result.error.unwrap();
        assert!(detail.contains("git push failed"));
        assert!(detail.contains("rejected: non-fast-forward"));
        assert_eq!(result.changes, 1);
    }
}
