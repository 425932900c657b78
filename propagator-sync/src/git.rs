//! Version-control boundary: shallow clone, commit, push.
//!
//! The pipeline only sees the [`Vcs`] trait. [`GitCli`] drives the `git`
//! binary; tests substitute an in-process fake.

use std::path::Path;
use std::process::Command;

use propagator_core::RepoId;

use crate::error::GitError;

pub const COMMIT_AUTHOR_NAME: &str = "PRD Propagator";
pub const COMMIT_AUTHOR_EMAIL: &str = "prd-propagator@automated.bot";
pub const COMMIT_MESSAGE: &str = "chore: sync with PRD update\n\nAutomated update from PRD propagator";

/// Result of staging and committing a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Staging found no difference from `HEAD`.
    NothingToCommit,
}

pub trait Vcs: Send + Sync {
    /// Shallow-clone `repo` into `dest` (which must not exist).
    fn clone_shallow(&self, repo: &RepoId, dest: &Path) -> Result<(), GitError>;

    /// Stage every change in `workdir` and commit it under the automated identity.
    fn commit_all(&self, workdir: &Path, message: &str) -> Result<CommitOutcome, GitError>;

    /// Push the current branch to its remote.
    fn push(&self, workdir: &Path) -> Result<(), GitError>;
}

/// [`Vcs`] over the system `git` binary, authenticating with an access token
/// embedded in the HTTPS remote URL.
pub struct GitCli {
    token: String,
    host: String,
}

impl GitCli {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            host: "github.com".to_string(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    fn remote_url(&self, repo: &RepoId) -> String {
        format!("https://x-access-token:{}@{}/{}.git", self.token, self.host, repo)
    }

    /// Replace every occurrence of the token so it never reaches a log or result.
    fn redact(&self, text: &str) -> String {
        if self.token.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.token, "***")
        }
    }

    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<String, GitError> {
        let label = self.redact(&format!("git {}", args.first().copied().unwrap_or_default()));
        let mut cmd = Command::new("git");
        cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        tracing::debug!("running {label}");
        let output = cmd.output().map_err(|source| GitError::Spawn {
            command: label.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::Failed {
                command: label,
                code: output.status.code(),
                stderr: self.redact(stderr.trim()),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Vcs for GitCli {
    fn clone_shallow(&self, repo: &RepoId, dest: &Path) -> Result<(), GitError> {
        let url = self.remote_url(repo);
        let dest = dest.to_string_lossy();
        self.run(None, &["clone", "--depth", "1", &url, &dest])?;
        Ok(())
    }

    fn commit_all(&self, workdir: &Path, message: &str) -> Result<CommitOutcome, GitError> {
        let dir = Some(workdir);
        self.run(dir, &["config", "user.email", COMMIT_AUTHOR_EMAIL])?;
        self.run(dir, &["config", "user.name", COMMIT_AUTHOR_NAME])?;
        self.run(dir, &["add", "-A"])?;

        if self.run(dir, &["status", "--porcelain"])?.trim().is_empty() {
            return Ok(CommitOutcome::NothingToCommit);
        }
        self.run(dir, &["commit", "-m", message])?;
        Ok(CommitOutcome::Committed)
    }

    fn push(&self, workdir: &Path) -> Result<(), GitError> {
        self.run(Some(workdir), &["push"])?;
        Ok(())
    }
}
