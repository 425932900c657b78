//! Disposable per-site checkout.
//!
//! A [`Workspace`] owns its directory: the directory is removed when the
//! value is dropped, on every exit path of the pipeline. Removal is
//! best-effort and a failure is only logged.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use propagator_core::RepoId;

use crate::error::{io_err, SiteError};
use crate::git::Vcs;

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Directory name for `repo`: `temp_<owner>_<name>-<hash8>`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` become `_`; the hash suffix keeps
    /// ids that sanitize to the same text apart.
    pub fn dir_name(repo: &RepoId) -> String {
        let sanitized: String = repo
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let digest = hex::encode(Sha256::digest(repo.as_str().as_bytes()));
        format!("temp_{sanitized}-{}", &digest[..8])
    }

    /// Clear any stale directory for `repo` under `work_dir`, then clone into it.
    ///
    /// The guard exists before the clone starts, so a partial clone is
    /// removed as well.
    pub fn materialize(vcs: &dyn Vcs, work_dir: &Path, repo: &RepoId) -> Result<Self, SiteError> {
        let root = work_dir.join(Self::dir_name(repo));
        if root.exists() {
            tracing::debug!("removing stale workspace {}", root.display());
            std::fs::remove_dir_all(&root).map_err(|e| io_err(&root, e))?;
        }
        std::fs::create_dir_all(work_dir).map_err(|e| io_err(work_dir, e))?;

        let workspace = Workspace { root };
        vcs.clone_shallow(repo, &workspace.root)?;
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.root.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            tracing::warn!("failed to remove workspace {}: {e}", self.root.display());
        }
    }
}
