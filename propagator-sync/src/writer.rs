//! Change applier.
//!
//! ## `atomic_write` protocol
//!
//! 1. Reject paths that could escape the workspace.
//! 2. SHA-256 the new content and the current file; skip if identical.
//! 3. Write the content verbatim to `<path>.propagator.tmp`.
//! 4. Rename to the final path.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use similar::{ChangeTag, TextDiff};

use crate::error::{io_err, SiteError};
use crate::parser::ChangeSet;

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was created or its content replaced.
    Written { path: PathBuf },
    /// New content is byte-identical to what is on disk.
    Unchanged { path: PathBuf },
}

/// Resolve a model-proposed relative path under `root`.
pub fn resolve_in_workspace(root: &Path, rel: &str) -> Result<PathBuf, SiteError> {
    let unsafe_path = || SiteError::UnsafePath {
        path: rel.to_string(),
    };
    let candidate = Path::new(rel);
    let mut resolved = root.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path())
            }
        }
    }
    if resolved == root {
        return Err(unsafe_path());
    }
    Ok(resolved)
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<WriteResult, SiteError> {
    match std::fs::read(path) {
        Ok(existing) if sha256_hex(&existing) == sha256_hex(content.as_bytes()) => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp = PathBuf::from(format!("{}.propagator.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// Write every entry of `changes` under `root`, in path order.
///
/// The first failure aborts the remaining writes; files already written stay.
pub fn apply_changes(
    root: &Path,
    changes: &ChangeSet,
) -> Result<Vec<(String, WriteResult)>, SiteError> {
    let mut results = Vec::with_capacity(changes.len());
    for (rel, content) in changes.iter() {
        let path = resolve_in_workspace(root, rel)?;
        results.push((rel.to_string(), atomic_write(&path, content)?));
    }
    Ok(results)
}

// ---------------------------------------------------------------------------
// Dry-run preview
// ---------------------------------------------------------------------------

/// What applying one change would do, without touching the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewKind {
    New,
    Modified { added: usize, removed: usize },
    Unchanged,
    /// Rejected by [`resolve_in_workspace`].
    Unsafe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    pub path: String,
    pub kind: PreviewKind,
}

impl std::fmt::Display for FilePreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            PreviewKind::New => write!(f, "{} (new)", self.path),
            PreviewKind::Modified { added, removed } => {
                write!(f, "{} (+{added}/-{removed})", self.path)
            }
            PreviewKind::Unchanged => write!(f, "{} (unchanged)", self.path),
            PreviewKind::Unsafe => write!(f, "{} (rejected: outside workspace)", self.path),
        }
    }
}

/// Line-level summary of each change against the current workspace content.
pub fn preview_changes(root: &Path, changes: &ChangeSet) -> Vec<FilePreview> {
    changes
        .iter()
        .map(|(rel, content)| FilePreview {
            path: rel.to_string(),
            kind: preview_one(root, rel, content),
        })
        .collect()
}

fn preview_one(root: &Path, rel: &str, content: &str) -> PreviewKind {
    let Ok(path) = resolve_in_workspace(root, rel) else {
        return PreviewKind::Unsafe;
    };
    let Ok(existing) = std::fs::read_to_string(&path) else {
        return PreviewKind::New;
    };
    if existing == content {
        return PreviewKind::Unchanged;
    }

    let diff = TextDiff::from_lines(existing.as_str(), content);
    let (mut added, mut removed) = (0, 0);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }
    PreviewKind::Modified { added, removed }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
