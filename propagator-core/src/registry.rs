//! JSON site registry.
//!
//! # Storage layout
//!
//! ```text
//! sites.json
//! {
//!   "sites": [
//!     { "repo": "owner/name", "name": "Display Name", "enabled": true }
//!   ]
//! }
//! ```
//!
//! Every function takes the registry path explicitly; tests point it at a
//! `TempDir`, the CLI defaults it to [`DEFAULT_REGISTRY_FILE`] in the working
//! directory.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{io_err, ConfigError, RegistryError};
use crate::types::{RepoId, SiteDescriptor, SiteRegistry};

/// Registry file name used when no path is given.
pub const DEFAULT_REGISTRY_FILE: &str = "sites.json";

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// Load the registry at `path`.
///
/// Returns `RegistryError::RegistryNotFound` if absent,
/// `RegistryError::Parse` (with path + line context) if malformed JSON.
pub fn load_at(path: &Path) -> Result<SiteRegistry, RegistryError> {
    if !path.exists() {
        return Err(RegistryError::RegistryNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents).map_err(|e| RegistryError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Like [`load_at`], but a missing file yields an empty registry.
pub fn load_or_default_at(path: &Path) -> Result<SiteRegistry, RegistryError> {
    if !path.exists() {
        return Ok(SiteRegistry::default());
    }
    load_at(path)
}

// ---------------------------------------------------------------------------
// 2. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the registry to `path` as 2-space indented JSON.
///
/// Write flow: serialize → `<file>.tmp` sibling → `rename`.
/// The `.tmp` file sits next to the target so the rename never crosses filesystems.
pub fn save_at(path: &Path, registry: &SiteRegistry) -> Result<(), RegistryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_REGISTRY_FILE.to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    let mut json = serde_json::to_string_pretty(registry)?;
    json.push('\n');
    std::fs::write(&tmp_path, json).map_err(|e| io_err(&tmp_path, e))?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Add
// ---------------------------------------------------------------------------

/// Register a new enabled site.
///
/// Creates the registry file if it does not exist. A `repo` already present
/// yields `RegistryError::DuplicateSite` and leaves the file untouched.
/// Returns the stored descriptor and the new total number of sites.
pub fn add_site_at(
    path: &Path,
    repo: RepoId,
    name: Option<String>,
) -> Result<(SiteDescriptor, usize), RegistryError> {
    let mut registry = load_or_default_at(path)?;
    if registry.contains(&repo) {
        return Err(RegistryError::DuplicateSite { repo: repo.0 });
    }

    let name = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| repo.short_name().to_string());
    let site = SiteDescriptor::new(repo, Some(name));
    registry.sites.push(site.clone());
    save_at(path, &registry)?;
    Ok((site, registry.sites.len()))
}

// ---------------------------------------------------------------------------
// 4. Select
// ---------------------------------------------------------------------------

/// Sites a fleet run should process: every enabled site in registry order,
/// or only the enabled site whose repo equals `filter` exactly.
///
/// A repo listed more than once (possible only in a hand-edited file) is
/// rejected, since two pipelines for one repo would share a workspace.
pub fn select_sites(
    registry: &SiteRegistry,
    filter: Option<&str>,
) -> Result<Vec<SiteDescriptor>, ConfigError> {
    let mut seen = HashSet::new();
    if let Some(dup) = registry.sites.iter().find(|s| !seen.insert(&s.repo)) {
        return Err(ConfigError::DuplicateSite {
            repo: dup.repo.to_string(),
        });
    }

    let enabled = registry.enabled().cloned();
    match filter {
        None => Ok(enabled.collect()),
        Some(repo) => {
            let selected: Vec<_> = enabled.filter(|s| s.repo.as_str() == repo).collect();
            if selected.is_empty() {
                return Err(ConfigError::UnknownSite {
                    repo: repo.to_string(),
                });
            }
            Ok(selected)
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
