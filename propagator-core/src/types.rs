//! Domain types for the site registry and per-site run outcomes.
//!
//! All types are serializable/deserializable via serde + serde_json.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A repository identifier of the form `owner/name`. Unique key of a site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(pub String);

impl RepoId {
    /// Parse and validate a user-supplied identifier.
    ///
    /// Accepts exactly two non-empty, whitespace-free segments separated by `/`.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let trimmed = raw.trim();
        let invalid = || RegistryError::InvalidRepo {
            repo: raw.to_string(),
        };
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self(trimmed.to_string()))
            }
            _ => Err(invalid()),
        }
    }

    /// Last path segment (`site-a` for `acme/site-a`).
    pub fn short_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Registry structs
// ---------------------------------------------------------------------------

fn default_enabled() -> bool {
    true
}

/// One participating site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    pub repo: RepoId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SiteDescriptor {
    pub fn new(repo: RepoId, name: Option<String>) -> Self {
        Self {
            repo,
            name,
            enabled: true,
        }
    }

    /// Display name, falling back to the repository's last path segment.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.repo.short_name(),
        }
    }
}

/// Root of the `sites.json` registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SiteRegistry {
    #[serde(default)]
    pub sites: Vec<SiteDescriptor>,
}

impl SiteRegistry {
    /// Enabled sites, in registry order.
    pub fn enabled(&self) -> impl Iterator<Item = &SiteDescriptor> {
        self.sites.iter().filter(|s| s.enabled)
    }

    pub fn contains(&self, repo: &RepoId) -> bool {
        self.sites.iter().any(|s| &s.repo == repo)
    }

    /// `(enabled, disabled)` tally.
    pub fn counts(&self) -> (usize, usize) {
        let enabled = self.enabled().count();
        (enabled, self.sites.len() - enabled)
    }
}

// ---------------------------------------------------------------------------
// Run outcomes
// ---------------------------------------------------------------------------

/// Terminal disposition of one site in one fleet run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Success,
    NoChanges,
    DryRun,
    Error,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteStatus::Success => write!(f, "success"),
            SiteStatus::NoChanges => write!(f, "no_changes"),
            SiteStatus::DryRun => write!(f, "dry_run"),
            SiteStatus::Error => write!(f, "error"),
        }
    }
}

/// Outcome of one site pipeline. Built only through the constructors below,
/// which keep `status`, `changes` and `error` consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteResult {
    pub repo: RepoId,
    pub status: SiteStatus,
    pub changes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SiteResult {
    /// Changes were committed and pushed. `changes` is clamped to at least 1.
    pub fn success(repo: RepoId, changes: usize) -> Self {
        Self {
            repo,
            status: SiteStatus::Success,
            changes: changes.max(1),
            error: None,
        }
    }

    pub fn no_changes(repo: RepoId, changes: usize) -> Self {
        Self {
            repo,
            status: SiteStatus::NoChanges,
            changes,
            error: None,
        }
    }

    pub fn dry_run(repo: RepoId, changes: usize) -> Self {
        Self {
            repo,
            status: SiteStatus::DryRun,
            changes,
            error: None,
        }
    }

    /// An empty detail is replaced so an error result always explains itself.
    pub fn error(repo: RepoId, changes: usize, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let detail = if detail.trim().is_empty() {
            "unknown error".to_string()
        } else {
            detail
        };
        Self {
            repo,
            status: SiteStatus::Error,
            changes,
            error: Some(detail),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == SiteStatus::Error
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
