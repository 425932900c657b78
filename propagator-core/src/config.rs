//! Run configuration: environment-provided secrets plus file locations.
//!
//! [`RunConfig::resolve`] is the single gate a fleet run passes before any
//! site is touched; every failure is a [`ConfigError`].

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::registry::DEFAULT_REGISTRY_FILE;

pub const ENV_VCS_TOKEN: &str = "GH_PAT";
pub const ENV_MODEL_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_DRY_RUN: &str = "DRY_RUN";
pub const ENV_SPECIFIC_SITE: &str = "SPECIFIC_SITE";
pub const ENV_MODEL: &str = "ANTHROPIC_MODEL";
pub const ENV_MODEL_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ENV_TEMPLATE_DIR: &str = "PROPAGATOR_TEMPLATE_DIR";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_PRD_FILE: &str = "prd.md";
pub const DEFAULT_LOGS_DIR: &str = "logs";

/// Raw values read from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub vcs_token: Option<String>,
    pub model_api_key: Option<String>,
    pub dry_run: bool,
    pub specific_site: Option<String>,
    pub model: Option<String>,
    pub model_base_url: Option<String>,
    pub template_dir: Option<PathBuf>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            vcs_token: non_empty(ENV_VCS_TOKEN),
            model_api_key: non_empty(ENV_MODEL_KEY),
            dry_run: parse_dry_run(lookup(ENV_DRY_RUN).as_deref()),
            specific_site: non_empty(ENV_SPECIFIC_SITE),
            model: non_empty(ENV_MODEL),
            model_base_url: non_empty(ENV_MODEL_BASE_URL),
            template_dir: non_empty(ENV_TEMPLATE_DIR).map(PathBuf::from),
        }
    }
}

/// `"true"` (any case, surrounding whitespace ignored) enables dry-run;
/// anything else, including absence, means live mode.
pub fn parse_dry_run(value: Option<&str>) -> bool {
    value
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// File locations a run depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub prd: PathBuf,
    pub registry: PathBuf,
    pub logs_dir: PathBuf,
    /// Parent directory for per-site workspaces.
    pub work_dir: PathBuf,
}

impl Default for RunPaths {
    fn default() -> Self {
        Self {
            prd: PathBuf::from(DEFAULT_PRD_FILE),
            registry: PathBuf::from(DEFAULT_REGISTRY_FILE),
            logs_dir: PathBuf::from(DEFAULT_LOGS_DIR),
            work_dir: PathBuf::from("."),
        }
    }
}

/// Validated configuration for one fleet run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub paths: RunPaths,
    pub vcs_token: String,
    pub model_api_key: String,
    pub model: String,
    pub model_base_url: String,
    pub dry_run: bool,
    pub specific_site: Option<String>,
    pub template_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Validate inputs in a fixed order: requirements document, registry,
    /// VCS token, model credential.
    pub fn resolve(paths: RunPaths, env: EnvSettings) -> Result<Self, ConfigError> {
        if !paths.prd.is_file() {
            return Err(ConfigError::MissingRequirements { path: paths.prd });
        }
        if !paths.registry.is_file() {
            return Err(ConfigError::MissingRegistry {
                path: paths.registry,
            });
        }
        let vcs_token = env.vcs_token.ok_or(ConfigError::MissingCredential {
            var: ENV_VCS_TOKEN,
        })?;
        let model_api_key = env.model_api_key.ok_or(ConfigError::MissingCredential {
            var: ENV_MODEL_KEY,
        })?;

        Ok(Self {
            paths,
            vcs_token,
            model_api_key,
            model: env.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            model_base_url: env
                .model_base_url
                .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string()),
            dry_run: env.dry_run,
            specific_site: env.specific_site,
            template_dir: env.template_dir,
        })
    }

    /// Read the requirements document verbatim.
    pub fn read_requirements(&self) -> Result<String, ConfigError> {
        std::fs::read_to_string(&self.paths.prd).map_err(|source| ConfigError::Read {
            path: self.paths.prd.clone(),
            source,
        })
    }
}
