//! Propagator core library: site registry, domain types, run configuration.
//!
//! Public API surface:
//! - [`types`]: newtypes, site descriptors, per-site results
//! - [`error`]: [`RegistryError`], [`ConfigError`]
//! - [`registry`]: load / save / add / select
//! - [`config`]: environment + path resolution for a fleet run

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{EnvSettings, RunConfig, RunPaths};
pub use error::{ConfigError, RegistryError};
pub use types::{RepoId, SiteDescriptor, SiteRegistry, SiteResult, SiteStatus};
