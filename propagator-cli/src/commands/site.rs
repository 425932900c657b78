//! `propagator site add <repo> [name]` and `propagator site list`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use propagator_core::{
    registry::{self, DEFAULT_REGISTRY_FILE},
    RegistryError, RepoId, SiteDescriptor,
};

const NAME_WIDTH: usize = 28;

/// Manage the site registry.
#[derive(Subcommand, Debug)]
pub enum SiteCommand {
    /// Register a new site (enabled by default).
    Add(AddArgs),

    /// List every registered site.
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Repository identifier, e.g. "acme/marketing-site".
    pub repo: String,

    /// Display name. Defaults to the repository name.
    pub name: Option<String>,

    #[arg(long, value_name = "PATH", default_value = DEFAULT_REGISTRY_FILE)]
    pub registry: PathBuf,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, value_name = "PATH", default_value = DEFAULT_REGISTRY_FILE)]
    pub registry: PathBuf,
}

pub fn run(cmd: SiteCommand) -> Result<()> {
    match cmd {
        SiteCommand::Add(args) => add(args),
        SiteCommand::List(args) => list(&args.registry),
    }
}

fn add(args: AddArgs) -> Result<()> {
    let repo = RepoId::parse(&args.repo)?;
    let (site, total) = registry::add_site_at(&args.registry, repo, args.name)
        .with_context(|| format!("failed to add site to {}", args.registry.display()))?;

    println!("✓ Added site: {} ({})", site.display_name(), site.repo);
    println!("  Total sites: {total}");
    Ok(())
}

fn list(path: &Path) -> Result<()> {
    let registry = match registry::load_at(path) {
        Ok(registry) => registry,
        Err(RegistryError::RegistryNotFound { .. }) => {
            println!("No site registry at {}.", path.display());
            println!("Run: propagator site add <owner/name> [name]");
            return Ok(());
        }
        Err(err) => {
            return Err(anyhow::Error::new(err).context(format!("failed to read {}", path.display())))
        }
    };

    println!("{} sites registered", registry.sites.len());
    if !registry.sites.is_empty() {
        let mut table = Table::new(table_rows(&registry.sites));
        table.with(Style::rounded());
        println!("{table}");
    }

    let (enabled, disabled) = registry.counts();
    println!(
        "{} enabled, {} disabled",
        enabled.to_string().green(),
        disabled.to_string().yellow()
    );
    Ok(())
}

#[derive(Tabled, Debug, PartialEq, Eq)]
struct SiteRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "repo")]
    repo: String,
}

fn table_rows(sites: &[SiteDescriptor]) -> Vec<SiteRow> {
    sites
        .iter()
        .enumerate()
        .map(|(i, site)| SiteRow {
            index: i + 1,
            status: status_label(site.enabled),
            name: truncate(site.display_name(), NAME_WIDTH),
            repo: site.repo.to_string(),
        })
        .collect()
}

fn status_label(enabled: bool) -> String {
    if enabled {
        "enabled".green().to_string()
    } else {
        "disabled".yellow().to_string()
    }
}

/// First `max` characters of `s`.
fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
