//! `propagator update`: one fleet run.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use propagator_core::{EnvSettings, RunPaths};
use propagator_runner::{init_tracing, run_update, FleetSummary};

/// Arguments for `propagator update`.
#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// Log intended changes without writing, committing or pushing.
    /// Also enabled by `DRY_RUN=true`.
    #[arg(long)]
    pub dry_run: bool,

    /// Only process this repository (`owner/name`). Overrides `SPECIFIC_SITE`.
    #[arg(long, value_name = "REPO")]
    pub site: Option<String>,

    /// Requirements document.
    #[arg(long, value_name = "PATH")]
    pub prd: Option<PathBuf>,

    /// Site registry file.
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Directory for run log files.
    #[arg(long, value_name = "DIR")]
    pub logs_dir: Option<PathBuf>,

    /// Directory under which per-site clones are created.
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Print the fleet summary as JSON on stdout when the run finishes.
    #[arg(long)]
    pub json: bool,
}

impl UpdateArgs {
    pub fn run(self) -> Result<ExitCode> {
        init_tracing();
        let (paths, env) = self.resolve(EnvSettings::from_env());
        let json = self.json;

        let summary = run_update(paths, env).context("update aborted")?;
        if json {
            print_json(&summary)?;
        }
        Ok(ExitCode::from(summary.exit_code()))
    }

    /// Apply flag overrides on top of the environment and default paths.
    fn resolve(&self, mut env: EnvSettings) -> (RunPaths, EnvSettings) {
        env.dry_run |= self.dry_run;
        if let Some(site) = self.site.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            env.specific_site = Some(site.to_string());
        }

        let mut paths = RunPaths::default();
        if let Some(prd) = &self.prd {
            paths.prd = prd.clone();
        }
        if let Some(registry) = &self.registry {
            paths.registry = registry.clone();
        }
        if let Some(logs_dir) = &self.logs_dir {
            paths.logs_dir = logs_dir.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            paths.work_dir = work_dir.clone();
        }
        (paths, env)
    }
}

fn print_json(summary: &FleetSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("failed to serialize summary")?;
    println!("{json}");
    Ok(())
}
