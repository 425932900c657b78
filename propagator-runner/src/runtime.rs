use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use propagator_core::{
    registry, ConfigError, EnvSettings, RepoId, RunConfig, RunPaths, SiteDescriptor, SiteResult,
};
use propagator_prompt::PromptRenderer;
use propagator_sync::{run_site, AnthropicClient, GitCli, ModelClient, PipelineContext, RunLog, Vcs};

use crate::error::RunnerError;
use crate::paths::log_file_path;
use crate::summary::FleetSummary;

/// Concurrent site pipelines per fleet run.
pub const MAX_WORKERS: usize = 3;

/// Run a full fleet update with the real git and model clients.
///
/// Opens the run log first so configuration failures are recorded too.
pub fn run_update(paths: RunPaths, env: EnvSettings) -> Result<FleetSummary, RunnerError> {
    let log_path = log_file_path(&paths.logs_dir, &Local::now());
    let log = Arc::new(RunLog::create(&log_path).map_err(RunnerError::RunLog)?);
    log.line("🚀 PRD Propagator Starting");

    let config = match RunConfig::resolve(paths, env) {
        Ok(config) => config,
        Err(err) => {
            log.line(format!("❌ Error: {err}"));
            return Err(err.into());
        }
    };

    let vcs: Arc<dyn Vcs> = Arc::new(GitCli::new(config.vcs_token.clone()));
    let model: Arc<dyn ModelClient> = Arc::new(AnthropicClient::new(
        config.model_api_key.clone(),
        config.model.clone(),
        config.model_base_url.clone(),
    ));
    run_with(&config, log, vcs, model)
}

/// Run a fleet update against explicit collaborators.
pub fn run_with(
    config: &RunConfig,
    log: Arc<RunLog>,
    vcs: Arc<dyn Vcs>,
    model: Arc<dyn ModelClient>,
) -> Result<FleetSummary, RunnerError> {
    let (sites, requirements) = match load_inputs(config) {
        Ok(inputs) => inputs,
        Err(err) => {
            log.line(format!("❌ Error: {err}"));
            return Err(err.into());
        }
    };

    log.line(format!("📋 PRD loaded ({} chars)", requirements.chars().count()));
    log.line(format!("🌐 {} sites to update", sites.len()));
    if config.dry_run {
        log.line("🔍 DRY RUN MODE - No changes will be pushed");
    }

    let renderer = PromptRenderer::new(config.template_dir.as_deref())?;
    let ctx = Arc::new(PipelineContext::new(
        vcs,
        model,
        renderer,
        log.clone(),
        requirements,
        config.paths.work_dir.clone(),
        config.dry_run,
    )?);

    let results = run_fleet_blocking(ctx, sites)?;
    let summary = FleetSummary::from_results(results);
    summary.log_to(&log);
    Ok(summary)
}

fn load_inputs(config: &RunConfig) -> Result<(Vec<SiteDescriptor>, String), ConfigError> {
    let registry = registry::load_at(&config.paths.registry)?;
    let sites = registry::select_sites(&registry, config.specific_site.as_deref())?;
    let requirements = config.read_requirements()?;
    Ok((sites, requirements))
}

/// Build a multi-thread runtime and drive [`run_fleet`] to completion.
pub fn run_fleet_blocking(
    ctx: Arc<PipelineContext>,
    sites: Vec<SiteDescriptor>,
) -> Result<Vec<SiteResult>, RunnerError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(RunnerError::Runtime)?;
    Ok(runtime.block_on(run_fleet(ctx, sites, MAX_WORKERS)))
}

/// Run every site's pipeline with at most `workers` in flight.
///
/// Results are returned in completion order, one per submitted site. A
/// pipeline that panics yields an error result for its site only. A repo
/// submitted twice runs once; the repeat gets an error result.
pub async fn run_fleet(
    ctx: Arc<PipelineContext>,
    sites: Vec<SiteDescriptor>,
    workers: usize,
) -> Vec<SiteResult> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut pending: Vec<RepoId> = sites.iter().map(|s| s.repo.clone()).collect();
    let mut set = JoinSet::new();

    let mut seen = HashSet::new();
    let mut results = Vec::with_capacity(pending.len());

    for site in sites {
        if !seen.insert(site.repo.clone()) {
            tracing::warn!(repo = %site.repo, "duplicate site skipped");
            if let Some(idx) = pending.iter().rposition(|r| r == &site.repo) {
                pending.swap_remove(idx);
            }
            results.push(SiteResult::error(
                site.repo,
                0,
                "duplicate site in fleet; already being processed",
            ));
            continue;
        }
        let permits = permits.clone();
        let ctx = ctx.clone();
        set.spawn(async move {
            let repo = site.repo.clone();
            let Ok(_permit) = permits.acquire_owned().await else {
                return SiteResult::error(repo, 0, "worker pool closed");
            };
            tracing::debug!(repo = %repo, "site pipeline started");
            match tokio::task::spawn_blocking(move || run_site(&ctx, &site)).await {
                Ok(result) => result,
                Err(err) => panicked(repo, err),
            }
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) => {
                if let Some(idx) = pending.iter().position(|r| r == &result.repo) {
                    pending.swap_remove(idx);
                }
                tracing::debug!(repo = %result.repo, status = %result.status, "site pipeline finished");
                results.push(result);
            }
            Err(err) => tracing::error!("fleet worker failed: {err}"),
        }
    }
    // A worker that died outside the pipeline still owes its site a result.
    for repo in pending {
        results.push(SiteResult::error(repo, 0, "worker task failed"));
    }
    results
}

fn panicked(repo: RepoId, err: JoinError) -> SiteResult {
    let detail = match err.try_into_panic() {
        Ok(payload) => format!("pipeline panicked: {}", panic_message(payload.as_ref())),
        Err(err) => format!("pipeline task failed: {err}"),
    };
    tracing::error!(repo = %repo, "{detail}");
    SiteResult::error(repo, 0, detail)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

pub(crate) fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
