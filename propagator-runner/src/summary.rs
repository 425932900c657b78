//! Fleet-level aggregation of per-site results.

use serde::Serialize;

use propagator_core::{SiteResult, SiteStatus};
use propagator_sync::RunLog;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    /// Per-site results in completion order.
    pub results: Vec<SiteResult>,
    pub success: usize,
    pub no_changes: usize,
    pub dry_run: usize,
    pub errors: usize,
}

impl FleetSummary {
    pub fn from_results(results: Vec<SiteResult>) -> Self {
        let mut summary = FleetSummary::default();
        for result in &results {
            match result.status {
                SiteStatus::Success => summary.success += 1,
                SiteStatus::NoChanges => summary.no_changes += 1,
                SiteStatus::DryRun => summary.dry_run += 1,
                SiteStatus::Error => summary.errors += 1,
            }
        }
        summary.results = results;
        summary
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> impl Iterator<Item = &SiteResult> {
        self.results.iter().filter(|r| r.is_error())
    }

    /// 1 iff any site ended in error.
    pub fn exit_code(&self) -> u8 {
        u8::from(self.errors > 0)
    }

    pub fn log_to(&self, log: &RunLog) {
        let rule = "=".repeat(60);
        log.line(&rule);
        log.line("📊 SUMMARY");
        log.line(&rule);
        log.line(format!("  ✅ Success: {}", self.success));
        log.line(format!("  ⏭️  No changes needed: {}", self.no_changes));
        log.line(format!("  🔍 Dry run: {}", self.dry_run));
        log.line(format!("  ❌ Errors: {}", self.errors));

        if self.errors > 0 {
            log.line("Failed sites:");
            for r in self.failed() {
                let detail = r.error.as_deref().unwrap_or("unknown error");
                log.line(format!("  - {}: {detail}", r.repo));
            }
        }
        log.line("✨ Propagation complete!");
    }
}
