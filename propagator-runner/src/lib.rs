//! Fleet coordinator: runs the site pipeline over every selected site on a
//! bounded worker pool and aggregates the outcomes.

mod error;
pub mod paths;
mod runtime;
pub mod summary;

pub use error::RunnerError;
pub use runtime::{run_fleet, run_fleet_blocking, run_update, run_with, MAX_WORKERS};
pub use summary::FleetSummary;

/// Install the stderr `tracing` subscriber (`RUST_LOG`, default `warn`).
pub fn init_tracing() {
    runtime::init_tracing();
}
