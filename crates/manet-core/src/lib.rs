#![warn(unreachable_pub, missing_debug_implementations)]

//! The core dataset generator. This crate defines [the batch routine](batch::run_batch) that
//! turns a set of node-count tiers into a labeled dataset of MANET simulation runs, and the
//! [capability set](engine::SimEngine) a simulation engine must provide to back it.

#[macro_use]
mod ident;

pub mod batch;
pub mod classify;
pub mod constants;
pub mod dataset;
pub mod engine;
pub mod metrics;
pub mod run;
pub mod scenario;
pub mod simulate;
pub mod testing;
pub mod units;

pub use batch::{run_batch, BatchError, BatchOpts, BatchSummary};
pub use classify::PerformanceClass;
pub use dataset::{DatasetRow, DatasetWriter};
pub use engine::{EngineError, EngineSession, SimEngine};
pub use metrics::{AggregateMetrics, MetricsAggregator};
pub use run::{RunId, RunIdentity, RunSeed};
pub use scenario::ScenarioConfig;
pub use simulate::{simulate, RunOutput};
