//! This module defines the batch controller, which drives every run of a dataset through the
//! randomizer, engine, aggregator, classifier and writer.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use indicatif::ProgressBar;
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;

use crate::classify::PerformanceClass;
use crate::constants::{DESTINATION, INITIAL_ENERGY, SOURCE};
use crate::dataset::{DatasetRow, DatasetWriter};
use crate::engine::{EngineError, SimEngine};
use crate::metrics::MetricsAggregator;
use crate::run::{RunId, RunIdentity, RunSeed, Stream};
use crate::scenario::ScenarioConfig;
use crate::simulate;

/// Batch options.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder, serde::Deserialize)]
#[serde(default)]
pub struct BatchOpts {
    /// Routing protocol name.
    #[builder(default = String::from("OLSR"), setter(into))]
    pub protocol: String,
    /// Node-count tiers, run in order.
    #[builder(default = vec![10, 20, 30, 40, 50])]
    pub tiers: Vec<usize>,
    /// Runs per tier.
    #[builder(default = 150)]
    pub reps: usize,
    /// Base seed shared by every run.
    #[builder(default = 12345)]
    pub base_seed: u64,
    /// Dataset path. Defaults to `manet_dataset_<protocol>.csv`.
    #[builder(default, setter(strip_option, into))]
    pub output: Option<PathBuf>,
    /// Number of runs simulated concurrently.
    #[builder(default = 1)]
    pub jobs: usize,
}

impl Default for BatchOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BatchOpts {
    /// Validate the options.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.tiers.is_empty() {
            return Err(BatchError::InvalidOpts("at least one tier is required"));
        }
        if self.tiers.contains(&0) {
            return Err(BatchError::InvalidOpts("tiers must have at least one node"));
        }
        if self.reps == 0 {
            return Err(BatchError::InvalidOpts("reps must be positive"));
        }
        if self.jobs == 0 {
            return Err(BatchError::InvalidOpts("jobs must be positive"));
        }
        // ns-3's seed manager rejects a zero seed.
        if self.base_seed == 0 {
            return Err(BatchError::InvalidOpts("seed must be non-zero"));
        }
        Ok(())
    }

    /// Where the dataset is written.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| format!("manet_dataset_{}.csv", self.protocol).into())
    }

    /// Every run of the batch, in order. Run indices increase across tiers and are never reset.
    pub fn plan(&self) -> Vec<RunIdentity> {
        self.tiers
            .iter()
            .flat_map(|&tier| std::iter::repeat(tier).take(self.reps))
            .enumerate()
            .map(|(i, tier)| RunIdentity::new(self.protocol.clone(), RunId::new(i as u64), tier))
            .collect()
    }
}

/// What a completed batch produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Number of completed runs.
    pub runs: usize,
    /// Number of runs per label.
    pub classes: BTreeMap<PerformanceClass, usize>,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} runs", self.runs)?;
        for class in PerformanceClass::ALL {
            let count = self.classes.get(&class).copied().unwrap_or_default();
            write!(f, ", {class}: {count}")?;
        }
        Ok(())
    }
}

/// Run a whole batch on `engine`, appending one row per run to `writer`.
///
/// The first failed run aborts the batch. Every row of an earlier run is written before the
/// error is returned.
pub fn run_batch<E, W>(
    engine: &E,
    opts: &BatchOpts,
    writer: &mut DatasetWriter<W>,
) -> Result<BatchSummary, BatchError>
where
    E: SimEngine + Sync,
    W: Write,
{
    opts.validate()?;
    let plan = opts.plan();
    info!(
        "Running {} simulations of {} ({} tiers x {} reps, {} jobs)",
        plan.len(),
        opts.protocol,
        opts.tiers.len(),
        opts.reps,
        opts.jobs
    );
    let bar = ProgressBar::new(plan.len() as u64);
    let rows = if opts.jobs == 1 {
        run_sequential(engine, opts.base_seed, &plan, writer, &bar)?
    } else {
        run_parallel(engine, opts, &plan, writer, &bar)?
    };
    bar.finish_and_clear();
    let summary = BatchSummary {
        runs: rows.len(),
        classes: rows.into_iter().counts().into_iter().collect(),
    };
    info!("Finished batch: {summary}");
    Ok(summary)
}

fn run_sequential<E: SimEngine, W: Write>(
    engine: &E,
    base_seed: u64,
    plan: &[RunIdentity],
    writer: &mut DatasetWriter<W>,
    bar: &ProgressBar,
) -> Result<Vec<PerformanceClass>, BatchError> {
    let mut classes = Vec::with_capacity(plan.len());
    for id in plan {
        let row = execute_run(engine, id, base_seed)?;
        writer.append(&row)?;
        classes.push(row.class);
        bar.inc(1);
    }
    Ok(classes)
}

fn run_parallel<E, W>(
    engine: &E,
    opts: &BatchOpts,
    plan: &[RunIdentity],
    writer: &mut DatasetWriter<W>,
    bar: &ProgressBar,
) -> Result<Vec<PerformanceClass>, BatchError>
where
    E: SimEngine + Sync,
    W: Write,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs)
        .build()?;
    // Runs go in windows of `jobs`. A window's rows are written in run order before the next
    // window starts, and no window starts after a failure.
    let mut classes = Vec::with_capacity(plan.len());
    for window in plan.chunks(opts.jobs) {
        let rows = pool.install(|| {
            window
                .par_iter()
                .map(|id| execute_run(engine, id, opts.base_seed))
                .collect::<Vec<_>>()
        });
        for row in rows {
            let row = row?;
            writer.append(&row)?;
            classes.push(row.class);
            bar.inc(1);
        }
    }
    Ok(classes)
}

/// Execute one run: draw its scenario, simulate it, and summarize the results as a row.
pub fn execute_run<E: SimEngine>(
    engine: &E,
    id: &RunIdentity,
    base_seed: u64,
) -> Result<DatasetRow, BatchError> {
    let seed = RunSeed::derive(base_seed, id.run);
    debug!("run {}: seed {} / run {}", id.run, seed.base(), seed.run());
    let config = ScenarioConfig::random(id.nr_nodes, &mut seed.rng(Stream::Scenario));
    info!(
        "Running simulation {}: nodes={}, speed={}, packet size={}, sim time={}",
        id.run, config.nr_nodes, config.node_speed, config.packet_size, config.sim_time
    );
    let out = simulate::simulate(engine, id, seed, &config)
        .map_err(|source| BatchError::Run { run: id.run, source })?;
    let metrics =
        MetricsAggregator::new(INITIAL_ENERGY).aggregate(&out.flows, &out.remaining_energy);
    let class = PerformanceClass::classify(metrics.pdr, metrics.throughput_kbps);
    Ok(DatasetRow {
        protocol: id.protocol.clone(),
        config: out.config,
        source: SOURCE,
        destination: DESTINATION,
        metrics,
        class,
    })
}

/// Batch error.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The options are invalid.
    #[error("invalid batch options: {0}")]
    InvalidOpts(&'static str),

    /// A run failed in the engine.
    #[error("run {run} failed")]
    Run {
        /// The failed run.
        run: RunId,
        /// The engine error.
        #[source]
        source: EngineError,
    },

    /// Error writing the dataset.
    #[error("failed to write dataset")]
    Dataset(#[from] std::io::Error),

    /// Error building the worker pool.
    #[error("failed to build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
