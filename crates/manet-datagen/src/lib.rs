//! Generates a labeled MANET performance dataset by running a batch of randomized scenarios.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use manet_core::{run_batch, BatchOpts, BatchSummary, DatasetWriter, SimEngine};

/// Batch options given on the command line. Each one overrides the configuration file.
#[derive(Debug, Default, clap::Args)]
pub struct Overrides {
    /// Routing protocol name
    #[arg(short, long)]
    pub protocol: Option<String>,

    /// Comma-separated node-count tiers
    #[arg(short, long, value_delimiter = ',')]
    pub tiers: Option<Vec<usize>>,

    /// Runs per tier
    #[arg(short, long)]
    pub reps: Option<usize>,

    /// Base seed
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Dataset path [default: manet_dataset_<protocol>.csv]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of runs simulated concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

impl Overrides {
    /// Apply the overrides to `opts`.
    pub fn apply(self, mut opts: BatchOpts) -> BatchOpts {
        if let Some(protocol) = self.protocol {
            opts.protocol = protocol;
        }
        if let Some(tiers) = self.tiers {
            opts.tiers = tiers;
        }
        if let Some(reps) = self.reps {
            opts.reps = reps;
        }
        if let Some(seed) = self.seed {
            opts.base_seed = seed;
        }
        if let Some(output) = self.output {
            opts.output = Some(output);
        }
        if let Some(jobs) = self.jobs {
            opts.jobs = jobs;
        }
        opts
    }
}

/// Reads [`BatchOpts`] from a JSON file. Missing fields take their defaults.
pub fn read_opts(path: impl AsRef<Path>) -> Result<BatchOpts, Error> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        }
        _ => Err(Error::UnknownFileType(path.into())),
    }
}

/// Runs the batch described by `opts` on `engine` and writes the dataset.
///
/// The dataset file is created before the first run. If the batch fails, every row completed
/// before the failure stays on disk.
pub fn generate<E>(engine: &E, opts: &BatchOpts) -> anyhow::Result<BatchSummary>
where
    E: SimEngine + Sync,
{
    opts.validate()?;
    let path = opts.output_path();
    let mut writer = DatasetWriter::create(&path)
        .with_context(|| format!("failed to create dataset {}", path.display()))?;
    log::info!("Writing dataset to {}", path.display());
    let summary = run_batch(engine, opts, &mut writer)
        .with_context(|| format!("batch aborted, partial dataset left in {}", path.display()))?;
    writer
        .finish()
        .with_context(|| format!("failed to close dataset {}", path.display()))?;
    Ok(summary)
}

/// Error kinds for configuration files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown file type.
    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    /// Error deserializing JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_given_fields() {
        let overrides = Overrides {
            protocol: Some("DSR".into()),
            reps: Some(3),
            ..Default::default()
        };
        let opts = overrides.apply(BatchOpts::default());
        assert_eq!(opts.protocol, "DSR");
        assert_eq!(opts.reps, 3);
        assert_eq!(opts.tiers, vec![10, 20, 30, 40, 50]);
        assert_eq!(opts.base_seed, 12345);
        assert_eq!(opts.output_path(), PathBuf::from("manet_dataset_DSR.csv"));
    }

    #[test]
    fn read_opts_fills_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("batch.json");
        std::fs::write(&path, r#"{ "tiers": [5, 15], "jobs": 2 }"#)?;
        let opts = read_opts(&path)?;
        assert_eq!(opts.tiers, vec![5, 15]);
        assert_eq!(opts.jobs, 2);
        assert_eq!(opts.protocol, "OLSR");
        assert_eq!(opts.reps, 150);
        Ok(())
    }

    #[test]
    fn read_opts_rejects_unknown_types() {
        assert!(matches!(
            read_opts("batch.toml"),
            Err(Error::UnknownFileType(_))
        ));
    }
}
