//! The CSV dataset. One row per completed run, appended in run order.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::classify::PerformanceClass;
use crate::engine::NodeId;
use crate::metrics::AggregateMetrics;
use crate::scenario::ScenarioConfig;

/// The header row.
pub const HEADER: &str = "Protocol,NumNodes,NodeSpeed,Source,Destination,PauseTime,AreaSize,\
    TrafficType,PacketSize,TxRange,RxRange,SimTime,TrafficLoad,PDR,Throughput (kbps),\
    AvgDelay (ms),LossRate,RoutingOverhead,PerformanceClass,EnergyUsed (J)";

/// One dataset row.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DatasetRow {
    pub protocol: String,
    pub config: ScenarioConfig,
    pub source: NodeId,
    pub destination: NodeId,
    pub metrics: AggregateMetrics,
    pub class: PerformanceClass,
}

impl DatasetRow {
    fn write_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        let c = &self.config;
        let m = &self.metrics;
        // The routing overhead column carries the flow count.
        writeln!(
            w,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{:.3},{:.3},{:.3},{:.3},{},{},{:.3}",
            self.protocol,
            c.nr_nodes,
            c.node_speed.into_u64(),
            self.source,
            self.destination,
            c.pause_time.into_u64(),
            c.area_size.into_u64(),
            c.traffic_type,
            c.packet_size.into_u64(),
            c.tx_range.into_u64(),
            c.rx_range.into_u64(),
            c.sim_time.into_u64(),
            c.traffic_load,
            m.pdr,
            m.throughput_kbps,
            m.avg_delay_ms,
            m.loss_rate,
            m.nr_flows,
            self.class,
            m.energy_used.into_f64(),
        )
    }
}

/// An append-only dataset writer. The header is written on creation, and every row is flushed
/// as soon as it is appended so that a failed batch leaves all completed rows on disk.
#[derive(Debug)]
pub struct DatasetWriter<W: Write> {
    inner: W,
    nr_rows: usize,
}

impl DatasetWriter<BufWriter<File>> {
    /// Create (or truncate) the dataset file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> DatasetWriter<W> {
    /// Start a dataset on `inner`.
    pub fn new(mut inner: W) -> io::Result<Self> {
        writeln!(inner, "{HEADER}")?;
        inner.flush()?;
        Ok(Self { inner, nr_rows: 0 })
    }

    /// Append one row.
    pub fn append(&mut self, row: &DatasetRow) -> io::Result<()> {
        row.write_csv(&mut self.inner)?;
        self.inner.flush()?;
        self.nr_rows += 1;
        Ok(())
    }

    /// Number of rows appended so far.
    pub fn nr_rows(&self) -> usize {
        self.nr_rows
    }

    /// Flush and close the dataset, returning the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
