//! The capability set of a network simulation engine.
//!
//! Node placement, propagation, MAC arbitration, routing and energy depletion all live behind
//! these traits. The rest of the crate only ever sees the operations below and the shapes they
//! return.

use std::net::Ipv4Addr;

use crate::run::RunSeed;
use crate::units::{BitsPerSec, Bytes, Joules, Nanosecs};

identifier!(
    /// A node of a scenario, numbered from 0 in creation order.
    NodeId,
    usize
);
identifier!(
    /// A flow as numbered by the engine's flow monitor.
    FlowId,
    u32
);

/// An interface for network simulation engines.
pub trait SimEngine {
    /// A single simulation, alive from [`SimEngine::open`] until it is dropped.
    type Session: EngineSession;

    /// Start a fresh simulation whose randomness is seeded by `seed`. No state may carry over
    /// from any earlier session.
    fn open(&self, seed: RunSeed) -> Result<Self::Session, EngineError>;
}

impl<T: SimEngine> SimEngine for &T {
    type Session = T::Session;

    fn open(&self, seed: RunSeed) -> Result<Self::Session, EngineError> {
        (**self).open(seed)
    }
}

/// Setup and execution calls for one simulation. Dropping the session tears the simulation
/// down.
///
/// Setup calls are expected in the order they are declared here.
pub trait EngineSession {
    /// Create `n` nodes with IDs `0..n`.
    fn create_nodes(&mut self, n: usize) -> Result<(), EngineError>;

    /// Pin node `i` to `positions[i]` with a static mobility model.
    fn place_static(&mut self, positions: &[Position]) -> Result<(), EngineError>;

    /// Install wireless devices on every node.
    fn install_wifi(&mut self, wifi: &WifiSetup) -> Result<(), EngineError>;

    /// Install the network-layer stack, with a routing protocol if one is given.
    fn install_internet(&mut self, routing: Option<RoutingKind>) -> Result<(), EngineError>;

    /// Assign addresses to every device from the network `base`/`mask`.
    fn assign_addresses(&mut self, base: Ipv4Addr, mask: Ipv4Addr) -> Result<(), EngineError>;

    /// Install an energy source with `initial` capacity on every node.
    fn install_energy(&mut self, initial: Joules) -> Result<(), EngineError>;

    /// Install a constant-bit-rate traffic generator.
    fn install_cbr(&mut self, app: &CbrApp) -> Result<(), EngineError>;

    /// Install a traffic sink.
    fn install_sink(&mut self, sink: &PacketSink) -> Result<(), EngineError>;

    /// Monitor every flow in the simulation.
    fn install_flow_monitor(&mut self) -> Result<(), EngineError>;

    /// Run the simulation until `stop`.
    fn run_until(&mut self, stop: Nanosecs) -> Result<(), EngineError>;

    /// Statistics for each monitored flow. Only valid after [`EngineSession::run_until`].
    fn flow_stats(&self) -> Result<Vec<RawFlowStats>, EngineError>;

    /// Remaining energy of each node, indexed by node ID. Only valid after
    /// [`EngineSession::run_until`].
    fn remaining_energy(&self) -> Result<Vec<Joules>, EngineError>;
}

/// A position in the plane, in meters.
#[derive(Debug, Clone, Copy, PartialEq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// The wireless stack: an ad-hoc MAC over an 802.11b PHY with a rate-adaptive station manager.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct WifiSetup {
    #[builder(default = WifiStandard::Ieee80211b)]
    pub standard: WifiStandard,
    #[builder(default = RateManager::Aarf)]
    pub rate_manager: RateManager,
}

impl Default for WifiSetup {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiStandard {
    Ieee80211b,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateManager {
    Aarf,
}

/// Routing protocols an engine knows how to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RoutingKind {
    Olsr,
}

impl RoutingKind {
    /// Look up a routing protocol by name. Names without a wired-in protocol return `None`, and
    /// a stack installed with `None` only delivers to direct neighbors.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("olsr") {
            Some(RoutingKind::Olsr)
        } else {
            None
        }
    }
}

/// A constant-bit-rate UDP traffic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbrApp {
    pub src: NodeId,
    pub dst: NodeId,
    pub port: u16,
    pub rate: BitsPerSec,
    pub packet_size: Bytes,
    pub start: Nanosecs,
    pub stop: Nanosecs,
}

/// A UDP sink. It never stops on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketSink {
    pub node: NodeId,
    pub port: u16,
    pub start: Nanosecs,
}

/// Counters for one monitored flow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawFlowStats {
    pub id: FlowId,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    /// Sum of end-to-end delays of all received packets.
    pub delay_sum: Nanosecs,
    pub first_tx: Nanosecs,
    pub last_rx: Nanosecs,
    pub rx_bytes: Bytes,
}

impl RawFlowStats {
    /// Time between the first transmission and the last reception, if positive.
    pub fn active_duration(&self) -> Option<Nanosecs> {
        (self.last_rx > self.first_tx).then(|| self.last_rx - self.first_tx)
    }
}

/// Engine error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A setup call was made out of order or with inconsistent arguments.
    #[error("invalid setup: {0}")]
    Setup(String),

    /// Results were requested before the simulation ran.
    #[error("simulation has not run")]
    NotRun,

    /// The engine itself failed.
    #[error("engine failure")]
    Engine(#[source] anyhow::Error),

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
