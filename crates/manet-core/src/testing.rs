//! Engines for tests. [`SyntheticEngine`] produces deterministic, plausible statistics from a
//! run's seed without simulating anything; [`RecordingEngine`] additionally records every call
//! it receives.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use rand::prelude::*;

use crate::engine::{
    CbrApp, EngineError, EngineSession, FlowId, PacketSink, Position, RawFlowStats, RoutingKind,
    SimEngine, WifiSetup,
};
use crate::run::{RunId, RunSeed, Stream};
use crate::units::{Bytes, Joules, Nanosecs};

/// Nodes closer than this can hear each other.
const REACH: f64 = 100.0;

/// Bytes of IP and UDP header counted in received bytes.
const SZ_HDR: Bytes = Bytes::new(28);

/// A stand-in engine. Results depend only on the session's seed and setup calls.
#[derive(Debug, Default, Clone, typed_builder::TypedBuilder)]
pub struct SyntheticEngine {
    /// Fail the simulation of this run.
    #[builder(default, setter(strip_option))]
    pub fail_on: Option<RunId>,
}

impl SimEngine for SyntheticEngine {
    type Session = SyntheticSession;

    fn open(&self, seed: RunSeed) -> Result<Self::Session, EngineError> {
        Ok(SyntheticSession::new(seed, self.fail_on, None))
    }
}

/// A setup or execution call received by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(RunSeed),
    CreateNodes(usize),
    PlaceStatic(Vec<Position>),
    InstallWifi(WifiSetup),
    InstallInternet(Option<RoutingKind>),
    AssignAddresses(Ipv4Addr, Ipv4Addr),
    InstallEnergy(Joules),
    InstallCbr(CbrApp),
    InstallSink(PacketSink),
    InstallFlowMonitor,
    RunUntil(Nanosecs),
}

/// A [`SyntheticEngine`] that records every call made to it and its sessions.
#[derive(Debug, Default, Clone)]
pub struct RecordingEngine {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingEngine {
    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl SimEngine for RecordingEngine {
    type Session = SyntheticSession;

    fn open(&self, seed: RunSeed) -> Result<Self::Session, EngineError> {
        self.calls.lock().unwrap().push(Call::Open(seed));
        Ok(SyntheticSession::new(seed, None, Some(self.calls.clone())))
    }
}

/// The session of a [`SyntheticEngine`].
#[derive(Debug)]
pub struct SyntheticSession {
    seed: RunSeed,
    fail: bool,
    log: Option<Arc<Mutex<Vec<Call>>>>,
    nr_nodes: Option<usize>,
    positions: Vec<Position>,
    wifi: bool,
    routing: Option<Option<RoutingKind>>,
    addressed: bool,
    energy: Option<Joules>,
    cbr: Option<CbrApp>,
    sink: Option<PacketSink>,
    monitor: bool,
    results: Option<(Vec<RawFlowStats>, Vec<Joules>)>,
}

impl SyntheticSession {
    fn new(seed: RunSeed, fail_on: Option<RunId>, log: Option<Arc<Mutex<Vec<Call>>>>) -> Self {
        Self {
            seed,
            fail: fail_on == Some(seed.run()),
            log,
            nr_nodes: None,
            positions: Vec::new(),
            wifi: false,
            routing: None,
            addressed: false,
            energy: None,
            cbr: None,
            sink: None,
            monitor: false,
            results: None,
        }
    }

    fn record(&self, call: Call) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(call);
        }
    }

    fn require(cond: bool, msg: &str) -> Result<(), EngineError> {
        if cond {
            Ok(())
        } else {
            Err(EngineError::Setup(msg.to_owned()))
        }
    }

    fn nr_nodes(&self) -> usize {
        self.nr_nodes.unwrap_or_default()
    }

    fn hop_count(&self, src: usize, dst: usize) -> Option<usize> {
        let close = |a: usize, b: usize| {
            let (p, q) = (self.positions[a], self.positions[b]);
            (p.x - q.x).hypot(p.y - q.y) <= REACH
        };
        match self.routing {
            Some(Some(RoutingKind::Olsr)) => {
                // Breadth-first search over the connectivity graph.
                let mut hops = vec![None; self.positions.len()];
                hops[src] = Some(0);
                let mut frontier = vec![src];
                while !frontier.is_empty() {
                    let mut next = Vec::new();
                    for a in frontier {
                        for b in 0..self.positions.len() {
                            if hops[b].is_none() && close(a, b) {
                                hops[b] = hops[a].map(|h| h + 1);
                                next.push(b);
                            }
                        }
                    }
                    frontier = next;
                }
                hops[dst]
            }
            _ => close(src, dst).then_some(1),
        }
    }

    fn synthesize(&self, stop: Nanosecs) -> (Vec<RawFlowStats>, Vec<Joules>) {
        let mut rng = self.seed.rng(Stream::Engine);
        let mut flows = Vec::new();
        let mut busy = vec![0_u64; self.nr_nodes()];
        if let (true, Some(cbr)) = (self.monitor, self.cbr) {
            let end = cbr.stop.min(stop);
            let bits = cbr.packet_size.into_bits();
            let interval = Nanosecs::new(bits * 1_000_000_000 / cbr.rate.into_u64().max(1));
            let tx_packets = if end > cbr.start && interval > Nanosecs::ZERO {
                (end - cbr.start).into_u64().div_ceil(interval.into_u64())
            } else {
                0
            };
            let listening = self
                .sink
                .is_some_and(|s| s.node == cbr.dst && s.port == cbr.port && s.start <= cbr.start);
            let hops = self.hop_count(cbr.src.inner(), cbr.dst.inner());
            let p_deliver = match (listening, hops) {
                (true, Some(h)) => 0.99_f64.powi(h as i32),
                _ => 0.0,
            };
            let rx_packets = (0..tx_packets)
                .filter(|_| rng.gen_bool(p_deliver))
                .count() as u64;
            // Airtime at 11 Mbit/s plus a random per-hop queueing delay.
            let per_hop = bits * 1_000 / 11 + rng.gen_range(100_000..500_000);
            let per_packet = Nanosecs::new(hops.unwrap_or_default() as u64 * per_hop);
            let last_rx = if rx_packets > 0 {
                cbr.start + Nanosecs::new(interval.into_u64() * (tx_packets - 1)) + per_packet
            } else {
                Nanosecs::ZERO
            };
            busy[cbr.src.inner()] += tx_packets;
            busy[cbr.dst.inner()] += rx_packets;
            if tx_packets > 0 {
                flows.push(RawFlowStats {
                    id: FlowId::ONE,
                    tx_packets,
                    rx_packets,
                    lost_packets: tx_packets - rx_packets,
                    delay_sum: Nanosecs::new(per_packet.into_u64() * rx_packets),
                    first_tx: cbr.start,
                    last_rx,
                    rx_bytes: Bytes::new((cbr.packet_size + SZ_HDR).into_u64() * rx_packets),
                });
            }
        }
        let initial = self.energy.unwrap_or_default();
        let energy = busy
            .into_iter()
            .map(|pkts| {
                let used = stop.into_secs_f64() * rng.gen_range(0.1..0.3) + pkts as f64 * 1e-3;
                Joules::new((initial.into_f64() - used).max(0.0))
            })
            .collect();
        (flows, energy)
    }
}

impl EngineSession for SyntheticSession {
    fn create_nodes(&mut self, n: usize) -> Result<(), EngineError> {
        self.record(Call::CreateNodes(n));
        Self::require(self.nr_nodes.is_none(), "nodes already created")?;
        self.nr_nodes = Some(n);
        Ok(())
    }

    fn place_static(&mut self, positions: &[Position]) -> Result<(), EngineError> {
        self.record(Call::PlaceStatic(positions.to_vec()));
        Self::require(
            self.nr_nodes == Some(positions.len()),
            "one position per node required",
        )?;
        self.positions = positions.to_vec();
        Ok(())
    }

    fn install_wifi(&mut self, wifi: &WifiSetup) -> Result<(), EngineError> {
        self.record(Call::InstallWifi(wifi.clone()));
        Self::require(!self.positions.is_empty(), "nodes must be placed first")?;
        self.wifi = true;
        Ok(())
    }

    fn install_internet(&mut self, routing: Option<RoutingKind>) -> Result<(), EngineError> {
        self.record(Call::InstallInternet(routing));
        Self::require(self.wifi, "wifi must be installed first")?;
        self.routing = Some(routing);
        Ok(())
    }

    fn assign_addresses(&mut self, base: Ipv4Addr, mask: Ipv4Addr) -> Result<(), EngineError> {
        self.record(Call::AssignAddresses(base, mask));
        Self::require(self.routing.is_some(), "internet stack must be installed first")?;
        self.addressed = true;
        Ok(())
    }

    fn install_energy(&mut self, initial: Joules) -> Result<(), EngineError> {
        self.record(Call::InstallEnergy(initial));
        Self::require(self.wifi, "wifi must be installed first")?;
        self.energy = Some(initial);
        Ok(())
    }

    fn install_cbr(&mut self, app: &CbrApp) -> Result<(), EngineError> {
        self.record(Call::InstallCbr(*app));
        Self::require(self.addressed, "addresses must be assigned first")?;
        Self::require(
            app.src.inner() < self.nr_nodes() && app.dst.inner() < self.nr_nodes(),
            "traffic endpoints must exist",
        )?;
        self.cbr = Some(*app);
        Ok(())
    }

    fn install_sink(&mut self, sink: &PacketSink) -> Result<(), EngineError> {
        self.record(Call::InstallSink(*sink));
        Self::require(self.addressed, "addresses must be assigned first")?;
        Self::require(sink.node.inner() < self.nr_nodes(), "sink node must exist")?;
        self.sink = Some(*sink);
        Ok(())
    }

    fn install_flow_monitor(&mut self) -> Result<(), EngineError> {
        self.record(Call::InstallFlowMonitor);
        self.monitor = true;
        Ok(())
    }

    fn run_until(&mut self, stop: Nanosecs) -> Result<(), EngineError> {
        self.record(Call::RunUntil(stop));
        if self.fail {
            return Err(EngineError::Engine(anyhow::anyhow!(
                "injected failure in run {}",
                self.seed.run()
            )));
        }
        self.results = Some(self.synthesize(stop));
        Ok(())
    }

    fn flow_stats(&self) -> Result<Vec<RawFlowStats>, EngineError> {
        self.results
            .as_ref()
            .map(|(flows, _)| flows.clone())
            .ok_or(EngineError::NotRun)
    }

    fn remaining_energy(&self) -> Result<Vec<Joules>, EngineError> {
        self.results
            .as_ref()
            .map(|(_, energy)| energy.clone())
            .ok_or(EngineError::NotRun)
    }
}
