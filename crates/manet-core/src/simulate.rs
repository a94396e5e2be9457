//! Translates a [`ScenarioConfig`] into engine setup calls and runs it.

use rand::prelude::*;

use crate::constants::{
    CBR_PORT, CBR_RATE, CBR_START, DESTINATION, INITIAL_ENERGY, NETWORK_BASE, NETWORK_MASK,
    SINK_START, SOURCE,
};
use crate::engine::{
    CbrApp, EngineError, EngineSession, PacketSink, Position, RawFlowStats, RoutingKind,
    SimEngine, WifiSetup,
};
use crate::run::{RunIdentity, RunSeed, Stream};
use crate::scenario::ScenarioConfig;
use crate::units::{Joules, Meters, Nanosecs};

/// What one simulation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// The scenario as it was actually simulated, after clamping.
    pub config: ScenarioConfig,
    /// Statistics for every monitored flow.
    pub flows: Vec<RawFlowStats>,
    /// Remaining energy per node.
    pub remaining_energy: Vec<Joules>,
}

/// Simulate `config` on `engine` for the run identified by `id`.
///
/// The configuration is clamped again here regardless of where it came from. The engine session
/// lives only for the duration of this call; any engine error aborts the run.
pub fn simulate<E: SimEngine>(
    engine: &E,
    id: &RunIdentity,
    seed: RunSeed,
    config: &ScenarioConfig,
) -> Result<RunOutput, EngineError> {
    let config = config.clamped();
    let routing = RoutingKind::from_name(&id.protocol);
    if routing.is_none() {
        log::debug!(
            "run {}: no routing protocol named {:?}, installing none",
            id.run,
            id.protocol
        );
    }

    let mut session = engine.open(seed)?;

    // Topology
    session.create_nodes(config.nr_nodes)?;
    let positions = random_positions(
        config.nr_nodes,
        config.area_size,
        &mut seed.rng(Stream::Placement),
    );
    session.place_static(&positions)?;

    // Network stack
    session.install_wifi(&WifiSetup::default())?;
    session.install_internet(routing)?;
    session.assign_addresses(NETWORK_BASE, NETWORK_MASK)?;
    session.install_energy(INITIAL_ENERGY)?;

    // Traffic
    let stop = Nanosecs::from(config.sim_time);
    session.install_cbr(&CbrApp {
        src: SOURCE,
        dst: DESTINATION,
        port: CBR_PORT,
        rate: CBR_RATE,
        packet_size: config.packet_size,
        start: CBR_START,
        stop,
    })?;
    session.install_sink(&PacketSink {
        node: DESTINATION,
        port: CBR_PORT,
        start: SINK_START,
    })?;
    session.install_flow_monitor()?;

    session.run_until(stop)?;

    Ok(RunOutput {
        config,
        flows: session.flow_stats()?,
        remaining_energy: session.remaining_energy()?,
    })
}

/// Independent, uniformly random positions in an `area` by `area` square.
fn random_positions<R: Rng + ?Sized>(n: usize, area: Meters, rng: &mut R) -> Vec<Position> {
    let side = area.into_f64();
    (0..n)
        .map(|_| Position::new(rng.gen::<f64>() * side, rng.gen::<f64>() * side))
        .collect()
}
