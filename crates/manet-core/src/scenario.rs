//! This module defines [`ScenarioConfig`], the description of one randomized simulation run, and
//! the randomizer that draws it.

use std::ops::RangeInclusive;

use rand::prelude::*;

use crate::units::{Bytes, Meters, MetersPerSec, Secs};

/// Node speeds a scenario may be drawn with.
pub const SPEEDS: [MetersPerSec; 5] = [
    MetersPerSec::new(1),
    MetersPerSec::new(5),
    MetersPerSec::new(10),
    MetersPerSec::new(15),
    MetersPerSec::new(20),
];

/// Packet sizes a scenario may be drawn with.
pub const PACKET_SIZES: [Bytes; 4] = [
    Bytes::new(512),
    Bytes::new(640),
    Bytes::new(768),
    Bytes::new(896),
];

const PAUSE_TIMES: RangeInclusive<u64> = 0..=5;
const AREA_SIZES: RangeInclusive<u64> = 200..=300;
const RANGES: RangeInclusive<u64> = 50..=100;
const SIM_TIMES: RangeInclusive<u64> = 15..=25;
const TRAFFIC_LOADS: RangeInclusive<u64> = 1..=100;

/// The smallest node count a scenario can run with.
pub const MIN_NODES: usize = 2;

/// The shortest simulation a scenario can run for.
pub const MIN_SIM_TIME: Secs = Secs::new(10);

/// The largest area side length a scenario can span.
pub const MAX_AREA_SIZE: Meters = Meters::new(300);

/// The smallest transmission or reception range.
pub const MIN_RANGE: Meters = Meters::new(50);

/// The transport used by the traffic generator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TrafficType {
    #[default]
    Udp,
}

impl std::fmt::Display for TrafficType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrafficType::Udp => write!(f, "UDP"),
        }
    }
}

/// One simulation scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScenarioConfig {
    /// Number of nodes.
    pub nr_nodes: usize,
    /// Node speed.
    pub node_speed: MetersPerSec,
    /// Pause time between movements.
    pub pause_time: Secs,
    /// Side length of the square area nodes are placed in.
    pub area_size: Meters,
    /// Transport of the traffic flow.
    pub traffic_type: TrafficType,
    /// Application packet size.
    pub packet_size: Bytes,
    /// Transmission range.
    pub tx_range: Meters,
    /// Reception range.
    pub rx_range: Meters,
    /// How long the simulation runs.
    pub sim_time: Secs,
    /// Offered traffic load, unitless.
    pub traffic_load: u64,
}

impl ScenarioConfig {
    /// Draw a scenario with `nr_nodes` nodes. Every other field is drawn independently and
    /// uniformly from its domain.
    pub fn random<R: Rng + ?Sized>(nr_nodes: usize, rng: &mut R) -> Self {
        Self {
            nr_nodes,
            node_speed: *SPEEDS.choose(rng).unwrap(), // `SPEEDS` is not empty
            pause_time: Secs::new(rng.gen_range(PAUSE_TIMES)),
            area_size: Meters::new(rng.gen_range(AREA_SIZES)),
            traffic_type: TrafficType::Udp,
            packet_size: *PACKET_SIZES.choose(rng).unwrap(), // `PACKET_SIZES` is not empty
            tx_range: Meters::new(rng.gen_range(RANGES)),
            rx_range: Meters::new(rng.gen_range(RANGES)),
            sim_time: Secs::new(rng.gen_range(SIM_TIMES)),
            traffic_load: rng.gen_range(TRAFFIC_LOADS),
        }
        .clamped()
    }

    /// Returns a copy of the scenario with every field clamped to its safe operating range.
    ///
    /// Clamping happens both when a scenario is drawn and again when it is handed to an engine,
    /// since scenarios can be constructed by other means.
    pub fn clamped(self) -> Self {
        Self {
            nr_nodes: self.nr_nodes.max(MIN_NODES),
            area_size: self.area_size.min(MAX_AREA_SIZE),
            tx_range: self.tx_range.max(MIN_RANGE),
            rx_range: self.rx_range.max(MIN_RANGE),
            sim_time: self.sim_time.max(MIN_SIM_TIME),
            ..self
        }
    }

    /// Whether every field is already within its safe operating range.
    pub fn is_clamped(&self) -> bool {
        *self == self.clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsafe_config() -> ScenarioConfig {
        ScenarioConfig {
            nr_nodes: 0,
            node_speed: MetersPerSec::new(5),
            pause_time: Secs::new(2),
            area_size: Meters::new(1_000),
            traffic_type: TrafficType::Udp,
            packet_size: Bytes::new(512),
            tx_range: Meters::new(10),
            rx_range: Meters::new(20),
            sim_time: Secs::new(1),
            traffic_load: 40,
        }
    }

    #[test]
    fn clamping_enforces_floors_and_ceilings() {
        let config = unsafe_config().clamped();
        assert_eq!(config.nr_nodes, 2);
        assert_eq!(config.area_size, Meters::new(300));
        assert_eq!(config.tx_range, Meters::new(50));
        assert_eq!(config.rx_range, Meters::new(50));
        assert_eq!(config.sim_time, Secs::new(10));
        // Untouched fields
        assert_eq!(config.node_speed, MetersPerSec::new(5));
        assert_eq!(config.pause_time, Secs::new(2));
        assert_eq!(config.packet_size, Bytes::new(512));
        assert_eq!(config.traffic_load, 40);
    }

    #[test]
    fn clamping_is_idempotent() {
        let once = unsafe_config().clamped();
        assert_eq!(once, once.clamped());
        assert!(once.is_clamped());
        assert!(!unsafe_config().is_clamped());
    }

    #[test]
    fn random_configs_stay_in_domain() {
        let mut rng = StdRng::seed_from_u64(0);
        for nr_nodes in [0, 1, 2, 10, 50] {
            for _ in 0..1_000 {
                let c = ScenarioConfig::random(nr_nodes, &mut rng);
                assert_eq!(c.nr_nodes, nr_nodes.max(MIN_NODES));
                assert!(SPEEDS.contains(&c.node_speed));
                assert!(PAUSE_TIMES.contains(&c.pause_time.into_u64()));
                assert!(AREA_SIZES.contains(&c.area_size.into_u64()));
                assert!(PACKET_SIZES.contains(&c.packet_size));
                assert!(RANGES.contains(&c.tx_range.into_u64()));
                assert!(RANGES.contains(&c.rx_range.into_u64()));
                assert!(SIM_TIMES.contains(&c.sim_time.into_u64()));
                assert!(TRAFFIC_LOADS.contains(&c.traffic_load));
                assert_eq!(c.traffic_type, TrafficType::Udp);
                assert!(c.is_clamped());
            }
        }
    }

    #[test]
    fn random_configs_cover_discrete_domains() {
        let mut rng = StdRng::seed_from_u64(1);
        let configs = (0..2_000)
            .map(|_| ScenarioConfig::random(10, &mut rng))
            .collect::<Vec<_>>();
        for speed in SPEEDS {
            assert!(configs.iter().any(|c| c.node_speed == speed));
        }
        for size in PACKET_SIZES {
            assert!(configs.iter().any(|c| c.packet_size == size));
        }
    }

    #[test]
    fn same_rng_state_draws_same_config() {
        let a = ScenarioConfig::random(20, &mut StdRng::seed_from_u64(42));
        let b = ScenarioConfig::random(20, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
