//! Scenario constants. These are fixed for every run in a dataset.

use std::net::Ipv4Addr;

use crate::engine::NodeId;
use crate::units::{BitsPerSec, Joules, Nanosecs};

/// Initial capacity of every node's energy source.
pub const INITIAL_ENERGY: Joules = Joules::new(100.0);

/// Rate of the constant-bit-rate traffic generator.
pub const CBR_RATE: BitsPerSec = BitsPerSec::from_mbps(1);

/// UDP port shared by the traffic generator and its sink.
pub const CBR_PORT: u16 = 9;

/// When the traffic generator starts sending.
pub const CBR_START: Nanosecs = Nanosecs::new(1_000_000_000);

/// When the sink starts listening.
pub const SINK_START: Nanosecs = Nanosecs::ZERO;

/// The source of the single traffic flow.
pub const SOURCE: NodeId = NodeId::ZERO;

/// The destination of the single traffic flow.
pub const DESTINATION: NodeId = NodeId::ONE;

/// Network base and mask for address assignment.
pub const NETWORK_BASE: Ipv4Addr = Ipv4Addr::new(10, 1, 0, 0);
pub const NETWORK_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 0, 0);
