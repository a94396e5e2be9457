//! Reduction of raw per-flow counters into scenario-level metrics.

use crate::engine::RawFlowStats;
use crate::units::Joules;

/// Scenario-level metrics of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AggregateMetrics {
    /// Packet delivery ratio over all flows.
    pub pdr: f64,
    /// Sum of per-flow throughputs, in kbit/s.
    pub throughput_kbps: f64,
    /// Mean end-to-end delay of received packets, in milliseconds.
    pub avg_delay_ms: f64,
    /// Lost packets over transmitted packets.
    pub loss_rate: f64,
    /// Number of monitored flows.
    pub nr_flows: usize,
    /// Energy consumed across all nodes.
    pub energy_used: Joules,
}

/// Reduces flow statistics and remaining node energy to [`AggregateMetrics`].
#[derive(Debug, Clone, Copy, derive_new::new)]
pub struct MetricsAggregator {
    initial_energy: Joules,
}

impl MetricsAggregator {
    /// Aggregate one run's results.
    ///
    /// Ratios are zero when their denominators are, and flows with no positive active duration
    /// contribute nothing to throughput.
    pub fn aggregate(&self, flows: &[RawFlowStats], remaining: &[Joules]) -> AggregateMetrics {
        let tx = flows.iter().map(|f| f.tx_packets).sum::<u64>();
        let rx = flows.iter().map(|f| f.rx_packets).sum::<u64>();
        let lost = flows.iter().map(|f| f.lost_packets).sum::<u64>();
        let delay_ms = flows
            .iter()
            .map(|f| f.delay_sum.into_millis_f64())
            .sum::<f64>();
        let throughput_kbps = flows
            .iter()
            .filter_map(|f| {
                f.active_duration()
                    .map(|dur| f.rx_bytes.into_bits() as f64 / dur.into_secs_f64() / 1024.0)
            })
            .sum::<f64>();
        AggregateMetrics {
            pdr: ratio(rx as f64, tx as f64).min(1.0),
            throughput_kbps,
            avg_delay_ms: ratio(delay_ms, rx as f64),
            loss_rate: ratio(lost as f64, tx as f64),
            nr_flows: flows.len(),
            energy_used: remaining.iter().map(|&r| self.consumed(r)).sum(),
        }
    }

    /// Energy consumed by one node with `remaining` energy left.
    pub fn consumed(&self, remaining: Joules) -> Joules {
        let initial = self.initial_energy.into_f64();
        Joules::new(initial - remaining.into_f64().clamp(0.0, initial))
    }
}

fn ratio(num: f64, denom: f64) -> f64 {
    if denom > 0.0 {
        num / denom
    } else {
        0.0
    }
}
