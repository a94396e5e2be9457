//! Performance labels derived from a run's aggregate metrics.

/// A coarse performance label, ordered from worst to best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum PerformanceClass {
    Low,
    Medium,
    High,
}

impl PerformanceClass {
    /// All labels, worst first.
    pub const ALL: [PerformanceClass; 3] = [
        PerformanceClass::Low,
        PerformanceClass::Medium,
        PerformanceClass::High,
    ];

    /// Label a run by its packet delivery ratio and throughput (kbit/s). Both thresholds are
    /// strict.
    pub fn classify(pdr: f64, throughput_kbps: f64) -> Self {
        if pdr > 0.8 && throughput_kbps > 500.0 {
            PerformanceClass::High
        } else if pdr > 0.5 && throughput_kbps > 200.0 {
            PerformanceClass::Medium
        } else {
            PerformanceClass::Low
        }
    }
}

impl std::fmt::Display for PerformanceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PerformanceClass::Low => "Low",
            PerformanceClass::Medium => "Medium",
            PerformanceClass::High => "High",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use PerformanceClass::*;

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(PerformanceClass::classify(0.8, 1000.0), Medium);
        assert_eq!(PerformanceClass::classify(0.9, 500.0), Medium);
        assert_eq!(PerformanceClass::classify(0.81, 500.1), High);
        assert_eq!(PerformanceClass::classify(0.5, 1000.0), Low);
        assert_eq!(PerformanceClass::classify(0.9, 200.0), Low);
        assert_eq!(PerformanceClass::classify(0.51, 200.1), Medium);
    }

    #[test]
    fn both_metrics_must_clear_the_bar() {
        assert_eq!(PerformanceClass::classify(1.0, 0.0), Low);
        assert_eq!(PerformanceClass::classify(0.0, 10_000.0), Low);
        assert_eq!(PerformanceClass::classify(1.0, 300.0), Medium);
    }

    #[test]
    fn classification_is_total_and_deterministic() {
        let samples = [0.0, 0.2, 0.5, 0.6, 0.8, 0.95, 1.0];
        let rates = [0.0, 100.0, 200.0, 350.0, 500.0, 900.0];
        for pdr in samples {
            for rate in rates {
                let label = PerformanceClass::classify(pdr, rate);
                assert!(PerformanceClass::ALL.contains(&label));
                assert_eq!(label, PerformanceClass::classify(pdr, rate));
            }
        }
    }

    #[test]
    fn labels_are_ordered() {
        assert!(Low < Medium && Medium < High);
        assert_eq!(High.to_string(), "High");
    }
}
