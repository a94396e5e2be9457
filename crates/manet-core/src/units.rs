//! Physical units used in scenario configurations and engine results.

macro_rules! unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);
            pub const MAX: $name = Self::new(u64::MAX);

            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn into_u64(self) -> u64 {
                self.0
            }

            pub fn into_f64(self) -> f64 {
                self.0 as f64
            }
        }
    };
}

unit!(Bytes);

impl Bytes {
    pub fn into_bits(self) -> u64 {
        self.0 * 8
    }
}

impl std::fmt::Display for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.0)
    }
}

unit!(Meters);

impl std::fmt::Display for Meters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m", self.0)
    }
}

unit!(MetersPerSec);

impl std::fmt::Display for MetersPerSec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m/s", self.0)
    }
}

unit!(Secs);

impl std::fmt::Display for Secs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

unit!(Nanosecs);

impl Nanosecs {
    pub fn into_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    pub fn into_millis_f64(self) -> f64 {
        self.0 as f64 / 1e6
    }
}

impl From<Secs> for Nanosecs {
    fn from(val: Secs) -> Self {
        Nanosecs::new(val.into_u64() * 1_000_000_000)
    }
}

impl std::fmt::Display for Nanosecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

unit!(BitsPerSec);

impl BitsPerSec {
    pub const fn from_mbps(mbps: u64) -> Self {
        Self::new(mbps * 1_000_000)
    }
}

// ns-3 parses this form directly as a `DataRate`.
impl std::fmt::Display for BitsPerSec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

/// Energy in joules. Unlike the integral units above, energy readings from an engine are
/// fractional.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    derive_more::Add,
    derive_more::Sub,
    derive_more::AddAssign,
    derive_more::SubAssign,
    derive_more::Sum,
    derive_more::FromStr,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Joules(f64);

impl Joules {
    pub const ZERO: Joules = Self::new(0.0);

    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub const fn into_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Joules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}J", self.0)
    }
}
