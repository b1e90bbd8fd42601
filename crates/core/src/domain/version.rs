// Engine Version Domain Model

use serde::{Deserialize, Serialize};

/// Installed protocol revision of the exposure-matching engine
///
/// Reported by the platform as a single integer, e.g. `17000000` for 1.7.
/// Ordering is plain integer ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EngineVersion(u64);

impl EngineVersion {
    pub const V1_5: EngineVersion = EngineVersion(15_000_000);
    pub const V1_6: EngineVersion = EngineVersion(16_000_000);
    pub const V1_7: EngineVersion = EngineVersion(17_000_000);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_at_least(&self, other: EngineVersion) -> bool {
        *self >= other
    }
}

impl From<u64> for EngineVersion {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::str::FromStr for EngineVersion {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

impl std::fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
