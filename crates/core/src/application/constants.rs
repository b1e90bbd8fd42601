// Gate constants (No magic values)
use crate::domain::EngineVersion;
use std::time::Duration;

/// Minimum engine revision required before any key file is handed over
pub const DEFAULT_REQUIRED_ENGINE_VERSION: EngineVersion = EngineVersion::V1_7;

/// Default sync cycle period (1 hour)
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Provisioning attempts the platform allows per UTC day
pub const DEFAULT_DAILY_QUOTA: u32 = 20;
