// Domain Layer - Pure types for key provisioning

pub mod key_file;
pub mod outcome;
pub mod version;

// Re-exports
pub use key_file::{KeyFile, KeyFileBatch};
pub use outcome::ProvisionOutcome;
pub use version::EngineVersion;

/// Quota cost of one provisioning attempt, independent of batch size
pub const QUOTA_UNITS_PER_ATTEMPT: u32 = 1;
