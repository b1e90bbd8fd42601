// Keygate Infrastructure - System Adapters
// Implements: QuotaLedger, VersionGuard, ExposureMatchingClient, KeyFileSource

pub mod daily_quota;
pub mod directory_source;
pub mod spool_client;
pub mod version_guard_impl;

pub use daily_quota::DailySubmissionQuota;
pub use directory_source::DirectoryKeySource;
pub use spool_client::SpoolMatchingClient;
pub use version_guard_impl::{FileVersionGuard, StaticVersionGuard};
