// Port Layer - Interfaces for external collaborators

pub mod id_provider; // For deterministic testing
pub mod key_file_source;
pub mod matching_client;
pub mod quota_ledger;
pub mod time_provider;
pub mod version_guard;

// Re-exports
pub use id_provider::IdProvider;
pub use key_file_source::KeyFileSource;
pub use matching_client::{ExposureMatchingClient, MatchingError};
pub use quota_ledger::QuotaLedger;
pub use time_provider::TimeProvider;
pub use version_guard::VersionGuard;
