// Application Layer - Use Cases

pub mod constants;
pub mod provider;
mod shutdown;
pub mod sync_job;

// Re-exports
pub use provider::DiagnosisKeyProvider;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use sync_job::{KeySyncJob, SyncReport};
