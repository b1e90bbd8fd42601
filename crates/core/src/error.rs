// Central Error Type for the Gate

use crate::domain::EngineVersion;
use crate::port::MatchingError;
use thiserror::Error;

/// Failures of a provisioning attempt
///
/// Quota denial is not here: it is `ProvisionOutcome::QuotaDenied`.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Outdated exposure-matching engine: current {current}, required {required}")]
    OutdatedEngineVersion {
        current: EngineVersion,
        required: EngineVersion,
    },

    #[error("Engine version unavailable: {0}")]
    VersionUnavailable(String),

    #[error(transparent)]
    Matching(#[from] MatchingError),

    #[error("Key file source error: {0}")]
    Source(String),

    #[error("Provisioning aborted: {0}")]
    Aborted(String),
}

impl ProvisionError {
    /// True when the caller should prompt for an engine update
    pub fn is_outdated_engine(&self) -> bool {
        matches!(self, ProvisionError::OutdatedEngineVersion { .. })
    }
}

/// Result type alias using ProvisionError
pub type Result<T> = std::result::Result<T, ProvisionError>;
