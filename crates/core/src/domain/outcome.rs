// Provisioning Outcome

use serde::{Deserialize, Serialize};

/// Result of one gated provisioning attempt that did not fail
///
/// Quota denial is an ordinary outcome ("try again next cycle"), not an
/// error. Version rejection and engine failures travel on the error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisionOutcome {
    /// Nothing to provide; no collaborator was touched
    EmptyBatch,
    /// Quota granted and the whole batch handed to the engine
    Forwarded { files: usize },
    /// Quota ledger refused the attempt; the engine was not called
    QuotaDenied,
}

impl ProvisionOutcome {
    /// Boolean view used by callers that only care about success
    pub fn is_provided(&self) -> bool {
        !matches!(self, ProvisionOutcome::QuotaDenied)
    }
}

impl From<ProvisionOutcome> for bool {
    fn from(outcome: ProvisionOutcome) -> Self {
        outcome.is_provided()
    }
}

impl std::fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionOutcome::EmptyBatch => write!(f, "EMPTY_BATCH"),
            ProvisionOutcome::Forwarded { files } => write!(f, "FORWARDED({})", files),
            ProvisionOutcome::QuotaDenied => write!(f, "QUOTA_DENIED"),
        }
    }
}
