// Engine Version Guard Port
// reason: async-trait, reading the installed version may suspend on platform I/O
use crate::domain::EngineVersion;
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;

/// Compare an installed version against a required minimum
///
/// # Errors
/// `ProvisionError::OutdatedEngineVersion` when `current < minimum`
pub fn check_minimum(current: EngineVersion, minimum: EngineVersion) -> Result<()> {
    if current < minimum {
        return Err(ProvisionError::OutdatedEngineVersion {
            current,
            required: minimum,
        });
    }
    Ok(())
}

/// Protocol version gate for the exposure-matching engine
#[async_trait]
pub trait VersionGuard: Send + Sync {
    /// Read the currently installed engine version
    ///
    /// # Errors
    /// - `ProvisionError::VersionUnavailable` if the engine cannot be queried
    async fn current_version(&self) -> Result<EngineVersion>;

    /// Fail unless the installed engine is at least `minimum`
    ///
    /// No side effect beyond the check.
    ///
    /// # Errors
    /// - `ProvisionError::OutdatedEngineVersion { current, required }`
    /// - `ProvisionError::VersionUnavailable` if the engine cannot be queried
    async fn require_minimum_version(&self, minimum: EngineVersion) -> Result<()> {
        let current = self.current_version().await?;
        check_minimum(current, minimum)
    }

    /// Non-failing variant of `require_minimum_version`
    async fn is_at_least(&self, version: EngineVersion) -> Result<bool> {
        Ok(self.current_version().await?.is_at_least(version))
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock guard behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Report this installed version and compare normally
        Installed(EngineVersion),
        /// Reject every check with these versions, whatever the minimum
        Reject {
            current: EngineVersion,
            required: EngineVersion,
        },
        /// Engine cannot be queried
        Unavailable(String),
    }

    /// Mock VersionGuard recording every required minimum it was asked for
    pub struct MockVersionGuard {
        behavior: Arc<Mutex<MockBehavior>>,
        calls: Arc<Mutex<Vec<EngineVersion>>>,
    }

    impl MockVersionGuard {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn installed(version: EngineVersion) -> Self {
            Self::new(MockBehavior::Installed(version))
        }
        pub fn rejecting(current: u64, required: u64) -> Self {
            Self::new(MockBehavior::Reject {
                current: EngineVersion::new(current),
                required: EngineVersion::new(required),
            })
        }
        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
        pub fn calls(&self) -> Vec<EngineVersion> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VersionGuard for MockVersionGuard {
        async fn current_version(&self) -> Result<EngineVersion> {
            match self.behavior.lock().unwrap().clone() {
                MockBehavior::Installed(v) => Ok(v),
                MockBehavior::Reject { current, .. } => Ok(current),
                MockBehavior::Unavailable(msg) => Err(ProvisionError::VersionUnavailable(msg)),
            }
        }

        async fn require_minimum_version(&self, minimum: EngineVersion) -> Result<()> {
            self.calls.lock().unwrap().push(minimum);

            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockBehavior::Installed(current) => check_minimum(current, minimum),
                MockBehavior::Reject { current, required } => {
                    Err(ProvisionError::OutdatedEngineVersion { current, required })
                }
                MockBehavior::Unavailable(msg) => Err(ProvisionError::VersionUnavailable(msg)),
            }
        }
    }
}
