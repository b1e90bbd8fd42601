// Submission Quota Port
use async_trait::async_trait;

/// Bounded budget of provisioning attempts per accounting period
///
/// The counter and its reset policy belong to the implementation.
/// Implementations must serialize debits so that concurrent callers can
/// never be granted more units than the period allows.
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Try to debit `units` from the current period
    ///
    /// # Returns
    /// true if the units were available and are now debited,
    /// false if not enough remained (nothing is debited)
    async fn consume_quota(&self, units: u32) -> bool;

    /// Units still available in the current period
    async fn remaining(&self) -> u32;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock QuotaLedger with a programmable answer, recording requested units
    pub struct MockQuotaLedger {
        grant: Arc<Mutex<bool>>,
        calls: Arc<Mutex<Vec<u32>>>,
    }

    impl MockQuotaLedger {
        pub fn new(grant: bool) -> Self {
            Self {
                grant: Arc::new(Mutex::new(grant)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn granting() -> Self {
            Self::new(true)
        }
        pub fn denying() -> Self {
            Self::new(false)
        }
        pub fn set_grant(&self, grant: bool) {
            *self.grant.lock().unwrap() = grant;
        }
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
        /// Units requested by each call, in call order
        pub fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuotaLedger for MockQuotaLedger {
        async fn consume_quota(&self, units: u32) -> bool {
            self.calls.lock().unwrap().push(units);
            *self.grant.lock().unwrap()
        }
        async fn remaining(&self) -> u32 {
            if *self.grant.lock().unwrap() {
                u32::MAX
            } else {
                0
            }
        }
    }
}
