// Key File Source Port
// Supplies the sync job with downloaded, not-yet-provided key files.
use crate::domain::KeyFileBatch;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait KeyFileSource: Send + Sync {
    /// Key files waiting to be provided, in provisioning order
    async fn pending(&self) -> Result<KeyFileBatch>;

    /// Acknowledge a forwarded batch so it is not offered again
    async fn mark_provided(&self, batch: &KeyFileBatch) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::ProvisionError;
    use std::sync::{Arc, Mutex};

    /// In-memory key file source
    pub struct MockKeyFileSource {
        pending: Arc<Mutex<KeyFileBatch>>,
        provided: Arc<Mutex<Vec<KeyFileBatch>>>,
        fail: Arc<Mutex<Option<String>>>,
        ack_fail: Arc<Mutex<Option<String>>>,
    }

    impl MockKeyFileSource {
        pub fn new(pending: KeyFileBatch) -> Self {
            Self {
                pending: Arc::new(Mutex::new(pending)),
                provided: Arc::new(Mutex::new(Vec::new())),
                fail: Arc::new(Mutex::new(None)),
                ack_fail: Arc::new(Mutex::new(None)),
            }
        }
        pub fn set_pending(&self, pending: KeyFileBatch) {
            *self.pending.lock().unwrap() = pending;
        }
        pub fn set_failure(&self, message: Option<String>) {
            *self.fail.lock().unwrap() = message;
        }
        /// Make `mark_provided` fail with this message
        pub fn set_ack_failure(&self, message: Option<String>) {
            *self.ack_fail.lock().unwrap() = message;
        }
        pub fn provided(&self) -> Vec<KeyFileBatch> {
            self.provided.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl KeyFileSource for MockKeyFileSource {
        async fn pending(&self) -> Result<KeyFileBatch> {
            if let Some(msg) = self.fail.lock().unwrap().clone() {
                return Err(ProvisionError::Source(msg));
            }
            Ok(self.pending.lock().unwrap().clone())
        }

        async fn mark_provided(&self, batch: &KeyFileBatch) -> Result<()> {
            if let Some(msg) = self.ack_fail.lock().unwrap().clone() {
                return Err(ProvisionError::Source(msg));
            }
            self.provided.lock().unwrap().push(batch.clone());
            // Provided files are no longer pending
            let mut pending = self.pending.lock().unwrap();
            let remaining: Vec<_> = pending
                .iter()
                .filter(|f| !batch.files().contains(f))
                .cloned()
                .collect();
            *pending = KeyFileBatch::new(remaining);
            Ok(())
        }
    }
}
