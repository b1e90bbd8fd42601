// Exposure-Matching Engine Port
// The engine itself is external: only the hand-off contract lives here.
use crate::domain::KeyFileBatch;
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by the matching engine hand-off
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchingError {
    #[error("Matching engine rejected batch: {0}")]
    Rejected(String),

    #[error("Matching engine unavailable: {0}")]
    Unavailable(String),

    #[error("Matching engine IO error: {0}")]
    Io(String),
}

/// Client of the platform exposure-matching engine
#[async_trait]
pub trait ExposureMatchingClient: Send + Sync {
    /// Hand the whole batch to the engine as one request
    ///
    /// # Errors
    /// Any engine-side failure. Callers surface it unchanged.
    async fn provide_diagnosis_keys(&self, batch: &KeyFileBatch) -> Result<(), MatchingError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Mock matching client recording every batch it completed
    pub struct MockMatchingClient {
        failure: Arc<Mutex<Option<MatchingError>>>,
        calls: Arc<Mutex<Vec<KeyFileBatch>>>,
        started: Arc<Mutex<usize>>,
        gate: Option<Arc<Notify>>,
        panic_message: Option<String>,
    }

    impl MockMatchingClient {
        pub fn new_success() -> Self {
            Self {
                failure: Arc::new(Mutex::new(None)),
                calls: Arc::new(Mutex::new(Vec::new())),
                started: Arc::new(Mutex::new(0)),
                gate: None,
                panic_message: None,
            }
        }
        pub fn new_fail(error: MatchingError) -> Self {
            let client = Self::new_success();
            *client.failure.lock().unwrap() = Some(error);
            client
        }
        /// Hold every call open until `gate` is notified
        pub fn new_gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new_success()
            }
        }
        /// Panic inside every call (for panic propagation testing)
        pub fn new_panicking(message: impl Into<String>) -> Self {
            Self {
                panic_message: Some(message.into()),
                ..Self::new_success()
            }
        }
        /// Calls that entered the client, finished or not
        pub fn started_count(&self) -> usize {
            *self.started.lock().unwrap()
        }
        /// Calls that ran to completion
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
        pub fn calls(&self) -> Vec<KeyFileBatch> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExposureMatchingClient for MockMatchingClient {
        async fn provide_diagnosis_keys(
            &self,
            batch: &KeyFileBatch,
        ) -> Result<(), MatchingError> {
            *self.started.lock().unwrap() += 1;

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            if let Some(msg) = &self.panic_message {
                panic!("{}", msg);
            }

            self.calls.lock().unwrap().push(batch.clone());

            let failure = self.failure.lock().unwrap().clone();
            match failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }
}
