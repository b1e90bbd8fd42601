//! Diagnosis Key Provider - gated hand-off of key files to the matching engine
//!
//! Every attempt runs these steps strictly in order:
//! 1. empty batch: return `EmptyBatch`, touch nothing
//! 2. version guard: failure propagates as-is, nothing else happens
//! 3. quota ledger: one unit per attempt, denial returns `QuotaDenied`
//! 4. matching engine: the whole batch in a single call
//!
//! Steps 3 and 4 run as one spawned task. Once started it finishes even if
//! the caller's future is dropped, so a debited unit always has a matching
//! forwarding attempt. A unit is never reused: every new attempt debits again.

use crate::application::constants::DEFAULT_REQUIRED_ENGINE_VERSION;
use crate::domain::{EngineVersion, KeyFileBatch, ProvisionOutcome, QUOTA_UNITS_PER_ATTEMPT};
use crate::error::{ProvisionError, Result};
use crate::port::{ExposureMatchingClient, QuotaLedger, VersionGuard};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Gate in front of the exposure-matching engine
pub struct DiagnosisKeyProvider {
    version_guard: Arc<dyn VersionGuard>,
    quota_ledger: Arc<dyn QuotaLedger>,
    matching_client: Arc<dyn ExposureMatchingClient>,
    required_version: EngineVersion,
}

impl DiagnosisKeyProvider {
    /// Create a provider requiring `DEFAULT_REQUIRED_ENGINE_VERSION`
    pub fn new(
        version_guard: Arc<dyn VersionGuard>,
        quota_ledger: Arc<dyn QuotaLedger>,
        matching_client: Arc<dyn ExposureMatchingClient>,
    ) -> Self {
        Self {
            version_guard,
            quota_ledger,
            matching_client,
            required_version: DEFAULT_REQUIRED_ENGINE_VERSION,
        }
    }

    /// Override the minimum engine version
    pub fn with_required_version(mut self, required_version: EngineVersion) -> Self {
        self.required_version = required_version;
        self
    }

    pub fn required_version(&self) -> EngineVersion {
        self.required_version
    }

    /// Provide one batch of key files to the matching engine
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Returns
    /// - `EmptyBatch` for an empty batch
    /// - `Forwarded` once the engine accepted the whole batch
    /// - `QuotaDenied` when no quota unit was left
    ///
    /// # Errors
    /// - `ProvisionError::OutdatedEngineVersion` / `VersionUnavailable` from the guard
    /// - `ProvisionError::Matching` with the engine's own error
    /// - `ProvisionError::Aborted` if the runtime cancelled the hand-off task
    pub async fn provide_diagnosis_keys(&self, batch: KeyFileBatch) -> Result<ProvisionOutcome> {
        if batch.is_empty() {
            debug!("Empty key file batch, nothing to provide");
            return Ok(ProvisionOutcome::EmptyBatch);
        }

        if let Err(e) = self
            .version_guard
            .require_minimum_version(self.required_version)
            .await
        {
            warn!(
                required = %self.required_version,
                error = %e,
                "Engine version check failed, batch not provided"
            );
            return Err(e);
        }

        let handle = tokio::spawn(debit_and_forward(
            Arc::clone(&self.quota_ledger),
            Arc::clone(&self.matching_client),
            batch,
        ));

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(ProvisionError::Aborted(e.to_string())),
        }
    }
}

/// Quota debit and engine hand-off as one unit of work
async fn debit_and_forward(
    quota_ledger: Arc<dyn QuotaLedger>,
    matching_client: Arc<dyn ExposureMatchingClient>,
    batch: KeyFileBatch,
) -> Result<ProvisionOutcome> {
    if !quota_ledger.consume_quota(QUOTA_UNITS_PER_ATTEMPT).await {
        warn!(files = batch.len(), "Submission quota exhausted, batch not provided");
        return Ok(ProvisionOutcome::QuotaDenied);
    }

    let files = batch.len();
    matching_client.provide_diagnosis_keys(&batch).await?;

    info!(files = files, "Diagnosis keys provided to matching engine");
    Ok(ProvisionOutcome::Forwarded { files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KeyFile;
    use crate::port::matching_client::mocks::MockMatchingClient;
    use crate::port::quota_ledger::mocks::MockQuotaLedger;
    use crate::port::version_guard::mocks::{MockBehavior, MockVersionGuard};
    use crate::port::MatchingError;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn example_key_files() -> KeyFileBatch {
        KeyFileBatch::new(vec![KeyFile::from("file1"), KeyFile::from("file2")])
    }

    struct Fixture {
        guard: Arc<MockVersionGuard>,
        quota: Arc<MockQuotaLedger>,
        client: Arc<MockMatchingClient>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_client(MockMatchingClient::new_success())
        }

        fn with_client(client: MockMatchingClient) -> Self {
            Self {
                guard: Arc::new(MockVersionGuard::installed(EngineVersion::V1_7)),
                quota: Arc::new(MockQuotaLedger::granting()),
                client: Arc::new(client),
            }
        }

        fn provider(&self) -> DiagnosisKeyProvider {
            DiagnosisKeyProvider::new(
                self.guard.clone(),
                self.quota.clone(),
                self.client.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_empty_key_list_short_circuits() {
        let fx = Fixture::new();

        let outcome = fx
            .provider()
            .provide_diagnosis_keys(KeyFileBatch::empty())
            .await
            .unwrap();

        assert_eq!(outcome, ProvisionOutcome::EmptyBatch);
        assert!(outcome.is_provided());
        assert_eq!(fx.guard.call_count(), 0);
        assert_eq!(fx.quota.call_count(), 0);
        assert_eq!(fx.client.started_count(), 0);
    }

    #[tokio::test]
    async fn test_outdated_engine_version_propagates() {
        let fx = Fixture::new();
        fx.guard.set_behavior(MockBehavior::Reject {
            current: EngineVersion::new(9000),
            required: EngineVersion::new(5000),
        });

        let result = fx.provider().provide_diagnosis_keys(example_key_files()).await;

        match result {
            Err(ProvisionError::OutdatedEngineVersion { current, required }) => {
                assert_eq!(current, EngineVersion::new(9000));
                assert_eq!(required, EngineVersion::new(5000));
            }
            other => panic!("Expected OutdatedEngineVersion, got {:?}", other),
        }
        assert_eq!(fx.guard.call_count(), 1);
        assert_eq!(fx.quota.call_count(), 0);
        assert_eq!(fx.client.started_count(), 0);
    }

    #[tokio::test]
    async fn test_version_checked_even_when_quota_exhausted() {
        let fx = Fixture::new();
        fx.quota.set_grant(false);
        fx.guard.set_behavior(MockBehavior::Installed(EngineVersion::V1_6));

        let result = fx.provider().provide_diagnosis_keys(example_key_files()).await;

        assert!(result.unwrap_err().is_outdated_engine());
        assert_eq!(fx.guard.calls(), vec![EngineVersion::V1_7]);
        assert_eq!(fx.quota.call_count(), 0);
    }

    #[tokio::test]
    async fn test_version_unavailable_propagates() {
        let fx = Fixture::new();
        fx.guard
            .set_behavior(MockBehavior::Unavailable("engine not connected".to_string()));

        let result = fx.provider().provide_diagnosis_keys(example_key_files()).await;

        assert!(matches!(result, Err(ProvisionError::VersionUnavailable(_))));
        assert_eq!(fx.quota.call_count(), 0);
        assert_eq!(fx.client.started_count(), 0);
    }

    #[tokio::test]
    async fn test_quota_empty_denies_without_engine_call() {
        let fx = Fixture::new();
        fx.quota.set_grant(false);

        let outcome = fx
            .provider()
            .provide_diagnosis_keys(example_key_files())
            .await
            .unwrap();

        assert_eq!(outcome, ProvisionOutcome::QuotaDenied);
        assert!(!outcome.is_provided());
        assert_eq!(fx.quota.calls(), vec![1]);
        assert_eq!(fx.client.started_count(), 0);
    }

    #[tokio::test]
    async fn test_key_provision_forwards_whole_batch() {
        let fx = Fixture::new();

        let outcome = fx
            .provider()
            .provide_diagnosis_keys(example_key_files())
            .await
            .unwrap();

        assert_eq!(outcome, ProvisionOutcome::Forwarded { files: 2 });
        assert!(bool::from(outcome));
        assert_eq!(fx.quota.calls(), vec![1]);
        // One call with both files, not one call per file
        assert_eq!(fx.client.calls(), vec![example_key_files()]);
    }

    #[tokio::test]
    async fn test_quota_cost_independent_of_batch_size() {
        let fx = Fixture::new();
        let batch: KeyFileBatch = (0..50).map(|i| format!("keys/{}.zip", i)).collect();

        fx.provider().provide_diagnosis_keys(batch.clone()).await.unwrap();

        assert_eq!(fx.quota.calls(), vec![QUOTA_UNITS_PER_ATTEMPT]);
        assert_eq!(fx.client.calls(), vec![batch]);
    }

    #[tokio::test]
    async fn test_required_version_passed_to_guard() {
        let fx = Fixture::new();
        let provider = fx.provider().with_required_version(EngineVersion::V1_5);

        provider
            .provide_diagnosis_keys(example_key_files())
            .await
            .unwrap();

        assert_eq!(provider.required_version(), EngineVersion::V1_5);
        assert_eq!(fx.guard.calls(), vec![EngineVersion::V1_5]);
    }

    #[tokio::test]
    async fn test_engine_failure_propagates_unchanged() {
        let rejection = MatchingError::Rejected("signature mismatch".to_string());
        let fx = Fixture::with_client(MockMatchingClient::new_fail(rejection.clone()));

        let result = fx.provider().provide_diagnosis_keys(example_key_files()).await;

        match result {
            Err(ProvisionError::Matching(err)) => assert_eq!(err, rejection),
            other => panic!("Expected Matching error, got {:?}", other),
        }
        assert_eq!(fx.quota.calls(), vec![1]);
        assert_eq!(fx.client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_forwarding_needs_fresh_debit() {
        let fx = Fixture::with_client(MockMatchingClient::new_fail(MatchingError::Unavailable(
            "busy".to_string(),
        )));
        let provider = fx.provider();

        assert!(provider
            .provide_diagnosis_keys(example_key_files())
            .await
            .is_err());
        assert!(provider
            .provide_diagnosis_keys(example_key_files())
            .await
            .is_err());

        assert_eq!(fx.quota.calls(), vec![1, 1]);
        assert_eq!(fx.client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_each_attempt_consumes_one_unit() {
        let fx = Fixture::new();
        let provider = fx.provider();

        for _ in 0..3 {
            provider
                .provide_diagnosis_keys(example_key_files())
                .await
                .unwrap();
        }
        provider
            .provide_diagnosis_keys(KeyFileBatch::empty())
            .await
            .unwrap();

        assert_eq!(fx.quota.calls(), vec![1, 1, 1]);
        assert_eq!(fx.client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_leak_quota() {
        let gate = Arc::new(Notify::new());
        let fx = Fixture::with_client(MockMatchingClient::new_gated(gate.clone()));
        let provider = fx.provider();

        // Caller gives up while the engine call is still in flight
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            provider.provide_diagnosis_keys(example_key_files()),
        )
        .await;
        assert!(result.is_err(), "Caller should have timed out");
        assert_eq!(fx.quota.calls(), vec![1]);
        assert_eq!(fx.client.started_count(), 1);
        assert_eq!(fx.client.call_count(), 0);

        // The debited unit still gets its forwarding attempt
        gate.notify_one();
        for _ in 0..100 {
            if fx.client.call_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(fx.client.calls(), vec![example_key_files()]);
        assert_eq!(fx.quota.calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_engine_panic_resumes_in_caller() {
        let fx = Fixture::with_client(MockMatchingClient::new_panicking("engine crashed"));
        let provider = Arc::new(fx.provider());

        let caller = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.provide_diagnosis_keys(example_key_files()).await })
        };
        let err = caller.await.unwrap_err();

        assert!(err.is_panic(), "Caller task should panic");
        let payload = err.into_panic();
        let msg = payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_default();
        assert_eq!(msg, "engine crashed");
        assert_eq!(fx.quota.calls(), vec![1]);
        assert_eq!(fx.client.started_count(), 1);
    }

    #[test]
    fn test_runtime_shutdown_maps_to_aborted() {
        let gate = Arc::new(Notify::new());
        let fx = Fixture::with_client(MockMatchingClient::new_gated(gate));
        let provider = fx.provider();
        let mut attempt = Box::pin(provider.provide_diagnosis_keys(example_key_files()));

        // Start the hand-off task on a runtime that is then shut down
        let first = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let pending = first.block_on(async {
            tokio::time::timeout(Duration::from_millis(20), &mut attempt).await
        });
        assert!(pending.is_err(), "Engine call should still be held open");
        assert_eq!(fx.client.started_count(), 1);
        drop(first);

        // The caller outlives it and observes the cancelled task
        let second = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = second.block_on(attempt);

        assert!(
            matches!(result, Err(ProvisionError::Aborted(_))),
            "got {:?}",
            result
        );
        assert_eq!(fx.quota.calls(), vec![1]);
        assert_eq!(fx.client.call_count(), 0);
    }
}
