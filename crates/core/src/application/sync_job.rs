// Key Sync Job - inbound caller of the provider, once per sync cycle

use crate::application::provider::DiagnosisKeyProvider;
use crate::application::shutdown::ShutdownToken;
use crate::domain::ProvisionOutcome;
use crate::error::{ProvisionError, Result};
use crate::port::KeyFileSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// What one sync cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub outcome: ProvisionOutcome,
    pub pending_files: usize,
}

/// Periodic background job feeding pending key files to the provider
///
/// Retry policy lives here: a failed or denied cycle is simply tried
/// again on the next tick with whatever is pending then.
pub struct KeySyncJob {
    source: Arc<dyn KeyFileSource>,
    provider: Arc<DiagnosisKeyProvider>,
    period: Duration,
}

impl KeySyncJob {
    /// Create a new sync job
    ///
    /// # Arguments
    /// * `source` - Where downloaded key files come from
    /// * `provider` - Gate in front of the matching engine
    /// * `period` - Time between sync cycles
    pub fn new(
        source: Arc<dyn KeyFileSource>,
        provider: Arc<DiagnosisKeyProvider>,
        period: Duration,
    ) -> Self {
        Self {
            source,
            provider,
            period,
        }
    }

    /// Run a single sync cycle
    ///
    /// Forwarded batches are acknowledged at the source; denied ones stay
    /// pending for the next cycle. A failed acknowledgement is only logged:
    /// the batch already went out and its quota unit is spent.
    pub async fn run_once(&self) -> Result<SyncReport> {
        let batch = self.source.pending().await?;
        let pending_files = batch.len();

        let outcome = self.provider.provide_diagnosis_keys(batch.clone()).await?;

        if let ProvisionOutcome::Forwarded { .. } = outcome {
            if let Err(e) = self.source.mark_provided(&batch).await {
                warn!(
                    files = pending_files,
                    error = %e,
                    "Batch forwarded but not acknowledged at source"
                );
            }
        }

        Ok(SyncReport {
            outcome,
            pending_files,
        })
    }

    /// Run sync loop until shutdown (background task)
    ///
    /// The first cycle runs immediately. Shutdown is only observed between
    /// cycles, never in the middle of one.
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            period_secs = self.period.as_secs(),
            required_version = %self.provider.required_version(),
            "Key sync job started"
        );

        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            tokio::select! {
                _ = tick.tick() => {},
                _ = shutdown.wait() => {
                    info!("Key sync job interrupted while waiting");
                    break;
                }
            }

            match self.run_once().await {
                Ok(report) => {
                    info!(
                        outcome = %report.outcome,
                        pending_files = report.pending_files,
                        "Sync cycle completed"
                    );
                }
                Err(ProvisionError::OutdatedEngineVersion { current, required }) => {
                    error!(
                        current = %current,
                        required = %required,
                        "Matching engine is outdated, update required"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Sync cycle failed, retrying next cycle");
                }
            }
        }

        info!("Key sync job stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::{EngineVersion, KeyFileBatch};
    use crate::port::key_file_source::mocks::MockKeyFileSource;
    use crate::port::matching_client::mocks::MockMatchingClient;
    use crate::port::quota_ledger::mocks::MockQuotaLedger;
    use crate::port::version_guard::mocks::MockVersionGuard;

    fn pending_files() -> KeyFileBatch {
        ["inbox/a.zip", "inbox/b.zip"].into_iter().collect()
    }

    struct Fixture {
        source: Arc<MockKeyFileSource>,
        guard: Arc<MockVersionGuard>,
        quota: Arc<MockQuotaLedger>,
        client: Arc<MockMatchingClient>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                source: Arc::new(MockKeyFileSource::new(pending_files())),
                guard: Arc::new(MockVersionGuard::installed(EngineVersion::V1_7)),
                quota: Arc::new(MockQuotaLedger::granting()),
                client: Arc::new(MockMatchingClient::new_success()),
            }
        }

        fn job(&self, period: Duration) -> KeySyncJob {
            let provider = Arc::new(DiagnosisKeyProvider::new(
                self.guard.clone(),
                self.quota.clone(),
                self.client.clone(),
            ));
            KeySyncJob::new(self.source.clone(), provider, period)
        }
    }

    #[tokio::test]
    async fn test_run_once_forwards_and_acknowledges() {
        let fx = Fixture::new();

        let report = fx.job(Duration::from_secs(60)).run_once().await.unwrap();

        assert_eq!(report.outcome, ProvisionOutcome::Forwarded { files: 2 });
        assert_eq!(report.pending_files, 2);
        assert_eq!(fx.source.provided(), vec![pending_files()]);
        assert_eq!(fx.client.calls(), vec![pending_files()]);
    }

    #[tokio::test]
    async fn test_run_once_denied_keeps_files_pending() {
        let fx = Fixture::new();
        fx.quota.set_grant(false);
        let job = fx.job(Duration::from_secs(60));

        let report = job.run_once().await.unwrap();

        assert_eq!(report.outcome, ProvisionOutcome::QuotaDenied);
        assert!(fx.source.provided().is_empty());

        // Next cycle with quota back
        fx.quota.set_grant(true);
        let report = job.run_once().await.unwrap();
        assert_eq!(report.outcome, ProvisionOutcome::Forwarded { files: 2 });
        assert_eq!(fx.quota.calls(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_run_once_ack_failure_still_reports_forwarded() {
        let fx = Fixture::new();
        fx.source
            .set_ack_failure(Some("provided dir unwritable".to_string()));

        let report = fx.job(Duration::from_secs(60)).run_once().await.unwrap();

        assert_eq!(report.outcome, ProvisionOutcome::Forwarded { files: 2 });
        assert_eq!(fx.quota.calls(), vec![1]);
        assert_eq!(fx.client.call_count(), 1);
        assert!(fx.source.provided().is_empty());
    }

    #[tokio::test]
    async fn test_run_once_nothing_pending() {
        let fx = Fixture::new();
        fx.source.set_pending(KeyFileBatch::empty());

        let report = fx.job(Duration::from_secs(60)).run_once().await.unwrap();

        assert_eq!(report.outcome, ProvisionOutcome::EmptyBatch);
        assert!(fx.source.provided().is_empty());
        assert_eq!(fx.quota.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_once_source_failure() {
        let fx = Fixture::new();
        fx.source.set_failure(Some("inbox unreadable".to_string()));

        let result = fx.job(Duration::from_secs(60)).run_once().await;

        assert!(matches!(result, Err(ProvisionError::Source(_))));
        assert_eq!(fx.guard.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let fx = Fixture::new();
        let job = Arc::new(fx.job(Duration::from_millis(10)));
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        let handle = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.shutdown();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sync job should stop after shutdown")
            .unwrap();

        // First cycle forwarded, later cycles found nothing pending
        assert_eq!(fx.client.call_count(), 1);
        assert_eq!(fx.source.provided(), vec![pending_files()]);
    }

    #[tokio::test]
    async fn test_run_survives_outdated_engine() {
        let fx = Fixture::new();
        fx.guard.set_behavior(
            crate::port::version_guard::mocks::MockBehavior::Installed(EngineVersion::V1_5),
        );
        let job = Arc::new(fx.job(Duration::from_millis(10)));
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        let handle = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sync job should stop after shutdown")
            .unwrap();

        assert!(fx.guard.call_count() >= 2, "Loop should keep cycling");
        assert_eq!(fx.quota.call_count(), 0);
        assert_eq!(fx.client.started_count(), 0);
    }
}
