// Daily submission quota (in-memory QuotaLedger)
// reason: the platform caps key provisioning per UTC day
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use keygate_core::port::{QuotaLedger, TimeProvider};

/// Fixed number of provisioning attempts per UTC calendar day
///
/// The counter resets on the first request of a new UTC day. State lives in
/// memory only; a restart starts a fresh period.
pub struct DailySubmissionQuota {
    time_provider: Arc<dyn TimeProvider>,
    daily_limit: u32,
    state: Mutex<QuotaState>,
}

struct QuotaState {
    period: NaiveDate,
    remaining: u32,
}

impl DailySubmissionQuota {
    /// Create a new daily quota
    ///
    /// # Arguments
    /// * `time_provider` - Clock deciding the current UTC day
    /// * `daily_limit` - Units granted per UTC day
    pub fn new(time_provider: Arc<dyn TimeProvider>, daily_limit: u32) -> Self {
        let period = time_provider.now_utc().date_naive();
        Self {
            time_provider,
            daily_limit,
            state: Mutex::new(QuotaState {
                period,
                remaining: daily_limit,
            }),
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Lock state, starting a new period first if the UTC day changed
    fn current_state(&self) -> std::sync::MutexGuard<'_, QuotaState> {
        // Counters are plain integers, a poisoned lock still holds valid state
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let today = self.time_provider.now_utc().date_naive();
        if today != state.period {
            info!(
                previous = %state.period,
                today = %today,
                daily_limit = self.daily_limit,
                "Submission quota reset for new day"
            );
            state.period = today;
            state.remaining = self.daily_limit;
        }
        state
    }
}

#[async_trait]
impl QuotaLedger for DailySubmissionQuota {
    async fn consume_quota(&self, units: u32) -> bool {
        let mut state = self.current_state();

        if units > state.remaining {
            debug!(
                requested = units,
                remaining = state.remaining,
                "Submission quota denied"
            );
            return false;
        }

        state.remaining -= units;
        debug!(
            consumed = units,
            remaining = state.remaining,
            "Submission quota consumed"
        );
        true
    }

    async fn remaining(&self) -> u32 {
        self.current_state().remaining
    }
}
