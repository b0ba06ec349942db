use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::Clock;
use crate::services::attempts::AttemptService;
use crate::services::errors::AttemptError;
use crate::services::FinalizeTrigger;
use crate::store::AttemptStore;


#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SweepOutcome {
    pub(crate) selected: usize,
    pub(crate) closed: usize,
    pub(crate) conflicts: usize,
    pub(crate) failures: usize,
}

/// Force-finalizes attempts whose deadline has passed, through the same
/// conditional-write path as a normal submit. Each attempt is handled
/// independently; one failure never aborts the batch.
pub(crate) struct ExpirySweeper {
    service: AttemptService,
    store: Arc<dyn AttemptStore>,
    clock: Arc<dyn Clock>,
    batch_size: i64,
}

impl ExpirySweeper {
    pub(crate) fn new(
        service: AttemptService,
        store: Arc<dyn AttemptStore>,
        clock: Arc<dyn Clock>,
        batch_size: i64,
    ) -> Self {
        Self { service, store, clock, batch_size }
    }

    pub(crate) fn from_state(state: &AppState) -> Self {
        Self::new(
            state.attempts().clone(),
            Arc::clone(state.store()),
            Arc::clone(state.clock()),
            state.settings().sweeper().sweep_batch_size as i64,
        )
    }

    pub(crate) async fn sweep_once(&self) -> Result<SweepOutcome> {
        let now = self.clock.now();
        let overdue = self
            .store
            .list_expired(now, self.batch_size)
            .await
            .context("Failed to list overdue attempts")?;

        let mut outcome = SweepOutcome { selected: overdue.len(), ..SweepOutcome::default() };

        for attempt in overdue {
            match self.service.finalize(&attempt.id, None, FinalizeTrigger::Expiry).await {
                Ok(_) => outcome.closed += 1,
                // Another finalizer won the conditional write; nothing to do.
                Err(AttemptError::Conflict(_)) => {
                    outcome.conflicts += 1;
                    tracing::debug!(
                        attempt_id = %attempt.id,
                        "Overdue attempt already finalized"
                    );
                }
                Err(err) => {
                    outcome.failures += 1;
                    tracing::error!(
                        attempt_id = %attempt.id,
                        quiz_id = %attempt.quiz_id,
                        error = %err,
                        "Failed to force-finalize overdue attempt"
                    );
                }
            }
        }

        if outcome.selected > 0 {
            tracing::info!(
                selected = outcome.selected,
                closed = outcome.closed,
                conflicts = outcome.conflicts,
                failures = outcome.failures,
                "Closed expired attempts"
            );
        }
        metrics::counter!("expired_attempts_closed_total").increment(outcome.closed as u64);

        Ok(outcome)
    }
}
