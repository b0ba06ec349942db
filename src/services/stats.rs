use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::repositories;
use crate::store::StoreError;

#[derive(Debug, Clone)]
pub(crate) struct StatsDelta {
    pub(crate) user_id: String,
    pub(crate) score_delta: i64,
    pub(crate) attempt_delta: i64,
}

/// Sink for the aggregate-points side effect of a finalize. Increments must
/// be commutative; ordering between concurrent finalizes is irrelevant.
#[async_trait]
pub(crate) trait StatsSink: Send + Sync {
    async fn increment(&self, delta: StatsDelta) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub(crate) struct PgStatsSink {
    pool: PgPool,
}

impl PgStatsSink {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsSink for PgStatsSink {
    async fn increment(&self, delta: StatsDelta) -> Result<(), StoreError> {
        repositories::user_stats::increment(
            &self.pool,
            &delta.user_id,
            delta.score_delta,
            delta.attempt_delta,
            OffsetDateTime::now_utc(),
        )
        .await?;
        Ok(())
    }
}

/// Fire-and-forget dispatch, detached from the finalize response. A failure
/// here is logged and counted, never surfaced to the caller.
pub(crate) fn dispatch_increment(sink: Arc<dyn StatsSink>, delta: StatsDelta) {
    tokio::spawn(async move {
        let user_id = delta.user_id.clone();
        if let Err(err) = sink.increment(delta).await {
            metrics::counter!("stats_increment_failures_total").increment(1);
            tracing::error!(user_id = %user_id, error = %err, "Failed to apply stats increment");
        }
    });
}
