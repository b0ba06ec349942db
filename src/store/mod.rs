//! Persistence contract for attempts. The two `*_if_in_progress` writes are
//! conditional updates guarded on the current status; they are the only
//! mechanism that keeps concurrent submits, saves and sweeps race-free.

pub(crate) mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::db::models::{AnswerRecord, Attempt};
use crate::db::types::AttemptStatus;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FinalizeRecord {
    pub(crate) status: AttemptStatus,
    pub(crate) finished_at: OffsetDateTime,
    pub(crate) auto_submitted: bool,
    pub(crate) answers: Vec<AnswerRecord>,
    pub(crate) score: i32,
}

#[async_trait]
pub(crate) trait AttemptStore: Send + Sync {
    /// Insert a fresh attempt; `false` when the id already exists.
    async fn insert(&self, attempt: Attempt) -> Result<bool, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Attempt>, StoreError>;

    async fn has_finished_attempt(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError>;

    /// Conditional write: replaces the answer set iff the attempt is still
    /// `in_progress`. `false` means the guard failed.
    async fn save_answers_if_in_progress(
        &self,
        id: &str,
        answers: Vec<AnswerRecord>,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError>;

    /// Conditional write: the one atomic transition out of `in_progress`.
    /// `false` means another finalizer already moved the attempt.
    async fn finalize_if_in_progress(
        &self,
        id: &str,
        record: FinalizeRecord,
    ) -> Result<bool, StoreError>;

    /// Bounded batch of open attempts whose deadline has passed.
    async fn list_expired(
        &self,
        now: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Attempt>, StoreError>;
}
