use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::models::{AnswerRecord, Attempt};
use crate::repositories;
use crate::store::{AttemptStore, FinalizeRecord, StoreError};

#[derive(Clone)]
pub(crate) struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn insert(&self, attempt: Attempt) -> Result<bool, StoreError> {
        let created = repositories::attempts::create(
            &self.pool,
            repositories::attempts::CreateAttempt {
                id: &attempt.id,
                quiz_id: &attempt.quiz_id,
                user_id: &attempt.user_id,
                status: attempt.status,
                started_at: attempt.started_at,
                expires_at: attempt.expires_at,
                question_snapshot: &attempt.question_snapshot.0,
                total_questions: attempt.total_questions,
                created_at: attempt.created_at,
                updated_at: attempt.updated_at,
            },
        )
        .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Attempt>, StoreError> {
        Ok(repositories::attempts::find_by_id(&self.pool, id).await?)
    }

    async fn has_finished_attempt(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(repositories::attempts::has_finished(&self.pool, quiz_id, user_id).await?)
    }

    async fn save_answers_if_in_progress(
        &self,
        id: &str,
        answers: Vec<AnswerRecord>,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        Ok(repositories::attempts::save_answers_if_in_progress(&self.pool, id, &answers, now)
            .await?)
    }

    async fn finalize_if_in_progress(
        &self,
        id: &str,
        record: FinalizeRecord,
    ) -> Result<bool, StoreError> {
        Ok(repositories::attempts::finalize_if_in_progress(
            &self.pool,
            id,
            repositories::attempts::FinalizeAttempt {
                status: record.status,
                finished_at: record.finished_at,
                auto_submitted: record.auto_submitted,
                answers: &record.answers,
                score: record.score,
            },
        )
        .await?)
    }

    async fn list_expired(
        &self,
        now: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Attempt>, StoreError> {
        Ok(repositories::attempts::list_expired(&self.pool, now, limit).await?)
    }
}
