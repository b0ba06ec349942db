use sqlx::types::Json;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::models::{AnswerRecord, Attempt, SnapshotQuestion};
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, quiz_id, user_id, status, started_at, expires_at, finished_at, \
    auto_submitted, question_snapshot, answers, score, total_questions, \
    created_at, updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: OffsetDateTime,
    pub(crate) expires_at: Option<OffsetDateTime>,
    pub(crate) question_snapshot: &'a [SnapshotQuestion],
    pub(crate) total_questions: i32,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn has_finished(
    pool: &PgPool,
    quiz_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let existing: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM attempts WHERE quiz_id = $1 AND user_id = $2 AND status = $3 LIMIT 1",
    )
    .bind(quiz_id)
    .bind(user_id)
    .bind(AttemptStatus::Finished)
    .fetch_optional(pool)
    .await?;

    Ok(existing.is_some())
}

pub(crate) async fn create(
    pool: &PgPool,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempts (
            id, quiz_id, user_id, status, started_at, expires_at,
            auto_submitted, question_snapshot, answers, score, total_questions,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,FALSE,$7,$8,0,$9,$10,$11)
        ON CONFLICT DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.quiz_id)
    .bind(attempt.user_id)
    .bind(attempt.status)
    .bind(attempt.started_at)
    .bind(attempt.expires_at)
    .bind(Json(attempt.question_snapshot))
    .bind(Json(Vec::<AnswerRecord>::new()))
    .bind(attempt.total_questions)
    .bind(attempt.created_at)
    .bind(attempt.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the answer set, but only while the attempt is still open. The
/// status guard is the write-side lock: a save racing a finalize loses here
/// instead of corrupting a terminal record.
pub(crate) async fn save_answers_if_in_progress(
    pool: &PgPool,
    id: &str,
    answers: &[AnswerRecord],
    now: OffsetDateTime,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE attempts
         SET answers = $1,
             updated_at = $2
         WHERE id = $3 AND status = $4",
    )
    .bind(Json(answers))
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(updated.rows_affected() > 0)
}

pub(crate) struct FinalizeAttempt<'a> {
    pub(crate) status: AttemptStatus,
    pub(crate) finished_at: OffsetDateTime,
    pub(crate) auto_submitted: bool,
    pub(crate) answers: &'a [AnswerRecord],
    pub(crate) score: i32,
}

/// The single atomic transition out of `in_progress`. Zero rows affected
/// means another finalizer already won the race.
pub(crate) async fn finalize_if_in_progress(
    pool: &PgPool,
    id: &str,
    update: FinalizeAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE attempts
         SET status = $1,
             finished_at = $2,
             auto_submitted = $3,
             answers = $4,
             score = $5,
             updated_at = $2
         WHERE id = $6 AND status = $7",
    )
    .bind(update.status)
    .bind(update.finished_at)
    .bind(update.auto_submitted)
    .bind(Json(update.answers))
    .bind(update.score)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(updated.rows_affected() > 0)
}

pub(crate) async fn list_expired(
    pool: &PgPool,
    now: OffsetDateTime,
    limit: i64,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts
         WHERE status = $1 AND expires_at IS NOT NULL AND expires_at <= $2
         ORDER BY expires_at
         LIMIT $3"
    ))
    .bind(AttemptStatus::InProgress)
    .bind(now)
    .bind(limit.max(1))
    .fetch_all(pool)
    .await
}
