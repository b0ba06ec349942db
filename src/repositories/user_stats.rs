use sqlx::PgPool;
use time::OffsetDateTime;

/// Commutative increment of a user's aggregate totals. Concurrent finalizes
/// for the same user may land in any order; the upsert keeps both.
pub(crate) async fn increment(
    pool: &PgPool,
    user_id: &str,
    score_delta: i64,
    attempt_delta: i64,
    now: OffsetDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_stats (user_id, total_points, attempts_finished, updated_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id) DO UPDATE
         SET total_points = user_stats.total_points + EXCLUDED.total_points,
             attempts_finished = user_stats.attempts_finished + EXCLUDED.attempts_finished,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(user_id)
    .bind(score_delta)
    .bind(attempt_delta)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}
