use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::api::pagination::clamp_page;
use crate::db::models::{Attempt, AttemptAnswer};
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, quiz_id, course_id, learner_id, status, started_at, expires_at, submitted_at, \
    time_spent_seconds, score, is_passed, answers, definition, definition_digest, \
    presentation, created_at, updated_at";

/// Scope and paging for attempt listings. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttemptFilter {
    pub(crate) quiz_id: Option<String>,
    pub(crate) learner_id: Option<String>,
    pub(crate) course_owner_id: Option<String>,
    pub(crate) status: Option<AttemptStatus>,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FinishAttempt<'a> {
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) time_spent_seconds: i64,
    pub(crate) score: i32,
    pub(crate) is_passed: bool,
    pub(crate) answers: &'a [AttemptAnswer],
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    learner_id: &str,
    quiz_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts \
         WHERE learner_id = $1 AND quiz_id = $2 AND status = $3"
    ))
    .bind(learner_id)
    .bind(quiz_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    learner_id: &str,
    quiz_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM quiz_attempts \
         WHERE learner_id = $1 AND quiz_id = $2 AND status = $3",
    )
    .bind(learner_id)
    .bind(quiz_id)
    .bind(AttemptStatus::Submitted)
    .fetch_one(executor)
    .await
}

/// Inserts a new in-progress attempt. Returns `false` when the partial unique
/// index on `(learner_id, quiz_id)` already holds an unfinished attempt.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: &Attempt,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO quiz_attempts (
            id, quiz_id, course_id, learner_id, status, started_at, expires_at,
            answers, definition, definition_digest, presentation, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
        ON CONFLICT DO NOTHING",
    )
    .bind(&attempt.id)
    .bind(&attempt.quiz_id)
    .bind(&attempt.course_id)
    .bind(&attempt.learner_id)
    .bind(attempt.status)
    .bind(attempt.started_at)
    .bind(attempt.expires_at)
    .bind(&attempt.answers)
    .bind(&attempt.definition)
    .bind(&attempt.definition_digest)
    .bind(&attempt.presentation)
    .bind(attempt.created_at)
    .bind(attempt.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn finish_if_in_progress(
    pool: &PgPool,
    id: &str,
    outcome: FinishAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quiz_attempts
         SET status = $1,
             submitted_at = $2,
             time_spent_seconds = $3,
             score = $4,
             is_passed = $5,
             answers = $6,
             updated_at = $2
         WHERE id = $7 AND status = $8 AND submitted_at IS NULL",
    )
    .bind(AttemptStatus::Submitted)
    .bind(outcome.submitted_at)
    .bind(outcome.time_spent_seconds)
    .bind(outcome.score)
    .bind(outcome.is_passed)
    .bind(Json(outcome.answers))
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn expire_if_in_progress(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quiz_attempts SET status = $1, updated_at = $2 \
         WHERE id = $3 AND status = $4 AND submitted_at IS NULL",
    )
    .bind(AttemptStatus::Expired)
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete_if_in_progress(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM quiz_attempts WHERE id = $1 AND status = $2 AND submitted_at IS NULL",
    )
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a AttemptFilter) {
    builder.push(" WHERE TRUE");

    if let Some(quiz_id) = &filter.quiz_id {
        builder.push(" AND quiz_id = ");
        builder.push_bind(quiz_id);
    }
    if let Some(learner_id) = &filter.learner_id {
        builder.push(" AND learner_id = ");
        builder.push_bind(learner_id);
    }
    if let Some(owner_id) = &filter.course_owner_id {
        builder.push(" AND course_id IN (SELECT id FROM courses WHERE owner_id = ");
        builder.push_bind(owner_id);
        builder.push(")");
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
}

pub(crate) async fn list(pool: &PgPool, filter: &AttemptFilter) -> Result<Vec<Attempt>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM quiz_attempts"));
    push_filter(&mut builder, filter);

    let (skip, limit) = clamp_page(filter.skip, filter.limit);
    builder.push(" ORDER BY started_at DESC, id OFFSET ");
    builder.push_bind(skip);
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<Attempt>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &AttemptFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM quiz_attempts");
    push_filter(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}
