use sqlx::PgPool;

use crate::db::models::ExamAttempt;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, user_id, started_at, submitted_at, score, graded, needs_review, \
    created_at, updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) started_at: time::PrimitiveDateTime,
}

pub(crate) struct RecordGrade {
    pub(crate) score: f64,
    pub(crate) needs_review: bool,
    pub(crate) graded_at: time::PrimitiveDateTime,
}

/// Serializes attempt creation per (exam, user) until the transaction ends.
pub(crate) async fn acquire_exam_user_lock(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
        .bind(exam_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(attempt_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_unsubmitted(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE exam_id = $1 AND user_id = $2 AND submitted_at IS NULL"
    ))
    .bind(exam_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_by_exam_and_user(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_attempts WHERE exam_id = $1 AND user_id = $2")
        .bind(exam_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_by_exam_and_user(
    pool: &PgPool,
    exam_id: &str,
    user_id: &str,
) -> Result<Vec<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE exam_id = $1 AND user_id = $2
         ORDER BY started_at DESC, id"
    ))
    .bind(exam_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Returns `None` when the partial unique index already holds an
/// in-progress attempt for the pair.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAttempt<'_>,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "INSERT INTO exam_attempts (id, exam_id, user_id, started_at, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$4,$4)
         ON CONFLICT DO NOTHING
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.user_id)
    .bind(params.started_at)
    .fetch_optional(executor)
    .await
}

/// Blocks concurrent submission until the caller's transaction ends.
/// Returns the `submitted_at` seen under the lock, or `None` for unknown ids.
pub(crate) async fn lock_for_share(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Option<Option<time::PrimitiveDateTime>>, sqlx::Error> {
    sqlx::query_scalar("SELECT submitted_at FROM exam_attempts WHERE id = $1 FOR SHARE")
        .bind(attempt_id)
        .fetch_optional(executor)
        .await
}

/// Conditional transition to submitted. Saves are refused from here on and
/// the attempt stays flagged for review until its grade is recorded. `None`
/// means another caller got there first.
pub(crate) async fn close(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    submitted_at: time::PrimitiveDateTime,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "UPDATE exam_attempts
         SET submitted_at = $1,
             needs_review = TRUE,
             updated_at = $1
         WHERE id = $2 AND submitted_at IS NULL
         RETURNING {COLUMNS}",
    ))
    .bind(submitted_at)
    .bind(attempt_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn record_grade(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    params: RecordGrade,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "UPDATE exam_attempts
         SET score = $1,
             graded = TRUE,
             needs_review = $2,
             updated_at = $3
         WHERE id = $4 AND submitted_at IS NOT NULL
         RETURNING {COLUMNS}",
    ))
    .bind(params.score)
    .bind(params.needs_review)
    .bind(params.graded_at)
    .bind(attempt_id)
    .fetch_one(executor)
    .await
}
