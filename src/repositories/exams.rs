use sqlx::PgPool;

use crate::db::models::Exam;

pub(crate) const COLUMNS: &str = "\
    id, organization_id, title, description, time_limit_minutes, passing_score, \
    randomize_order, published_at, start_date, end_date, allowed_attempts, \
    created_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamSummaryRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) published_at: Option<time::PrimitiveDateTime>,
    pub(crate) start_date: Option<time::PrimitiveDateTime>,
    pub(crate) end_date: Option<time::PrimitiveDateTime>,
    pub(crate) allowed_attempts: Option<i32>,
    pub(crate) question_count: i64,
    pub(crate) total_points: f64,
    pub(crate) created_at: time::PrimitiveDateTime,
}

/// Scalar exam fields shared by create and full update.
pub(crate) struct ExamFields<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) passing_score: Option<f64>,
    pub(crate) randomize_order: bool,
    pub(crate) start_date: Option<time::PrimitiveDateTime>,
    pub(crate) end_date: Option<time::PrimitiveDateTime>,
    pub(crate) allowed_attempts: Option<i32>,
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) organization_id: &'a str,
    pub(crate) fields: ExamFields<'a>,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    let fields = params.fields;
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, organization_id, title, description, time_limit_minutes, passing_score,
            randomize_order, start_date, end_date, allowed_attempts, created_by,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$12)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.organization_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.time_limit_minutes)
    .bind(fields.passing_score)
    .bind(fields.randomize_order)
    .bind(fields.start_date)
    .bind(fields.end_date)
    .bind(fields.allowed_attempts)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// Organization-scoped lookup; ids from another tenant resolve to `None`.
pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    organization_id: &str,
    exam_id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE id = $1 AND organization_id = $2"
    ))
    .bind(exam_id)
    .bind(organization_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_summaries(
    pool: &PgPool,
    organization_id: &str,
    published_only: bool,
) -> Result<Vec<ExamSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamSummaryRow>(
        "SELECT e.id, e.title, e.description, e.time_limit_minutes, e.published_at,
                e.start_date, e.end_date, e.allowed_attempts, e.created_at,
                COUNT(q.id) AS question_count,
                COALESCE(SUM(q.points), 0)::DOUBLE PRECISION AS total_points
         FROM exams e
         LEFT JOIN questions q ON q.exam_id = e.id
         WHERE e.organization_id = $1
           AND ($2 = FALSE OR e.published_at IS NOT NULL)
         GROUP BY e.id
         ORDER BY e.created_at DESC",
    )
    .bind(organization_id)
    .bind(published_only)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    organization_id: &str,
    exam_id: &str,
    fields: ExamFields<'_>,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            title = $1,
            description = $2,
            time_limit_minutes = $3,
            passing_score = $4,
            randomize_order = $5,
            start_date = $6,
            end_date = $7,
            allowed_attempts = $8,
            updated_at = $9
         WHERE id = $10 AND organization_id = $11
         RETURNING {COLUMNS}",
    ))
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.time_limit_minutes)
    .bind(fields.passing_score)
    .bind(fields.randomize_order)
    .bind(fields.start_date)
    .bind(fields.end_date)
    .bind(fields.allowed_attempts)
    .bind(updated_at)
    .bind(exam_id)
    .bind(organization_id)
    .fetch_optional(executor)
    .await
}

/// Returns `None` when the exam is missing or already published.
pub(crate) async fn publish(
    pool: &PgPool,
    organization_id: &str,
    exam_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams
         SET published_at = $1, updated_at = $1
         WHERE id = $2 AND organization_id = $3 AND published_at IS NULL
         RETURNING {COLUMNS}",
    ))
    .bind(now)
    .bind(exam_id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

/// Sections, questions, attempts and responses go with the exam via cascades.
pub(crate) async fn delete_by_id(
    pool: &PgPool,
    organization_id: &str,
    exam_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1 AND organization_id = $2")
        .bind(exam_id)
        .bind(organization_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
