use crate::db::models::ExamResponse;

const COLUMNS: &str = "\
    id, attempt_id, question_id, response, score, is_correct, feedback, needs_review, \
    created_at, updated_at";

pub(crate) struct UpsertBatch {
    pub(crate) ids: Vec<String>,
    pub(crate) question_ids: Vec<String>,
    pub(crate) responses: Vec<Option<String>>,
}

pub(crate) struct ResponseGrade<'a> {
    pub(crate) question_id: &'a str,
    pub(crate) score: f64,
    pub(crate) is_correct: bool,
    pub(crate) feedback: Option<&'a str>,
    pub(crate) needs_review: bool,
}

pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<ExamResponse>, sqlx::Error> {
    sqlx::query_as::<_, ExamResponse>(&format!(
        "SELECT {COLUMNS} FROM exam_responses WHERE attempt_id = $1 ORDER BY created_at, id"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// One statement for the whole batch; rows are keyed by (attempt, question).
pub(crate) async fn upsert_batch(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    batch: UpsertBatch,
    now: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO exam_responses (
            id, attempt_id, question_id, response, created_at, updated_at
         )
         SELECT input.id, $1, input.question_id, input.response, $5, $5
         FROM UNNEST($2::varchar[], $3::varchar[], $4::text[])
              AS input(id, question_id, response)
         ON CONFLICT (attempt_id, question_id)
         DO UPDATE SET response = EXCLUDED.response, updated_at = EXCLUDED.updated_at",
    )
    .bind(attempt_id)
    .bind(batch.ids)
    .bind(batch.question_ids)
    .bind(batch.responses)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn write_grade(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    grade: ResponseGrade<'_>,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exam_responses
         SET score = $1,
             is_correct = $2,
             feedback = $3,
             needs_review = $4,
             updated_at = $5
         WHERE attempt_id = $6 AND question_id = $7",
    )
    .bind(grade.score)
    .bind(grade.is_correct)
    .bind(grade.feedback)
    .bind(grade.needs_review)
    .bind(now)
    .bind(attempt_id)
    .bind(grade.question_id)
    .execute(executor)
    .await?;
    Ok(())
}
