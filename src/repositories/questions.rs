use std::collections::BTreeMap;

use sqlx::types::Json;

use crate::db::models::{QuestionKind, QuestionRow};

const COLUMNS: &str = "\
    id, section_id, exam_id, content, question_type, points, order_index, \
    options, correct_answer";

pub(crate) struct QuestionFields<'a> {
    pub(crate) section_id: &'a str,
    pub(crate) content: &'a str,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    pub(crate) kind: &'a QuestionKind,
}

impl QuestionFields<'_> {
    fn options(&self) -> Option<Json<BTreeMap<String, String>>> {
        self.kind.options().cloned().map(Json)
    }
}

pub(crate) async fn list_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<QuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY order_index, id"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    exam_id: &str,
    fields: QuestionFields<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (
            id, section_id, exam_id, content, question_type, points, order_index,
            options, correct_answer
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
    )
    .bind(id)
    .bind(fields.section_id)
    .bind(exam_id)
    .bind(fields.content)
    .bind(fields.kind.question_type())
    .bind(fields.points)
    .bind(fields.order_index)
    .bind(fields.options())
    .bind(fields.kind.stored_answer())
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    exam_id: &str,
    fields: QuestionFields<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE questions SET
            section_id = $1,
            content = $2,
            question_type = $3,
            points = $4,
            order_index = $5,
            options = $6,
            correct_answer = $7
         WHERE id = $8 AND exam_id = $9",
    )
    .bind(fields.section_id)
    .bind(fields.content)
    .bind(fields.kind.question_type())
    .bind(fields.points)
    .bind(fields.order_index)
    .bind(fields.options())
    .bind(fields.kind.stored_answer())
    .bind(id)
    .bind(exam_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes every question of the exam whose id is not in `keep`.
pub(crate) async fn delete_except(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    keep: &[String],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE exam_id = $1 AND NOT (id = ANY($2))")
        .bind(exam_id)
        .bind(keep)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
