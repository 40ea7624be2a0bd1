use crate::db::models::ExamSection;

const COLUMNS: &str = "id, exam_id, title, description, order_index";

pub(crate) struct SectionFields<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) order_index: i32,
}

pub(crate) async fn list_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<ExamSection>, sqlx::Error> {
    sqlx::query_as::<_, ExamSection>(&format!(
        "SELECT {COLUMNS} FROM exam_sections WHERE exam_id = $1 ORDER BY order_index, id"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    exam_id: &str,
    fields: SectionFields<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO exam_sections (id, exam_id, title, description, order_index)
         VALUES ($1,$2,$3,$4,$5)",
    )
    .bind(id)
    .bind(exam_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.order_index)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    exam_id: &str,
    fields: SectionFields<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_sections SET title = $1, description = $2, order_index = $3
         WHERE id = $4 AND exam_id = $5",
    )
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.order_index)
    .bind(id)
    .bind(exam_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes every section of the exam whose id is not in `keep`.
pub(crate) async fn delete_except(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    keep: &[String],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exam_sections WHERE exam_id = $1 AND NOT (id = ANY($2))")
        .bind(exam_id)
        .bind(keep)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
