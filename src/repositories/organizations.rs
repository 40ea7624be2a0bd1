use sqlx::PgPool;

use crate::db::models::Organization;

const COLUMNS: &str = "id, slug, name, created_by, created_at, updated_at";

pub(crate) struct CreateOrganization<'a> {
    pub(crate) id: &'a str,
    pub(crate) slug: &'a str,
    pub(crate) name: &'a str,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

/// Returns `None` when the slug is already taken.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateOrganization<'_>,
) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>(&format!(
        "INSERT INTO organizations (id, slug, name, created_by, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         ON CONFLICT (slug) DO NOTHING
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.slug)
    .bind(params.name)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>(&format!("SELECT {COLUMNS} FROM organizations WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}
