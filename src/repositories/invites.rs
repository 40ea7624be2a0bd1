use sqlx::PgPool;

use crate::db::models::Invite;
use crate::db::types::OrgRole;

const COLUMNS: &str = "\
    id, organization_id, code_hash, role, expires_at, used, used_by, used_at, \
    created_by, created_at";

pub(crate) struct CreateInvite<'a> {
    pub(crate) id: &'a str,
    pub(crate) organization_id: &'a str,
    pub(crate) code_hash: &'a str,
    pub(crate) role: OrgRole,
    pub(crate) expires_at: time::PrimitiveDateTime,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateInvite<'_>) -> Result<Invite, sqlx::Error> {
    sqlx::query_as::<_, Invite>(&format!(
        "INSERT INTO invites (
            id, organization_id, code_hash, role, expires_at, created_by, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.organization_id)
    .bind(params.code_hash)
    .bind(params.role)
    .bind(params.expires_at)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

/// Locks the invite row for the rest of the transaction.
pub(crate) async fn find_by_hash_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    code_hash: &str,
) -> Result<Option<Invite>, sqlx::Error> {
    sqlx::query_as::<_, Invite>(&format!(
        "SELECT {COLUMNS} FROM invites WHERE code_hash = $1 FOR UPDATE"
    ))
    .bind(code_hash)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn mark_used(
    executor: impl sqlx::PgExecutor<'_>,
    invite_id: &str,
    user_id: &str,
    used_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE invites
         SET used = TRUE,
             used_by = $1,
             used_at = $2
         WHERE id = $3 AND used = FALSE",
    )
    .bind(user_id)
    .bind(used_at)
    .bind(invite_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
