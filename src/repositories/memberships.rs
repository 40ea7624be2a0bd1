use sqlx::PgPool;

use crate::db::models::OrganizationMember;
use crate::db::types::OrgRole;

const COLUMNS: &str = "id, organization_id, user_id, role, joined_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct MembershipView {
    pub(crate) organization_id: String,
    pub(crate) organization_slug: String,
    pub(crate) organization_name: String,
    pub(crate) role: OrgRole,
    pub(crate) joined_at: time::PrimitiveDateTime,
}

pub(crate) struct CreateMembership<'a> {
    pub(crate) id: &'a str,
    pub(crate) organization_id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) role: OrgRole,
    pub(crate) joined_at: time::PrimitiveDateTime,
}

pub(crate) async fn find_for_user(
    pool: &PgPool,
    organization_id: &str,
    user_id: &str,
) -> Result<Option<OrganizationMember>, sqlx::Error> {
    sqlx::query_as::<_, OrganizationMember>(&format!(
        "SELECT {COLUMNS} FROM organization_members
         WHERE organization_id = $1 AND user_id = $2"
    ))
    .bind(organization_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Returns `None` when the user already belongs to the organization.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateMembership<'_>,
) -> Result<Option<OrganizationMember>, sqlx::Error> {
    sqlx::query_as::<_, OrganizationMember>(&format!(
        "INSERT INTO organization_members (id, organization_id, user_id, role, joined_at)
         VALUES ($1,$2,$3,$4,$5)
         ON CONFLICT (organization_id, user_id) DO NOTHING
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.organization_id)
    .bind(params.user_id)
    .bind(params.role)
    .bind(params.joined_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<MembershipView>, sqlx::Error> {
    sqlx::query_as::<_, MembershipView>(
        "SELECT o.id AS organization_id,
                o.slug AS organization_slug,
                o.name AS organization_name,
                m.role,
                m.joined_at
         FROM organization_members m
         JOIN organizations o ON o.id = m.organization_id
         WHERE m.user_id = $1
         ORDER BY m.joined_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
