use axum::{extract::State, http::StatusCode, Json};
use time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::types::OrgRole;
use crate::repositories;
use crate::schemas::organization::{
    InviteCreate, InviteResponse, JoinRequest, JoinResponse, MembershipResponse,
    OrganizationCreate, OrganizationResponse,
};
use crate::services::invite_codes::{generate_invite_code, hash_invite_code};
use crate::services::membership::AuthContext;

pub(super) async fn create_organization(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<OrganizationCreate>,
) -> Result<(StatusCode, Json<OrganizationResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let organization = repositories::organizations::create(
        &mut *tx,
        repositories::organizations::CreateOrganization {
            id: &Uuid::new_v4().to_string(),
            slug: &payload.slug,
            name: payload.name.trim(),
            created_by: &user.id,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create organization"))?
    .ok_or_else(|| ApiError::Conflict("Organization slug is already taken".to_string()))?;

    repositories::memberships::create(
        &mut *tx,
        repositories::memberships::CreateMembership {
            id: &Uuid::new_v4().to_string(),
            organization_id: &organization.id,
            user_id: &user.id,
            role: OrgRole::Owner,
            joined_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create owner membership"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        organization_id = %organization.id,
        slug = %organization.slug,
        owner_id = %user.id,
        "Organization created"
    );

    Ok((StatusCode::CREATED, Json(OrganizationResponse::from_db(organization, OrgRole::Owner))))
}

pub(super) async fn list_memberships(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<MembershipResponse>>, ApiError> {
    let memberships = repositories::memberships::list_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list memberships"))?;

    Ok(Json(memberships.into_iter().map(MembershipResponse::from).collect()))
}

pub(super) async fn create_invite(
    ctx: AuthContext,
    State(state): State<AppState>,
    Json(payload): Json<InviteCreate>,
) -> Result<(StatusCode, Json<InviteResponse>), ApiError> {
    if !ctx.role.can_invite() {
        return Err(ApiError::Forbidden("Only owners and admins can create invites"));
    }
    // Ownership is only transferred out of band.
    if payload.role == OrgRole::Owner && ctx.role != OrgRole::Owner {
        return Err(ApiError::Forbidden("Only owners can invite owners"));
    }

    let organization = repositories::organizations::find_by_id(state.db(), &ctx.organization_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch organization"))?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    let now = primitive_now_utc();
    let expire_hours =
        i64::try_from(state.settings().exam().invite_expire_hours).unwrap_or(i64::MAX);
    let expires_at = now.saturating_add(Duration::hours(expire_hours));
    let code = generate_invite_code(&organization.slug, payload.role);

    let invite = repositories::invites::create(
        state.db(),
        repositories::invites::CreateInvite {
            id: &Uuid::new_v4().to_string(),
            organization_id: &organization.id,
            code_hash: &hash_invite_code(&code),
            role: payload.role,
            expires_at,
            created_by: &ctx.user_id,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create invite"))?;

    tracing::info!(
        organization_id = %organization.id,
        invite_id = %invite.id,
        role = invite.role.as_str(),
        "Invite created"
    );

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            code,
            organization_id: invite.organization_id,
            role: invite.role,
            expires_at: format_primitive(invite.expires_at),
        }),
    ))
}

pub(super) async fn join_organization(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let invite =
        repositories::invites::find_by_hash_for_update(&mut *tx, &hash_invite_code(&payload.code))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch invite"))?
            .ok_or_else(|| ApiError::BadRequest("Invalid invite code".to_string()))?;

    if invite.used {
        return Err(ApiError::BadRequest("Invite code has already been used".to_string()));
    }
    if invite.expires_at <= now {
        return Err(ApiError::BadRequest("Invite code has expired".to_string()));
    }

    let member = repositories::memberships::create(
        &mut *tx,
        repositories::memberships::CreateMembership {
            id: &Uuid::new_v4().to_string(),
            organization_id: &invite.organization_id,
            user_id: &user.id,
            role: invite.role,
            joined_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create membership"))?
    .ok_or_else(|| ApiError::Conflict("Already a member of this organization".to_string()))?;

    let marked = repositories::invites::mark_used(&mut *tx, &invite.id, &user.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to mark invite as used"))?;
    if !marked {
        return Err(ApiError::BadRequest("Invite code has already been used".to_string()));
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        organization_id = %member.organization_id,
        user_id = %user.id,
        role = member.role.as_str(),
        "User joined organization"
    );

    Ok(Json(member.into()))
}
