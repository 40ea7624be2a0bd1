use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::User;
use crate::repositories;
use crate::services::membership::{effective_role, AuthContext};

pub(crate) struct CurrentUser(pub(crate) User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(user))
    }
}

/// Resolves the caller's role in the `:org_id` path segment.
#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::BadRequest("Invalid path parameters".to_string()))?;
        let organization_id = params
            .get("org_id")
            .cloned()
            .ok_or_else(|| ApiError::BadRequest("Organization id is required".to_string()))?;

        let membership =
            repositories::memberships::find_for_user(state.db(), &organization_id, &user.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch membership"))?;

        let Some(role) = effective_role(&user, membership.as_ref()) else {
            return Err(ApiError::Forbidden("Membership required for this organization"));
        };

        if membership.is_none() {
            let organization = repositories::organizations::find_by_id(state.db(), &organization_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch organization"))?;
            if organization.is_none() {
                return Err(ApiError::NotFound("Organization not found".to_string()));
            }
        }

        Ok(AuthContext { user_id: user.id, organization_id, role })
    }
}

pub(crate) fn require_staff(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.is_staff() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not enough permissions for this organization"))
    }
}
