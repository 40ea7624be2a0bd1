use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;

/// Creates the configured platform admin, or repairs its flags and password.
pub(crate) async fn ensure_platform_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping platform admin creation");
        return Ok(());
    }

    let email = &admin.first_superuser_email;
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_email(state.db(), email).await? {
        let password_matches =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);

        if password_matches && user.is_active && user.is_platform_admin {
            tracing::info!("Platform admin already up to date");
            return Ok(());
        }

        let hashed_password = if password_matches {
            None
        } else {
            Some(security::hash_password(&admin.first_superuser_password)?)
        };
        repositories::users::promote_admin(
            state.db(),
            &user.id,
            repositories::users::PromoteAdmin { hashed_password, updated_at: now },
        )
        .await?;

        tracing::info!(email = %email, "Updated platform admin");
        return Ok(());
    }

    let id = Uuid::new_v4().to_string();
    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &id,
            email,
            hashed_password: security::hash_password(&admin.first_superuser_password)?,
            full_name: "Platform Admin",
            is_active: true,
            is_platform_admin: true,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(email = %email, "Created platform admin");
    Ok(())
}
