use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::db::models::{Organization, OrganizationMember};
use crate::db::types::OrgRole;
use crate::repositories::memberships::MembershipView;
use crate::schemas::exam::format_primitive;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OrganizationCreate {
    #[validate(custom(function = "validate_slug"))]
    pub(crate) slug: String,
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub(crate) name: String,
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid_chars =
        slug.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
    let valid_edges = !slug.starts_with('-') && !slug.ends_with('-');
    if (3..=64).contains(&slug.len()) && valid_chars && valid_edges {
        Ok(())
    } else {
        let mut error = ValidationError::new("slug");
        error.message =
            Some("slug must be 3-64 lowercase letters, digits or inner hyphens".into());
        Err(error)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OrganizationResponse {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) role: OrgRole,
    pub(crate) created_at: String,
}

impl OrganizationResponse {
    pub(crate) fn from_db(organization: Organization, role: OrgRole) -> Self {
        Self {
            id: organization.id,
            slug: organization.slug,
            name: organization.name,
            role,
            created_at: format_primitive(organization.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MembershipResponse {
    pub(crate) organization_id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) role: OrgRole,
    pub(crate) joined_at: String,
}

impl From<MembershipView> for MembershipResponse {
    fn from(view: MembershipView) -> Self {
        Self {
            organization_id: view.organization_id,
            slug: view.organization_slug,
            name: view.organization_name,
            role: view.role,
            joined_at: format_primitive(view.joined_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InviteCreate {
    #[serde(default = "default_invite_role")]
    pub(crate) role: OrgRole,
}

fn default_invite_role() -> OrgRole {
    OrgRole::Student
}

#[derive(Debug, Serialize)]
pub(crate) struct InviteResponse {
    pub(crate) code: String,
    pub(crate) organization_id: String,
    pub(crate) role: OrgRole,
    pub(crate) expires_at: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct JoinRequest {
    #[serde(alias = "inviteCode", alias = "invite_code")]
    #[validate(length(min = 1, max = 64, message = "code must be 1-64 characters"))]
    pub(crate) code: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct JoinResponse {
    pub(crate) organization_id: String,
    pub(crate) role: OrgRole,
    pub(crate) joined_at: String,
}

impl From<OrganizationMember> for JoinResponse {
    fn from(member: OrganizationMember) -> Self {
        Self {
            organization_id: member.organization_id,
            role: member.role,
            joined_at: format_primitive(member.joined_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn create(slug: &str) -> OrganizationCreate {
        OrganizationCreate { slug: slug.to_string(), name: "Acme".to_string() }
    }

    #[test]
    fn slug_rules() {
        assert!(create("acme-uni").validate().is_ok());
        assert!(create("cs101").validate().is_ok());
        assert!(create("ab").validate().is_err());
        assert!(create("Acme").validate().is_err());
        assert!(create("-acme").validate().is_err());
        assert!(create("acme uni").validate().is_err());
    }

    #[test]
    fn invite_role_defaults_to_student() {
        let payload: InviteCreate = serde_json::from_value(json!({})).expect("payload");
        assert_eq!(payload.role, OrgRole::Student);

        let payload: InviteCreate =
            serde_json::from_value(json!({"role": "INSTRUCTOR"})).expect("payload");
        assert_eq!(payload.role, OrgRole::Instructor);
    }
}
