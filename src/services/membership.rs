use crate::db::models::{OrganizationMember, User};
use crate::db::types::OrgRole;

/// Who is calling and in which organization. Resolved once per request and
/// passed explicitly into every organization-scoped operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AuthContext {
    pub(crate) user_id: String,
    pub(crate) organization_id: String,
    pub(crate) role: OrgRole,
}

impl AuthContext {
    pub(crate) fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// Platform admins act as owners everywhere; everyone else needs a membership.
pub(crate) fn effective_role(
    user: &User,
    membership: Option<&OrganizationMember>,
) -> Option<OrgRole> {
    if user.is_platform_admin {
        return Some(OrgRole::Owner);
    }
    membership.filter(|member| member.user_id == user.id).map(|member| member.role)
}
