use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "org_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum OrgRole {
    Owner,
    Admin,
    Instructor,
    Student,
}

impl OrgRole {
    /// Roles allowed to author and manage exams.
    pub(crate) fn is_staff(self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Instructor)
    }

    pub(crate) fn can_invite(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Instructor => "INSTRUCTOR",
            Self::Student => "STUDENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "question_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    OpenEnded,
    CodeBased,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_in_upper_case() {
        assert_eq!(serde_json::to_value(OrgRole::Instructor).unwrap(), "INSTRUCTOR");
        let parsed: OrgRole = serde_json::from_value(serde_json::json!("OWNER")).unwrap();
        assert_eq!(parsed, OrgRole::Owner);
        assert!(serde_json::from_value::<OrgRole>(serde_json::json!("owner")).is_err());
    }

    #[test]
    fn staff_and_invite_permissions() {
        assert!(OrgRole::Instructor.is_staff());
        assert!(!OrgRole::Student.is_staff());
        assert!(OrgRole::Admin.can_invite());
        assert!(!OrgRole::Instructor.can_invite());
    }

    #[test]
    fn question_types_use_screaming_snake_case() {
        assert_eq!(serde_json::to_value(QuestionType::MultipleChoice).unwrap(), "MULTIPLE_CHOICE");
        let parsed: QuestionType =
            serde_json::from_value(serde_json::json!("CODE_BASED")).unwrap();
        assert_eq!(parsed, QuestionType::CodeBased);
    }
}
