use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::types::{OrgRole, QuestionType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) is_active: bool,
    pub(crate) is_platform_admin: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Organization {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct OrganizationMember {
    pub(crate) id: String,
    pub(crate) organization_id: String,
    pub(crate) user_id: String,
    pub(crate) role: OrgRole,
    pub(crate) joined_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Invite {
    pub(crate) id: String,
    pub(crate) organization_id: String,
    pub(crate) code_hash: String,
    pub(crate) role: OrgRole,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) used: bool,
    pub(crate) used_by: Option<String>,
    pub(crate) used_at: Option<PrimitiveDateTime>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) organization_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) passing_score: Option<f64>,
    pub(crate) randomize_order: bool,
    pub(crate) published_at: Option<PrimitiveDateTime>,
    pub(crate) start_date: Option<PrimitiveDateTime>,
    pub(crate) end_date: Option<PrimitiveDateTime>,
    pub(crate) allowed_attempts: Option<i32>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Exam {
    pub(crate) fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Open bounds are unbounded on that side.
    pub(crate) fn is_open_at(&self, now: PrimitiveDateTime) -> bool {
        let started = self.start_date.map_or(true, |start| now >= start);
        let not_ended = self.end_date.map_or(true, |end| now <= end);
        started && not_ended
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamSection {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) order_index: i32,
}

/// Raw question row. Converted into [`Question`] once its shape is checked.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuestionRow {
    pub(crate) id: String,
    pub(crate) section_id: String,
    pub(crate) exam_id: String,
    pub(crate) content: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    pub(crate) options: Option<Json<BTreeMap<String, String>>>,
    pub(crate) correct_answer: Option<String>,
}

/// Type-specific payload of a question. Each variant carries exactly the
/// answer key its grading rule needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum QuestionKind {
    MultipleChoice {
        options: BTreeMap<String, String>,
        #[serde(alias = "correctOption", alias = "correct_answer", alias = "correctAnswer")]
        correct_option: String,
    },
    ShortAnswer {
        #[serde(alias = "correctAnswer")]
        correct_answer: String,
    },
    OpenEnded {
        #[serde(default, alias = "referenceAnswer")]
        reference_answer: Option<String>,
    },
    CodeBased {
        #[serde(default, alias = "referenceAnswer")]
        reference_answer: Option<String>,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum QuestionShapeError {
    #[error("multiple choice question needs at least one option")]
    NoOptions,
    #[error("correct option '{0}' is not one of the question options")]
    UnknownCorrectOption(String),
    #[error("question of type {0:?} is missing its correct answer")]
    MissingAnswer(QuestionType),
    #[error("points must be a positive number")]
    NonPositivePoints,
}

impl QuestionKind {
    pub(crate) fn question_type(&self) -> QuestionType {
        match self {
            Self::MultipleChoice { .. } => QuestionType::MultipleChoice,
            Self::ShortAnswer { .. } => QuestionType::ShortAnswer,
            Self::OpenEnded { .. } => QuestionType::OpenEnded,
            Self::CodeBased { .. } => QuestionType::CodeBased,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), QuestionShapeError> {
        match self {
            Self::MultipleChoice { options, correct_option } => {
                if options.is_empty() {
                    return Err(QuestionShapeError::NoOptions);
                }
                if !options.contains_key(correct_option) {
                    return Err(QuestionShapeError::UnknownCorrectOption(correct_option.clone()));
                }
                Ok(())
            }
            Self::ShortAnswer { correct_answer } if correct_answer.trim().is_empty() => {
                Err(QuestionShapeError::MissingAnswer(QuestionType::ShortAnswer))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn options(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::MultipleChoice { options, .. } => Some(options),
            _ => None,
        }
    }

    /// Value stored in the `correct_answer` column.
    pub(crate) fn stored_answer(&self) -> Option<&str> {
        match self {
            Self::MultipleChoice { correct_option, .. } => Some(correct_option),
            Self::ShortAnswer { correct_answer } => Some(correct_answer),
            Self::OpenEnded { reference_answer } | Self::CodeBased { reference_answer } => {
                reference_answer.as_deref()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) section_id: String,
    pub(crate) exam_id: String,
    pub(crate) content: String,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    pub(crate) kind: QuestionKind,
}

impl TryFrom<QuestionRow> for Question {
    type Error = QuestionShapeError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        if row.points.is_nan() || row.points <= 0.0 {
            return Err(QuestionShapeError::NonPositivePoints);
        }

        let kind = match row.question_type {
            QuestionType::MultipleChoice => QuestionKind::MultipleChoice {
                options: row.options.map(|options| options.0).unwrap_or_default(),
                correct_option: row
                    .correct_answer
                    .ok_or(QuestionShapeError::MissingAnswer(QuestionType::MultipleChoice))?,
            },
            QuestionType::ShortAnswer => QuestionKind::ShortAnswer {
                correct_answer: row
                    .correct_answer
                    .ok_or(QuestionShapeError::MissingAnswer(QuestionType::ShortAnswer))?,
            },
            QuestionType::OpenEnded => {
                QuestionKind::OpenEnded { reference_answer: row.correct_answer }
            }
            QuestionType::CodeBased => {
                QuestionKind::CodeBased { reference_answer: row.correct_answer }
            }
        };
        kind.validate()?;

        Ok(Self {
            id: row.id,
            section_id: row.section_id,
            exam_id: row.exam_id,
            content: row.content,
            points: row.points,
            order_index: row.order_index,
            kind,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) score: Option<f64>,
    pub(crate) graded: bool,
    pub(crate) needs_review: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl ExamAttempt {
    pub(crate) fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) response: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) feedback: Option<String>,
    pub(crate) needs_review: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(question_type: QuestionType) -> QuestionRow {
        QuestionRow {
            id: "q1".to_string(),
            section_id: "s1".to_string(),
            exam_id: "e1".to_string(),
            content: "Pick one".to_string(),
            question_type,
            points: 10.0,
            order_index: 0,
            options: None,
            correct_answer: None,
        }
    }

    #[test]
    fn kind_deserializes_from_tagged_payload() {
        let kind: QuestionKind = serde_json::from_value(json!({
            "type": "MULTIPLE_CHOICE",
            "options": {"a": "Berlin", "b": "Paris"},
            "correctAnswer": "b"
        }))
        .expect("mcq");

        assert_eq!(kind.question_type(), QuestionType::MultipleChoice);
        assert_eq!(kind.stored_answer(), Some("b"));
        assert!(kind.validate().is_ok());
    }

    #[test]
    fn kind_rejects_unknown_type_tag() {
        let parsed = serde_json::from_value::<QuestionKind>(json!({"type": "ESSAY"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn mcq_correct_option_must_be_listed() {
        let kind = QuestionKind::MultipleChoice {
            options: BTreeMap::from([("a".to_string(), "Berlin".to_string())]),
            correct_option: "c".to_string(),
        };
        assert_eq!(kind.validate(), Err(QuestionShapeError::UnknownCorrectOption("c".to_string())));

        let empty =
            QuestionKind::MultipleChoice { options: BTreeMap::new(), correct_option: "a".into() };
        assert_eq!(empty.validate(), Err(QuestionShapeError::NoOptions));
    }

    #[test]
    fn blank_short_answer_key_is_rejected() {
        let kind = QuestionKind::ShortAnswer { correct_answer: "  ".to_string() };
        assert_eq!(
            kind.validate(),
            Err(QuestionShapeError::MissingAnswer(QuestionType::ShortAnswer))
        );
    }

    #[test]
    fn row_conversion_checks_shape() {
        let mut mcq = row(QuestionType::MultipleChoice);
        mcq.options = Some(Json(BTreeMap::from([
            ("a".to_string(), "Berlin".to_string()),
            ("b".to_string(), "Paris".to_string()),
        ])));
        mcq.correct_answer = Some("b".to_string());
        let question = Question::try_from(mcq).expect("valid mcq");
        assert_eq!(question.kind.options().map(|options| options.len()), Some(2));

        let missing_key = row(QuestionType::ShortAnswer);
        assert!(Question::try_from(missing_key).is_err());

        let open = Question::try_from(row(QuestionType::OpenEnded)).expect("open ended");
        assert_eq!(open.kind, QuestionKind::OpenEnded { reference_answer: None });

        let mut zero_points = row(QuestionType::OpenEnded);
        zero_points.points = 0.0;
        assert_eq!(Question::try_from(zero_points), Err(QuestionShapeError::NonPositivePoints));
    }
}
