use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{Exam, Question, QuestionKind};
use crate::db::types::QuestionType;
use crate::repositories::attempt_store::SectionWithQuestions;
use crate::repositories::exams::ExamSummaryRow;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionPayload {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[validate(length(min = 1, message = "question content must not be empty"))]
    pub(crate) content: String,
    #[validate(range(exclusive_min = 0.0, message = "points must be positive"))]
    pub(crate) points: f64,
    #[serde(flatten)]
    pub(crate) kind: QuestionKind,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SectionPayload {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[validate(length(min = 1, message = "section title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionPayload>,
}

/// Full exam document. Used for creation and for replace-by-diff updates;
/// array position defines order.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamPayload {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "timeLimit", alias = "time_limit_minutes")]
    #[validate(range(min = 1, message = "time_limit must be positive"))]
    pub(crate) time_limit: Option<i32>,
    #[serde(default, alias = "passingScore")]
    #[validate(range(min = 0.0, message = "passing_score must be non-negative"))]
    pub(crate) passing_score: Option<f64>,
    #[serde(default, alias = "randomizeOrder")]
    pub(crate) randomize_order: bool,
    #[serde(
        default,
        alias = "startDate",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) start_date: Option<OffsetDateTime>,
    #[serde(
        default,
        alias = "endDate",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) end_date: Option<OffsetDateTime>,
    #[serde(default, alias = "allowedAttempts")]
    #[validate(range(min = 1, message = "allowed_attempts must be positive"))]
    pub(crate) allowed_attempts: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) sections: Vec<SectionPayload>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) content: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) options: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<String>,
}

impl QuestionResponse {
    /// Answer keys are only filled in for staff.
    pub(crate) fn from_question(question: &Question, include_keys: bool) -> Self {
        Self {
            id: question.id.clone(),
            content: question.content.clone(),
            question_type: question.kind.question_type(),
            points: question.points,
            order_index: question.order_index,
            options: question.kind.options().cloned(),
            correct_answer: if include_keys {
                question.kind.stored_answer().map(str::to_string)
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SectionResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) order_index: i32,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl SectionResponse {
    pub(crate) fn from_sections(
        sections: &[SectionWithQuestions],
        include_keys: bool,
    ) -> Vec<Self> {
        sections
            .iter()
            .map(|item| Self {
                id: item.section.id.clone(),
                title: item.section.title.clone(),
                description: item.section.description.clone(),
                order_index: item.section.order_index,
                questions: item
                    .questions
                    .iter()
                    .map(|question| QuestionResponse::from_question(question, include_keys))
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) organization_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit: Option<i32>,
    pub(crate) passing_score: Option<f64>,
    pub(crate) randomize_order: bool,
    pub(crate) published: bool,
    pub(crate) published_at: Option<String>,
    pub(crate) start_date: Option<String>,
    pub(crate) end_date: Option<String>,
    pub(crate) allowed_attempts: Option<i32>,
    pub(crate) total_points: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) sections: Vec<SectionResponse>,
}

impl ExamResponse {
    pub(crate) fn from_parts(
        exam: Exam,
        sections: &[SectionWithQuestions],
        include_keys: bool,
    ) -> Self {
        let total_points = sections
            .iter()
            .flat_map(|item| item.questions.iter())
            .map(|question| question.points)
            .sum();

        Self {
            published: exam.is_published(),
            id: exam.id,
            organization_id: exam.organization_id,
            title: exam.title,
            description: exam.description,
            time_limit: exam.time_limit_minutes,
            passing_score: exam.passing_score,
            randomize_order: exam.randomize_order,
            published_at: exam.published_at.map(format_primitive),
            start_date: exam.start_date.map(format_primitive),
            end_date: exam.end_date.map(format_primitive),
            allowed_attempts: exam.allowed_attempts,
            total_points,
            created_by: exam.created_by,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            sections: SectionResponse::from_sections(sections, include_keys),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit: Option<i32>,
    pub(crate) published: bool,
    pub(crate) start_date: Option<String>,
    pub(crate) end_date: Option<String>,
    pub(crate) allowed_attempts: Option<i32>,
    pub(crate) question_count: i64,
    pub(crate) total_points: f64,
    pub(crate) created_at: String,
}

impl From<ExamSummaryRow> for ExamSummaryResponse {
    fn from(row: ExamSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            time_limit: row.time_limit_minutes,
            published: row.published_at.is_some(),
            start_date: row.start_date.map(format_primitive),
            end_date: row.end_date.map(format_primitive),
            allowed_attempts: row.allowed_attempts,
            question_count: row.question_count,
            total_points: row.total_points,
            created_at: format_primitive(row.created_at),
        }
    }
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // datetime-local inputs arrive without an offset; treat them as UTC.
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_offset_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn exam_payload_accepts_camel_case_and_tagged_questions() {
        let payload: ExamPayload = serde_json::from_value(json!({
            "title": "Midterm",
            "timeLimit": 45,
            "allowedAttempts": 2,
            "startDate": "2026-05-01T09:00",
            "endDate": "2026-05-01T18:00:00+03:00",
            "sections": [{
                "title": "Part A",
                "questions": [
                    {
                        "content": "Capital of France?",
                        "points": 2,
                        "type": "MULTIPLE_CHOICE",
                        "options": {"a": "Berlin", "b": "Paris"},
                        "correctAnswer": "b"
                    },
                    {
                        "id": "q-existing",
                        "content": "Explain borrowing",
                        "points": 5,
                        "type": "OPEN_ENDED"
                    }
                ]
            }]
        }))
        .expect("payload");

        assert!(payload.validate().is_ok());
        assert_eq!(payload.time_limit, Some(45));
        assert_eq!(payload.allowed_attempts, Some(2));
        assert_eq!(payload.start_date.map(|value| value.hour()), Some(9));
        assert_eq!(payload.end_date.map(|value| value.offset().whole_hours()), Some(3));

        let questions = &payload.sections[0].questions;
        assert_eq!(questions[0].kind.question_type(), QuestionType::MultipleChoice);
        assert_eq!(questions[1].id.as_deref(), Some("q-existing"));
    }

    #[test]
    fn exam_payload_rejects_bad_values() {
        let payload: ExamPayload = serde_json::from_value(json!({
            "title": "",
            "time_limit": 0,
            "sections": [{
                "title": "A",
                "questions": [{
                    "content": "x",
                    "points": 0,
                    "type": "SHORT_ANSWER",
                    "correct_answer": "y"
                }]
            }]
        }))
        .expect("payload");

        let errors = payload.validate().expect_err("invalid");
        let fields = errors.errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("time_limit"));
        assert!(fields.contains_key("sections"));
    }

    #[test]
    fn unknown_question_type_fails_to_parse() {
        let parsed = serde_json::from_value::<QuestionPayload>(json!({
            "content": "x",
            "points": 1,
            "type": "ESSAY"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn student_view_omits_answer_keys() {
        let question = Question {
            id: "q1".to_string(),
            section_id: "s1".to_string(),
            exam_id: "e1".to_string(),
            content: "2 + 2".to_string(),
            points: 1.0,
            order_index: 0,
            kind: QuestionKind::ShortAnswer { correct_answer: "4".to_string() },
        };

        let student = serde_json::to_value(QuestionResponse::from_question(&question, false))
            .expect("json");
        assert!(student.get("correct_answer").is_none());
        assert_eq!(student["type"], "SHORT_ANSWER");

        let staff = serde_json::to_value(QuestionResponse::from_question(&question, true))
            .expect("json");
        assert_eq!(staff["correct_answer"], "4");
    }
}
