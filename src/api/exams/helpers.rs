use std::collections::HashSet;

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::to_primitive_utc;
use crate::repositories;
use crate::repositories::attempt_store::{AttemptStore, PgAttemptStore, SectionWithQuestions};
use crate::repositories::exams::ExamFields;
use crate::repositories::questions::QuestionFields;
use crate::repositories::sections::SectionFields;
use crate::schemas::exam::{ExamPayload, SectionPayload};

/// Checks that need no database: the date window, question shapes and
/// duplicate ids inside the document.
pub(super) fn check_payload(payload: &ExamPayload) -> Result<(), ApiError> {
    if let (Some(start), Some(end)) = (payload.start_date, payload.end_date) {
        if end <= start {
            return Err(ApiError::BadRequest("end_date must be after start_date".to_string()));
        }
    }

    let mut section_ids = HashSet::new();
    let mut question_ids = HashSet::new();
    for section in &payload.sections {
        if let Some(id) = &section.id {
            if !section_ids.insert(id.as_str()) {
                return Err(ApiError::BadRequest(format!("Section {id} appears more than once")));
            }
        }
        for question in &section.questions {
            if let Some(id) = &question.id {
                if !question_ids.insert(id.as_str()) {
                    return Err(ApiError::BadRequest(format!(
                        "Question {id} appears more than once"
                    )));
                }
            }
            question.kind.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
        }
    }

    Ok(())
}

pub(super) fn exam_fields(payload: &ExamPayload) -> ExamFields<'_> {
    ExamFields {
        title: payload.title.trim(),
        description: payload.description.as_deref(),
        time_limit_minutes: payload.time_limit,
        passing_score: payload.passing_score,
        randomize_order: payload.randomize_order,
        start_date: payload.start_date.map(to_primitive_utc),
        end_date: payload.end_date.map(to_primitive_utc),
        allowed_attempts: payload.allowed_attempts,
    }
}

/// Replace-by-diff: rows missing from the document are deleted, rows with an
/// id are updated in place, id-less rows are created. Array position becomes
/// `order_index`.
pub(super) async fn sync_content(
    tx: &mut Transaction<'_, Postgres>,
    exam_id: &str,
    sections: &[SectionPayload],
) -> Result<(), ApiError> {
    let existing_sections: HashSet<String> =
        repositories::sections::list_by_exam(&mut **tx, exam_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load exam sections"))?
            .into_iter()
            .map(|section| section.id)
            .collect();
    let existing_questions: HashSet<String> =
        repositories::questions::list_by_exam(&mut **tx, exam_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load exam questions"))?
            .into_iter()
            .map(|question| question.id)
            .collect();

    let mut kept_questions = Vec::new();
    for section in sections {
        if let Some(id) = &section.id {
            if !existing_sections.contains(id) {
                return Err(ApiError::BadRequest(format!(
                    "Section {id} does not belong to this exam"
                )));
            }
        }
        for question in &section.questions {
            if let Some(id) = &question.id {
                if !existing_questions.contains(id) {
                    return Err(ApiError::BadRequest(format!(
                        "Question {id} does not belong to this exam"
                    )));
                }
                kept_questions.push(id.clone());
            }
        }
    }

    // Questions go first so that moved questions survive section deletion.
    repositories::questions::delete_except(&mut **tx, exam_id, &kept_questions)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete questions"))?;

    let mut kept_sections = Vec::with_capacity(sections.len());
    for (section_index, section) in sections.iter().enumerate() {
        let fields = SectionFields {
            title: section.title.trim(),
            description: section.description.as_deref(),
            order_index: position(section_index)?,
        };
        let section_id = match &section.id {
            Some(id) => {
                repositories::sections::update(&mut **tx, id, exam_id, fields)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to update section"))?;
                id.clone()
            }
            None => {
                let id = Uuid::new_v4().to_string();
                repositories::sections::create(&mut **tx, &id, exam_id, fields)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to create section"))?;
                id
            }
        };

        for (question_index, question) in section.questions.iter().enumerate() {
            let fields = QuestionFields {
                section_id: &section_id,
                content: &question.content,
                points: question.points,
                order_index: position(question_index)?,
                kind: &question.kind,
            };
            match &question.id {
                Some(id) => {
                    repositories::questions::update(&mut **tx, id, exam_id, fields)
                        .await
                        .map_err(|e| ApiError::internal(e, "Failed to update question"))?;
                }
                None => {
                    repositories::questions::create(
                        &mut **tx,
                        &Uuid::new_v4().to_string(),
                        exam_id,
                        fields,
                    )
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;
                }
            }
        }

        kept_sections.push(section_id);
    }

    repositories::sections::delete_except(&mut **tx, exam_id, &kept_sections)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete sections"))?;

    Ok(())
}

pub(super) async fn load_sections(
    state: &AppState,
    exam_id: &str,
) -> Result<Vec<SectionWithQuestions>, ApiError> {
    PgAttemptStore::new(state.db().clone())
        .load_sections(exam_id)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to load exam content"))
}

fn position(index: usize) -> Result<i32, ApiError> {
    i32::try_from(index).map_err(|_| ApiError::BadRequest("Too many items".to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: serde_json::Value) -> ExamPayload {
        serde_json::from_value(value).expect("payload")
    }

    #[test]
    fn rejects_inverted_window() {
        let exam = payload(json!({
            "title": "Quiz",
            "start_date": "2026-05-02T10:00:00Z",
            "end_date": "2026-05-01T10:00:00Z"
        }));
        assert!(matches!(check_payload(&exam), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn rejects_mcq_with_unlisted_answer() {
        let exam = payload(json!({
            "title": "Quiz",
            "sections": [{
                "title": "A",
                "questions": [{
                    "content": "Pick",
                    "points": 1,
                    "type": "MULTIPLE_CHOICE",
                    "options": {"a": "one"},
                    "correct_option": "z"
                }]
            }]
        }));
        assert!(matches!(check_payload(&exam), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn rejects_duplicate_question_ids() {
        let exam = payload(json!({
            "title": "Quiz",
            "sections": [
                {
                    "title": "A",
                    "questions": [{"id": "q1", "content": "x", "points": 1, "type": "OPEN_ENDED"}]
                },
                {
                    "title": "B",
                    "questions": [{"id": "q1", "content": "y", "points": 1, "type": "OPEN_ENDED"}]
                }
            ]
        }));
        assert!(matches!(check_payload(&exam), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn accepts_well_formed_document() {
        let exam = payload(json!({
            "title": "Quiz",
            "start_date": "2026-05-01T10:00:00Z",
            "end_date": "2026-05-01T12:00:00Z",
            "sections": [{
                "title": "A",
                "questions": [
                    {
                        "content": "Stack or heap?",
                        "points": 5,
                        "type": "SHORT_ANSWER",
                        "correct_answer": "stack"
                    },
                    {"content": "Explain", "points": 3, "type": "CODE_BASED"}
                ]
            }]
        }));
        assert!(check_payload(&exam).is_ok());
        let fields = exam_fields(&exam);
        assert_eq!(fields.title, "Quiz");
        assert!(fields.start_date.is_some());
    }
}
