use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{ExamAttempt, ExamResponse};
use crate::repositories::attempt_store::ResponseInput;
use crate::schemas::exam::{format_primitive, SectionResponse};
use crate::services::attempts::AttemptView;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ResponseItem {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, max = 36, message = "question_id must be 1-36 characters"))]
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) response: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveResponsesRequest {
    #[serde(default)]
    #[validate(nested)]
    pub(crate) responses: Vec<ResponseItem>,
}

impl SaveResponsesRequest {
    pub(crate) fn into_inputs(self) -> Vec<ResponseInput> {
        self.responses
            .into_iter()
            .map(|item| ResponseInput { question_id: item.question_id, response: item.response })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveResponsesResponse {
    pub(crate) success: bool,
    pub(crate) saved: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptExam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit: Option<i32>,
    pub(crate) passing_score: Option<f64>,
    pub(crate) sections: Vec<SectionResponse>,
}

impl AttemptExam {
    fn from_view(view: &AttemptView) -> Self {
        Self {
            id: view.exam.id.clone(),
            title: view.exam.title.clone(),
            description: view.exam.description.clone(),
            time_limit: view.exam.time_limit_minutes,
            passing_score: view.exam.passing_score,
            sections: SectionResponse::from_sections(&view.sections, false),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptSessionResponse {
    pub(crate) attempt_id: String,
    pub(crate) resumed: bool,
    pub(crate) started_at: String,
    pub(crate) remaining_seconds: Option<i64>,
    pub(crate) auto_save_interval_seconds: u64,
    pub(crate) exam: AttemptExam,
    /// Every question of the exam; `null` when unanswered.
    pub(crate) responses: BTreeMap<String, Option<String>>,
}

impl AttemptSessionResponse {
    pub(crate) fn from_view(view: AttemptView, auto_save_interval_seconds: u64) -> Self {
        let mut responses: BTreeMap<String, Option<String>> = view
            .sections
            .iter()
            .flat_map(|item| item.questions.iter())
            .map(|question| (question.id.clone(), None))
            .collect();
        for row in &view.responses {
            if let Some(slot) = responses.get_mut(&row.question_id) {
                *slot = row.response.clone();
            }
        }

        Self {
            exam: AttemptExam::from_view(&view),
            attempt_id: view.attempt.id,
            resumed: view.resumed,
            started_at: format_primitive(view.attempt.started_at),
            remaining_seconds: view.remaining_seconds,
            auto_save_interval_seconds,
            responses,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActiveAttemptResponse {
    pub(crate) attempt: Option<AttemptSessionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummary {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) graded: bool,
    pub(crate) needs_review: bool,
}

impl From<ExamAttempt> for AttemptSummary {
    fn from(attempt: ExamAttempt) -> Self {
        Self {
            id: attempt.id,
            exam_id: attempt.exam_id,
            started_at: format_primitive(attempt.started_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
            score: attempt.score,
            graded: attempt.graded,
            needs_review: attempt.needs_review,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseDetail {
    pub(crate) question_id: String,
    pub(crate) response: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) feedback: Option<String>,
    pub(crate) needs_review: bool,
}

impl ResponseDetail {
    /// Grading fields stay hidden until the attempt is submitted.
    fn from_row(row: ExamResponse, submitted: bool) -> Self {
        if submitted {
            Self {
                question_id: row.question_id,
                response: row.response,
                score: row.score,
                is_correct: row.is_correct,
                feedback: row.feedback,
                needs_review: row.needs_review,
            }
        } else {
            Self {
                question_id: row.question_id,
                response: row.response,
                score: None,
                is_correct: None,
                feedback: None,
                needs_review: false,
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptDetailResponse {
    pub(crate) attempt: AttemptSummary,
    pub(crate) remaining_seconds: Option<i64>,
    pub(crate) exam: AttemptExam,
    pub(crate) responses: Vec<ResponseDetail>,
}

impl From<AttemptView> for AttemptDetailResponse {
    fn from(view: AttemptView) -> Self {
        let exam = AttemptExam::from_view(&view);
        let submitted = view.attempt.is_submitted();
        Self {
            remaining_seconds: view.remaining_seconds,
            exam,
            responses: view
                .responses
                .into_iter()
                .map(|row| ResponseDetail::from_row(row, submitted))
                .collect(),
            attempt: view.attempt.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) success: bool,
    pub(crate) attempt: AttemptSummary,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn save_request_accepts_camel_case_and_nulls() {
        let request: SaveResponsesRequest = serde_json::from_value(json!({
            "responses": [
                {"questionId": "q1", "response": "b"},
                {"question_id": "q2", "response": null},
                {"question_id": "q3"}
            ]
        }))
        .expect("request");

        assert!(request.validate().is_ok());
        let inputs = request.into_inputs();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0].response.as_deref(), Some("b"));
        assert_eq!(inputs[1].response, None);
        assert_eq!(inputs[2].question_id, "q3");
    }

    #[test]
    fn save_request_rejects_blank_question_id() {
        let request: SaveResponsesRequest =
            serde_json::from_value(json!({"responses": [{"question_id": ""}]})).expect("request");
        assert!(request.validate().is_err());
    }
}
