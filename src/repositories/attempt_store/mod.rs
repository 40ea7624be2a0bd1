mod pg;

#[cfg(test)]
pub(crate) mod memory;

pub(crate) use pg::PgAttemptStore;

use anyhow::Result;
use async_trait::async_trait;
use time::PrimitiveDateTime;

use crate::db::models::{Exam, ExamAttempt, ExamResponse, ExamSection, Question};
use crate::services::grading::AttemptGrade;

#[derive(Debug, Clone)]
pub(crate) struct SectionWithQuestions {
    pub(crate) section: ExamSection,
    pub(crate) questions: Vec<Question>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewAttempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) allowed_attempts: Option<i32>,
    pub(crate) started_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) enum CreateAttemptOutcome {
    Created(ExamAttempt),
    /// An in-progress attempt already existed for the pair.
    Existing(ExamAttempt),
    LimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResponseInput {
    pub(crate) question_id: String,
    pub(crate) response: Option<String>,
}

/// Persistence needed by the attempt lifecycle. Creation and closing are
/// atomic per implementation; callers never see two in-progress attempts for
/// one (exam, user) or a double submission.
#[async_trait]
pub(crate) trait AttemptStore: Send + Sync {
    async fn find_exam(&self, organization_id: &str, exam_id: &str) -> Result<Option<Exam>>;

    /// Sections in order with their well-formed questions in order.
    async fn load_sections(&self, exam_id: &str) -> Result<Vec<SectionWithQuestions>>;

    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<ExamAttempt>>;

    async fn find_unsubmitted(&self, exam_id: &str, user_id: &str) -> Result<Option<ExamAttempt>>;

    /// Newest first.
    async fn list_attempts(&self, exam_id: &str, user_id: &str) -> Result<Vec<ExamAttempt>>;

    async fn create_attempt(&self, attempt: NewAttempt) -> Result<CreateAttemptOutcome>;

    async fn list_responses(&self, attempt_id: &str) -> Result<Vec<ExamResponse>>;

    /// Returns `false` without writing when the attempt is already submitted.
    async fn upsert_responses(
        &self,
        attempt_id: &str,
        responses: &[ResponseInput],
        now: PrimitiveDateTime,
    ) -> Result<bool>;

    /// Marks the attempt submitted so that no further save lands. `None`
    /// when the attempt was submitted by someone else first.
    async fn close_attempt(
        &self,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<ExamAttempt>>;

    /// Writes per-response grades and the total of a closed attempt.
    async fn record_grade(
        &self,
        attempt_id: &str,
        grade: &AttemptGrade,
        now: PrimitiveDateTime,
    ) -> Result<ExamAttempt>;
}
