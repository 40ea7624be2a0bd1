use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use time::PrimitiveDateTime;
use uuid::Uuid;

use super::{AttemptStore, CreateAttemptOutcome, NewAttempt, ResponseInput, SectionWithQuestions};
use crate::db::models::{Exam, ExamAttempt, ExamResponse, ExamSection, Question};
use crate::services::grading::AttemptGrade;

#[derive(Debug, Default)]
struct Data {
    exams: Vec<Exam>,
    sections: Vec<SectionWithQuestions>,
    attempts: Vec<ExamAttempt>,
    responses: Vec<ExamResponse>,
}

/// In-process store for lifecycle tests. One mutex guards everything, so
/// each trait call is atomic.
#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryAttemptStore {
    conn: Arc<Mutex<Data>>,
}

impl MemoryAttemptStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_exam(&self, exam: Exam) {
        self.conn.lock().unwrap().exams.push(exam);
    }

    pub(crate) fn insert_section(&self, section: ExamSection, questions: Vec<Question>) {
        let mut data = self.conn.lock().unwrap();
        data.sections.push(SectionWithQuestions { section, questions });
    }

    pub(crate) fn remove_question(&self, question_id: &str) {
        let mut data = self.conn.lock().unwrap();
        for item in &mut data.sections {
            item.questions.retain(|question| question.id != question_id);
        }
    }

    /// Rewinds `started_at` to simulate elapsed time.
    pub(crate) fn set_started_at(&self, attempt_id: &str, started_at: PrimitiveDateTime) {
        let mut data = self.conn.lock().unwrap();
        if let Some(attempt) = data.attempts.iter_mut().find(|attempt| attempt.id == attempt_id) {
            attempt.started_at = started_at;
        }
    }

    pub(crate) fn attempt(&self, attempt_id: &str) -> Option<ExamAttempt> {
        let data = self.conn.lock().unwrap();
        data.attempts.iter().find(|attempt| attempt.id == attempt_id).cloned()
    }

    pub(crate) fn responses(&self, attempt_id: &str) -> Vec<ExamResponse> {
        let data = self.conn.lock().unwrap();
        data.responses.iter().filter(|row| row.attempt_id == attempt_id).cloned().collect()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn find_exam(&self, organization_id: &str, exam_id: &str) -> Result<Option<Exam>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .exams
            .iter()
            .find(|exam| exam.id == exam_id && exam.organization_id == organization_id)
            .cloned())
    }

    async fn load_sections(&self, exam_id: &str) -> Result<Vec<SectionWithQuestions>> {
        let data = self.conn.lock().unwrap();
        let mut sections: Vec<SectionWithQuestions> =
            data.sections.iter().filter(|item| item.section.exam_id == exam_id).cloned().collect();
        sections.sort_by_key(|item| item.section.order_index);
        for item in &mut sections {
            item.questions.sort_by_key(|question| question.order_index);
        }
        Ok(sections)
    }

    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<ExamAttempt>> {
        Ok(self.attempt(attempt_id))
    }

    async fn find_unsubmitted(&self, exam_id: &str, user_id: &str) -> Result<Option<ExamAttempt>> {
        let data = self.conn.lock().unwrap();
        Ok(data
            .attempts
            .iter()
            .find(|a| a.exam_id == exam_id && a.user_id == user_id && !a.is_submitted())
            .cloned())
    }

    async fn list_attempts(&self, exam_id: &str, user_id: &str) -> Result<Vec<ExamAttempt>> {
        let data = self.conn.lock().unwrap();
        let mut attempts: Vec<ExamAttempt> = data
            .attempts
            .iter()
            .filter(|a| a.exam_id == exam_id && a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(attempts)
    }

    async fn create_attempt(&self, attempt: NewAttempt) -> Result<CreateAttemptOutcome> {
        let mut data = self.conn.lock().unwrap();
        let mine = |a: &&ExamAttempt| a.exam_id == attempt.exam_id && a.user_id == attempt.user_id;

        if let Some(existing) = data.attempts.iter().filter(mine).find(|a| !a.is_submitted()) {
            return Ok(CreateAttemptOutcome::Existing(existing.clone()));
        }
        if let Some(limit) = attempt.allowed_attempts {
            let used = data.attempts.iter().filter(mine).count();
            if used >= usize::try_from(limit).unwrap_or(0) {
                return Ok(CreateAttemptOutcome::LimitReached);
            }
        }

        let row = ExamAttempt {
            id: attempt.id,
            exam_id: attempt.exam_id,
            user_id: attempt.user_id,
            started_at: attempt.started_at,
            submitted_at: None,
            score: None,
            graded: false,
            needs_review: false,
            created_at: attempt.started_at,
            updated_at: attempt.started_at,
        };
        data.attempts.push(row.clone());
        Ok(CreateAttemptOutcome::Created(row))
    }

    async fn list_responses(&self, attempt_id: &str) -> Result<Vec<ExamResponse>> {
        Ok(self.responses(attempt_id))
    }

    async fn upsert_responses(
        &self,
        attempt_id: &str,
        inputs: &[ResponseInput],
        now: PrimitiveDateTime,
    ) -> Result<bool> {
        let mut data = self.conn.lock().unwrap();
        let open = data.attempts.iter().any(|a| a.id == attempt_id && !a.is_submitted());
        if !open {
            return Ok(false);
        }

        for input in inputs {
            let existing = data
                .responses
                .iter_mut()
                .find(|row| row.attempt_id == attempt_id && row.question_id == input.question_id);
            match existing {
                Some(row) => {
                    row.response = input.response.clone();
                    row.updated_at = now;
                }
                None => data.responses.push(ExamResponse {
                    id: Uuid::new_v4().to_string(),
                    attempt_id: attempt_id.to_string(),
                    question_id: input.question_id.clone(),
                    response: input.response.clone(),
                    score: None,
                    is_correct: None,
                    feedback: None,
                    needs_review: false,
                    created_at: now,
                    updated_at: now,
                }),
            }
        }
        Ok(true)
    }

    async fn close_attempt(
        &self,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<ExamAttempt>> {
        let mut data = self.conn.lock().unwrap();
        let Some(attempt) =
            data.attempts.iter_mut().find(|a| a.id == attempt_id && !a.is_submitted())
        else {
            return Ok(None);
        };

        attempt.submitted_at = Some(now);
        attempt.needs_review = true;
        attempt.updated_at = now;
        Ok(Some(attempt.clone()))
    }

    async fn record_grade(
        &self,
        attempt_id: &str,
        grade: &AttemptGrade,
        now: PrimitiveDateTime,
    ) -> Result<ExamAttempt> {
        let mut data = self.conn.lock().unwrap();

        for item in &grade.responses {
            if let Some(row) = data
                .responses
                .iter_mut()
                .find(|row| row.attempt_id == attempt_id && row.question_id == item.question_id)
            {
                row.score = Some(item.score);
                row.is_correct = Some(item.is_correct);
                row.feedback = item.feedback.clone();
                row.needs_review = item.needs_review;
                row.updated_at = now;
            }
        }

        let attempt = data
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && a.is_submitted())
            .context("record_grade on an attempt that is not closed")?;
        attempt.score = Some(grade.total_score);
        attempt.graded = true;
        attempt.needs_review = grade.needs_review;
        attempt.updated_at = now;
        Ok(attempt.clone())
    }
}
