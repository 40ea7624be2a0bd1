mod errors;
mod ordering;
mod timing;


use std::collections::{HashMap, HashSet};

use time::PrimitiveDateTime;
use uuid::Uuid;

pub(crate) use errors::AttemptError;

use crate::core::metrics;
use crate::db::models::{Exam, ExamAttempt, ExamResponse, Question};
use crate::repositories::attempt_store::{
    AttemptStore, CreateAttemptOutcome, NewAttempt, ResponseInput, SectionWithQuestions,
};
use crate::services::grading::Grader;
use crate::services::membership::AuthContext;

/// An attempt together with everything a client needs to render it.
#[derive(Debug, Clone)]
pub(crate) struct AttemptView {
    pub(crate) attempt: ExamAttempt,
    pub(crate) resumed: bool,
    pub(crate) remaining_seconds: Option<i64>,
    pub(crate) exam: Exam,
    pub(crate) sections: Vec<SectionWithQuestions>,
    pub(crate) responses: Vec<ExamResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ownership {
    /// Someone else's attempt answers 403.
    Forbidden,
    /// Someone else's attempt is indistinguishable from a missing one.
    Hidden,
}

/// Attempt state machine: start or resume, save, submit. Time limits are
/// enforced lazily when an attempt is looked up.
pub(crate) struct AttemptManager<S> {
    store: S,
    grader: Grader,
}

impl<S: AttemptStore> AttemptManager<S> {
    pub(crate) fn new(store: S, grader: Grader) -> Self {
        Self { store, grader }
    }

    pub(crate) async fn start_or_resume(
        &self,
        ctx: &AuthContext,
        exam_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<AttemptView, AttemptError> {
        let exam = self.exam(ctx, exam_id).await?;
        if !exam.is_published() || !exam.is_open_at(now) {
            return Err(AttemptError::ExamUnavailable);
        }

        if let Some(attempt) = self.live_attempt(&exam, &ctx.user_id, now).await? {
            metrics::attempt_started(true);
            tracing::info!(
                attempt_id = %attempt.id,
                exam_id,
                user_id = %ctx.user_id,
                "Attempt resumed"
            );
            return self.view(exam, attempt, true, now).await;
        }

        let outcome = self
            .store
            .create_attempt(NewAttempt {
                id: Uuid::new_v4().to_string(),
                exam_id: exam.id.clone(),
                user_id: ctx.user_id.clone(),
                allowed_attempts: exam.allowed_attempts,
                started_at: now,
            })
            .await?;

        let (attempt, resumed) = match outcome {
            CreateAttemptOutcome::Created(attempt) => (attempt, false),
            CreateAttemptOutcome::Existing(attempt) => (attempt, true),
            CreateAttemptOutcome::LimitReached => return Err(AttemptError::MaxAttemptsExceeded),
        };

        metrics::attempt_started(resumed);
        tracing::info!(
            attempt_id = %attempt.id,
            exam_id,
            user_id = %ctx.user_id,
            resumed,
            "Attempt started"
        );
        self.view(exam, attempt, resumed, now).await
    }

    pub(crate) async fn active_attempt(
        &self,
        ctx: &AuthContext,
        exam_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<AttemptView>, AttemptError> {
        let exam = self.exam(ctx, exam_id).await?;
        match self.live_attempt(&exam, &ctx.user_id, now).await? {
            Some(attempt) => Ok(Some(self.view(exam, attempt, true, now).await?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn attempt_detail(
        &self,
        ctx: &AuthContext,
        exam_id: &str,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<AttemptView, AttemptError> {
        let exam = self.exam(ctx, exam_id).await?;
        let attempt = self.owned_attempt(ctx, &exam, attempt_id, Ownership::Forbidden).await?;
        self.view(exam, attempt, false, now).await
    }

    pub(crate) async fn list_attempts(
        &self,
        ctx: &AuthContext,
        exam_id: &str,
    ) -> Result<Vec<ExamAttempt>, AttemptError> {
        let exam = self.exam(ctx, exam_id).await?;
        Ok(self.store.list_attempts(&exam.id, &ctx.user_id).await?)
    }

    /// Returns the number of answers written after de-duplication and
    /// filtering.
    pub(crate) async fn save_responses(
        &self,
        ctx: &AuthContext,
        exam_id: &str,
        attempt_id: &str,
        inputs: Vec<ResponseInput>,
        now: PrimitiveDateTime,
    ) -> Result<usize, AttemptError> {
        let exam = self.exam(ctx, exam_id).await?;
        let attempt = self.owned_attempt(ctx, &exam, attempt_id, Ownership::Forbidden).await?;
        if attempt.is_submitted() {
            return Err(AttemptError::AlreadySubmitted);
        }
        if inputs.is_empty() {
            return Ok(0);
        }

        let known: HashSet<String> = self
            .store
            .load_sections(&exam.id)
            .await?
            .into_iter()
            .flat_map(|item| item.questions)
            .map(|question| question.id)
            .collect();

        let mut latest: Vec<ResponseInput> = Vec::with_capacity(inputs.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for input in inputs {
            if !known.contains(&input.question_id) {
                tracing::warn!(
                    attempt_id,
                    question_id = %input.question_id,
                    "Dropping response for a question outside the exam"
                );
                continue;
            }
            match positions.get(&input.question_id) {
                Some(&index) => latest[index] = input,
                None => {
                    positions.insert(input.question_id.clone(), latest.len());
                    latest.push(input);
                }
            }
        }

        if latest.is_empty() {
            return Ok(0);
        }

        if !self.store.upsert_responses(&attempt.id, &latest, now).await? {
            return Err(AttemptError::AlreadySubmitted);
        }

        tracing::debug!(attempt_id, saved = latest.len(), "Responses saved");
        Ok(latest.len())
    }

    pub(crate) async fn submit(
        &self,
        ctx: &AuthContext,
        exam_id: &str,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<ExamAttempt, AttemptError> {
        let exam = self.exam(ctx, exam_id).await?;
        let attempt = self.owned_attempt(ctx, &exam, attempt_id, Ownership::Hidden).await?;
        if attempt.is_submitted() {
            return Err(AttemptError::AlreadySubmitted);
        }

        self.close_and_grade(&attempt, now, "manual")
            .await?
            .ok_or(AttemptError::AlreadySubmitted)
    }

    async fn exam(&self, ctx: &AuthContext, exam_id: &str) -> Result<Exam, AttemptError> {
        self.store
            .find_exam(&ctx.organization_id, exam_id)
            .await?
            .ok_or(AttemptError::NotFound("Exam not found"))
    }

    async fn owned_attempt(
        &self,
        ctx: &AuthContext,
        exam: &Exam,
        attempt_id: &str,
        ownership: Ownership,
    ) -> Result<ExamAttempt, AttemptError> {
        let attempt = self
            .store
            .find_attempt(attempt_id)
            .await?
            .filter(|attempt| attempt.exam_id == exam.id)
            .ok_or(AttemptError::NotFound("Attempt not found"))?;

        if attempt.user_id != ctx.user_id {
            return Err(match ownership {
                Ownership::Forbidden => AttemptError::Forbidden,
                Ownership::Hidden => AttemptError::NotFound("Attempt not found"),
            });
        }
        Ok(attempt)
    }

    /// The caller's in-progress attempt, unless its time ran out. Overdue
    /// attempts are graded and submitted on the spot.
    async fn live_attempt(
        &self,
        exam: &Exam,
        user_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<ExamAttempt>, AttemptError> {
        let Some(attempt) = self.store.find_unsubmitted(&exam.id, user_id).await? else {
            return Ok(None);
        };

        if !timing::is_expired(attempt.started_at, exam.time_limit_minutes, now) {
            return Ok(Some(attempt));
        }

        tracing::info!(attempt_id = %attempt.id, exam_id = %exam.id, "Attempt time limit exceeded");
        self.close_and_grade(&attempt, now, "expired").await?;
        Ok(None)
    }

    async fn close_and_grade(
        &self,
        attempt: &ExamAttempt,
        now: PrimitiveDateTime,
        trigger: &'static str,
    ) -> Result<Option<ExamAttempt>, AttemptError> {
        let Some(closed) = self.store.close_attempt(&attempt.id, now).await? else {
            tracing::info!(attempt_id = %attempt.id, trigger, "Attempt was already submitted");
            return Ok(None);
        };

        // Saves are refused once closed, so these responses are final.
        let questions: HashMap<String, Question> = self
            .store
            .load_sections(&closed.exam_id)
            .await?
            .into_iter()
            .flat_map(|item| item.questions)
            .map(|question| (question.id.clone(), question))
            .collect();
        let responses = self.store.list_responses(&closed.id).await?;

        let grade = self.grader.grade_attempt(&questions, &responses).await;
        let submitted = self.store.record_grade(&closed.id, &grade, now).await?;

        metrics::attempt_submitted(trigger);
        tracing::info!(
            attempt_id = %submitted.id,
            exam_id = %submitted.exam_id,
            score = grade.total_score,
            needs_review = grade.needs_review,
            trigger,
            "Attempt submitted"
        );
        Ok(Some(submitted))
    }

    async fn view(
        &self,
        exam: Exam,
        attempt: ExamAttempt,
        resumed: bool,
        now: PrimitiveDateTime,
    ) -> Result<AttemptView, AttemptError> {
        let mut sections = self.store.load_sections(&exam.id).await?;
        if exam.randomize_order {
            ordering::shuffle_questions(&mut sections, &attempt.id);
        }
        let responses = self.store.list_responses(&attempt.id).await?;
        let remaining_seconds = match attempt.submitted_at {
            Some(_) => None,
            None => timing::remaining_seconds(attempt.started_at, exam.time_limit_minutes, now),
        };

        Ok(AttemptView { attempt, resumed, remaining_seconds, exam, sections, responses })
    }
}
