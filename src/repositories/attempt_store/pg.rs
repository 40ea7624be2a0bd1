use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use super::{AttemptStore, CreateAttemptOutcome, NewAttempt, ResponseInput, SectionWithQuestions};
use crate::db::models::{Exam, ExamAttempt, ExamResponse, Question};
use crate::repositories::{attempts, exams, questions, responses, sections};
use crate::services::grading::AttemptGrade;

#[derive(Debug, Clone)]
pub(crate) struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn find_exam(&self, organization_id: &str, exam_id: &str) -> Result<Option<Exam>> {
        exams::find_by_id(&self.pool, organization_id, exam_id).await.context("find_exam")
    }

    async fn load_sections(&self, exam_id: &str) -> Result<Vec<SectionWithQuestions>> {
        let section_rows =
            sections::list_by_exam(&self.pool, exam_id).await.context("load exam sections")?;
        let question_rows =
            questions::list_by_exam(&self.pool, exam_id).await.context("load exam questions")?;

        let mut by_section: HashMap<String, Vec<Question>> = HashMap::new();
        for row in question_rows {
            let question_id = row.id.clone();
            match Question::try_from(row) {
                Ok(question) => {
                    by_section.entry(question.section_id.clone()).or_default().push(question)
                }
                Err(err) => {
                    tracing::warn!(
                        exam_id,
                        question_id = %question_id,
                        error = %err,
                        "Skipping malformed question"
                    );
                }
            }
        }

        Ok(section_rows
            .into_iter()
            .map(|section| {
                let questions = by_section.remove(&section.id).unwrap_or_default();
                SectionWithQuestions { section, questions }
            })
            .collect())
    }

    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<ExamAttempt>> {
        attempts::find_by_id(&self.pool, attempt_id).await.context("find_attempt")
    }

    async fn find_unsubmitted(&self, exam_id: &str, user_id: &str) -> Result<Option<ExamAttempt>> {
        attempts::find_unsubmitted(&self.pool, exam_id, user_id).await.context("find_unsubmitted")
    }

    async fn list_attempts(&self, exam_id: &str, user_id: &str) -> Result<Vec<ExamAttempt>> {
        attempts::list_by_exam_and_user(&self.pool, exam_id, user_id)
            .await
            .context("list_attempts")
    }

    async fn create_attempt(&self, attempt: NewAttempt) -> Result<CreateAttemptOutcome> {
        let mut tx = self.pool.begin().await.context("begin create_attempt")?;

        attempts::acquire_exam_user_lock(&mut *tx, &attempt.exam_id, &attempt.user_id)
            .await
            .context("lock exam/user pair")?;

        if let Some(existing) =
            attempts::find_unsubmitted(&mut *tx, &attempt.exam_id, &attempt.user_id).await?
        {
            tx.commit().await?;
            return Ok(CreateAttemptOutcome::Existing(existing));
        }

        if let Some(limit) = attempt.allowed_attempts {
            let used =
                attempts::count_by_exam_and_user(&mut *tx, &attempt.exam_id, &attempt.user_id)
                    .await?;
            if used >= i64::from(limit) {
                tx.commit().await?;
                return Ok(CreateAttemptOutcome::LimitReached);
            }
        }

        let created = attempts::create(
            &mut *tx,
            attempts::CreateAttempt {
                id: &attempt.id,
                exam_id: &attempt.exam_id,
                user_id: &attempt.user_id,
                started_at: attempt.started_at,
            },
        )
        .await
        .context("insert attempt")?;

        let outcome = match created {
            Some(row) => CreateAttemptOutcome::Created(row),
            None => {
                let existing =
                    attempts::find_unsubmitted(&mut *tx, &attempt.exam_id, &attempt.user_id)
                        .await?
                        .context("attempt insert conflicted but no in-progress attempt found")?;
                CreateAttemptOutcome::Existing(existing)
            }
        };

        tx.commit().await.context("commit create_attempt")?;
        Ok(outcome)
    }

    async fn list_responses(&self, attempt_id: &str) -> Result<Vec<ExamResponse>> {
        responses::list_by_attempt(&self.pool, attempt_id).await.context("list_responses")
    }

    async fn upsert_responses(
        &self,
        attempt_id: &str,
        inputs: &[ResponseInput],
        now: PrimitiveDateTime,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("begin upsert_responses")?;

        match attempts::lock_for_share(&mut *tx, attempt_id).await? {
            Some(None) => {}
            Some(Some(_)) | None => {
                tx.rollback().await?;
                return Ok(false);
            }
        }

        let batch = responses::UpsertBatch {
            ids: inputs.iter().map(|_| Uuid::new_v4().to_string()).collect(),
            question_ids: inputs.iter().map(|input| input.question_id.clone()).collect(),
            responses: inputs.iter().map(|input| input.response.clone()).collect(),
        };
        responses::upsert_batch(&mut *tx, attempt_id, batch, now)
            .await
            .context("upsert responses")?;

        tx.commit().await.context("commit upsert_responses")?;
        Ok(true)
    }

    async fn close_attempt(
        &self,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<ExamAttempt>> {
        attempts::close(&self.pool, attempt_id, now).await.context("close attempt")
    }

    async fn record_grade(
        &self,
        attempt_id: &str,
        grade: &AttemptGrade,
        now: PrimitiveDateTime,
    ) -> Result<ExamAttempt> {
        let mut tx = self.pool.begin().await.context("begin record_grade")?;

        for item in &grade.responses {
            responses::write_grade(
                &mut *tx,
                attempt_id,
                responses::ResponseGrade {
                    question_id: &item.question_id,
                    score: item.score,
                    is_correct: item.is_correct,
                    feedback: item.feedback.as_deref(),
                    needs_review: item.needs_review,
                },
                now,
            )
            .await
            .context("write response grade")?;
        }

        let attempt = attempts::record_grade(
            &mut *tx,
            attempt_id,
            attempts::RecordGrade {
                score: grade.total_score,
                needs_review: grade.needs_review,
                graded_at: now,
            },
        )
        .await
        .context("record attempt grade")?;

        tx.commit().await.context("commit record_grade")?;
        Ok(attempt)
    }
}
