mod llm;
pub(crate) mod oracle;
mod rules;

use std::collections::HashMap;
use std::sync::Arc;

pub(crate) use llm::LlmGradingOracle;
use oracle::{GradingOracle, OracleRequest};

use crate::core::config::GradingSettings;
use crate::core::metrics;
use crate::db::models::{ExamResponse, Question, QuestionKind};

pub(crate) const MANUAL_REVIEW_FEEDBACK: &str = "Needs manual review";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResponseGrade {
    pub(crate) question_id: String,
    pub(crate) score: f64,
    pub(crate) is_correct: bool,
    pub(crate) feedback: Option<String>,
    pub(crate) needs_review: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttemptGrade {
    pub(crate) total_score: f64,
    pub(crate) needs_review: bool,
    pub(crate) responses: Vec<ResponseGrade>,
}

/// Type-dispatched grading of stored responses. The oracle is optional;
/// without one, subjective answers are left for manual review.
#[derive(Clone, Default)]
pub(crate) struct Grader {
    oracle: Option<Arc<dyn GradingOracle>>,
}

impl Grader {
    pub(crate) fn new(oracle: Option<Arc<dyn GradingOracle>>) -> Self {
        Self { oracle }
    }

    pub(crate) fn from_settings(settings: &GradingSettings) -> anyhow::Result<Self> {
        if !settings.oracle_enabled() {
            tracing::info!("Grading oracle disabled; subjective answers need manual review");
            return Ok(Self::default());
        }

        let oracle = LlmGradingOracle::from_settings(settings)?;
        Ok(Self::new(Some(Arc::new(oracle))))
    }

    /// Grades every response; `questions` is keyed by question id. Responses
    /// whose question is gone score zero.
    pub(crate) async fn grade_attempt(
        &self,
        questions: &HashMap<String, Question>,
        responses: &[ExamResponse],
    ) -> AttemptGrade {
        let mut graded = Vec::with_capacity(responses.len());
        for response in responses {
            let question = questions.get(&response.question_id);
            graded.push(self.grade_response(question, response).await);
        }

        AttemptGrade {
            total_score: graded.iter().map(|grade| grade.score).sum(),
            needs_review: graded.iter().any(|grade| grade.needs_review),
            responses: graded,
        }
    }

    async fn grade_response(
        &self,
        question: Option<&Question>,
        response: &ExamResponse,
    ) -> ResponseGrade {
        let question_id = response.question_id.clone();
        let answer = response.response.as_deref();

        let Some(question) = question else {
            metrics::grading_result("missing_question");
            return ResponseGrade::zero(question_id);
        };

        let objective = match &question.kind {
            QuestionKind::MultipleChoice { correct_option, .. } => {
                Some(answer.is_some_and(|value| {
                    rules::multiple_choice_is_correct(correct_option, value)
                }))
            }
            QuestionKind::ShortAnswer { correct_answer } => Some(
                answer.is_some_and(|value| rules::short_answer_is_correct(correct_answer, value)),
            ),
            QuestionKind::OpenEnded { .. } | QuestionKind::CodeBased { .. } => None,
        };

        if let Some(is_correct) = objective {
            metrics::grading_result(if is_correct { "correct" } else { "incorrect" });
            let score = if is_correct { question.points } else { 0.0 };
            return ResponseGrade {
                question_id,
                score,
                is_correct,
                feedback: None,
                needs_review: false,
            };
        }

        if rules::is_blank(answer) {
            metrics::grading_result("blank");
            return ResponseGrade::zero(question_id);
        }

        self.grade_with_oracle(question, answer.unwrap_or_default()).await
    }

    async fn grade_with_oracle(&self, question: &Question, answer: &str) -> ResponseGrade {
        let Some(oracle) = &self.oracle else {
            metrics::grading_result("needs_review");
            return ResponseGrade::manual_review(question.id.clone());
        };

        let request = OracleRequest {
            question: &question.content,
            question_type: question.kind.question_type(),
            reference_answer: question.kind.stored_answer(),
            response: answer,
            max_points: question.points,
        };

        match oracle.grade(request).await {
            Ok(verdict) => {
                metrics::grading_result("oracle");
                ResponseGrade {
                    question_id: question.id.clone(),
                    score: rules::clamp_score(verdict.score, question.points),
                    is_correct: verdict.is_correct,
                    feedback: verdict.feedback,
                    needs_review: false,
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    question_id = %question.id,
                    "Grading oracle failed; leaving answer for manual review"
                );
                metrics::grading_result("needs_review");
                ResponseGrade::manual_review(question.id.clone())
            }
        }
    }
}

impl ResponseGrade {
    fn zero(question_id: String) -> Self {
        Self { question_id, score: 0.0, is_correct: false, feedback: None, needs_review: false }
    }

    fn manual_review(question_id: String) -> Self {
        Self {
            question_id,
            score: 0.0,
            is_correct: false,
            feedback: Some(MANUAL_REVIEW_FEEDBACK.to_string()),
            needs_review: true,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::oracle::{GradingOracle, OracleRequest, OracleVerdict};

    /// Oracle double: a fixed score, or an error when `score` is `None`.
    #[derive(Debug, Default)]
    pub(crate) struct StubOracle {
        pub(crate) score: Option<f64>,
        pub(crate) calls: AtomicUsize,
    }

    impl StubOracle {
        pub(crate) fn scoring(score: f64) -> Self {
            Self { score: Some(score), calls: AtomicUsize::new(0) }
        }

        pub(crate) fn failing() -> Self {
            Self::default()
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GradingOracle for StubOracle {
        async fn grade(&self, request: OracleRequest<'_>) -> anyhow::Result<OracleVerdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.score {
                Some(score) => Ok(OracleVerdict {
                    is_correct: score >= request.max_points,
                    score,
                    feedback: Some("stub".to_string()),
                }),
                None => anyhow::bail!("oracle unavailable"),
            }
        }
    }
}
