use async_trait::async_trait;
use serde::Deserialize;

use crate::db::types::QuestionType;

/// Everything the oracle sees about one subjective answer.
#[derive(Debug, Clone)]
pub(crate) struct OracleRequest<'a> {
    pub(crate) question: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) reference_answer: Option<&'a str>,
    pub(crate) response: &'a str,
    pub(crate) max_points: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct OracleVerdict {
    #[serde(alias = "isCorrect")]
    pub(crate) is_correct: bool,
    pub(crate) score: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

/// Scores open-ended and code answers. Implementations may fail; the grader
/// turns failures into manual-review results.
#[async_trait]
pub(crate) trait GradingOracle: Send + Sync {
    async fn grade(&self, request: OracleRequest<'_>) -> anyhow::Result<OracleVerdict>;
}
