use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::oracle::{GradingOracle, OracleRequest, OracleVerdict};
use crate::core::config::GradingSettings;
use crate::db::types::QuestionType;

const GRADING_SYSTEM_PROMPT: &str =
    r#"You are an experienced examiner grading one answer from an online exam.
Compare the student's answer with the question and, when given, the reference answer.
Award partial credit for partially correct reasoning. Never exceed the maximum points.

Reply with strict JSON only:
{
  "is_correct": <true when the answer is essentially fully correct>,
  "score": <number between 0 and the maximum points>,
  "feedback": "<one or two sentences for the student>"
}
"#;

/// OpenAI-compatible chat-completions client. One request per answer, no
/// retries; the request timeout bounds each call.
#[derive(Debug, Clone)]
pub(crate) struct LlmGradingOracle {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl LlmGradingOracle {
    pub(crate) fn from_settings(settings: &GradingSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.request_timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.openai_api_key.clone(),
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }

    fn payload(&self, request: &OracleRequest<'_>) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": GRADING_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt(request)}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        })
    }
}

#[async_trait]
impl GradingOracle for LlmGradingOracle {
    async fn grade(&self, request: OracleRequest<'_>) -> Result<OracleVerdict> {
        let timer = Instant::now();
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(&request))
            .send()
            .await
            .context("Failed to call grading model")?;

        let status = response.status();
        let body: Value = response.json().await.context("Grading model returned non-JSON body")?;
        if !status.is_success() {
            anyhow::bail!("Grading model error {status}: {body}");
        }

        let verdict = parse_completion(&body)?;

        tracing::info!(
            model = %self.model,
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used = body.pointer("/usage/total_tokens").and_then(|usage| usage.as_u64()),
            "Oracle grading completed"
        );

        Ok(verdict)
    }
}

fn user_prompt(request: &OracleRequest<'_>) -> String {
    let kind = match request.question_type {
        QuestionType::CodeBased => "programming",
        _ => "open-ended",
    };
    let reference = request.reference_answer.unwrap_or("(none provided)");

    format!(
        "Question type: {kind}\nMaximum points: {}\n\nQuestion:\n{}\n\n\
         Reference answer:\n{reference}\n\nStudent answer:\n{}\n",
        request.max_points, request.question, request.response
    )
}

fn parse_completion(body: &Value) -> Result<OracleVerdict> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .context("Missing completion content")?;

    serde_json::from_str(content.trim()).context("Failed to parse grading JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_completion_reads_message_content() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": "{\"is_correct\": true, \"score\": 4.5, \"feedback\": \"Good\"}"
                }
            }]
        });

        let verdict = parse_completion(&body).expect("verdict");
        assert_eq!(
            verdict,
            OracleVerdict { is_correct: true, score: 4.5, feedback: Some("Good".to_string()) }
        );
    }

    #[test]
    fn parse_completion_accepts_camel_case_and_missing_feedback() {
        let body = json!({
            "choices": [{"message": {"content": "{\"isCorrect\": false, \"score\": 0}"}}]
        });

        let verdict = parse_completion(&body).expect("verdict");
        assert!(!verdict.is_correct);
        assert_eq!(verdict.feedback, None);
    }

    #[test]
    fn parse_completion_rejects_garbage() {
        let missing = json!({"choices": []});
        assert!(parse_completion(&missing).is_err());

        let prose = json!({"choices": [{"message": {"content": "Looks fine to me"}}]});
        assert!(parse_completion(&prose).is_err());
    }

    #[test]
    fn user_prompt_mentions_reference_and_limit() {
        let prompt = user_prompt(&OracleRequest {
            question: "Explain ownership",
            question_type: QuestionType::OpenEnded,
            reference_answer: None,
            response: "Each value has one owner",
            max_points: 5.0,
        });

        assert!(prompt.contains("Maximum points: 5"));
        assert!(prompt.contains("(none provided)"));
        assert!(prompt.contains("Each value has one owner"));
    }
}
