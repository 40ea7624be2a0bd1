use thiserror::Error;

use crate::api::errors::ApiError;

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("access denied")]
    Forbidden,
    #[error("exam is not available")]
    ExamUnavailable,
    #[error("maximum number of attempts reached")]
    MaxAttemptsExceeded,
    #[error("attempt already submitted")]
    AlreadySubmitted,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::NotFound(message) => ApiError::NotFound(message.to_string()),
            AttemptError::Forbidden => ApiError::Forbidden("Access denied"),
            AttemptError::ExamUnavailable => {
                ApiError::NotFound("Exam is not available".to_string())
            }
            AttemptError::MaxAttemptsExceeded => {
                ApiError::Forbidden("Maximum number of attempts reached")
            }
            AttemptError::AlreadySubmitted => {
                ApiError::BadRequest("Attempt already submitted".to_string())
            }
            AttemptError::Validation(message) => ApiError::BadRequest(message),
            AttemptError::Storage(err) => {
                ApiError::internal(format!("{err:#}"), "Attempt storage failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;

    fn status_of(err: AttemptError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn maps_to_http_statuses() {
        assert_eq!(status_of(AttemptError::NotFound("Attempt not found")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AttemptError::ExamUnavailable), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AttemptError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AttemptError::MaxAttemptsExceeded), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AttemptError::AlreadySubmitted), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AttemptError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AttemptError::Storage(anyhow::anyhow!("db down"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
