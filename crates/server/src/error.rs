use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use services::services::{
    database_validator::DatabaseValidationError, generation::GenerationError,
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
    #[error("Failed to generate {what}")]
    Generation {
        what: &'static str,
        #[source]
        source: GenerationError,
    },
    #[error(transparent)]
    Json(#[from] JsonRejection),
    #[error(transparent)]
    Query(#[from] QueryRejection),
    #[error(transparent)]
    Path(#[from] PathRejection),
}

impl ApiError {
    /// `map_err` adapter naming the thing being generated in the 500 message.
    pub fn generating(what: &'static str) -> impl FnOnce(GenerationError) -> Self {
        move |source| Self::Generation { what, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Json(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Query(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Path(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Database(err) => {
                error!(error = %err, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            ApiError::DatabaseValidation(err) => {
                error!(error = %err, "Database check failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database check failed".to_string())
            }
            ApiError::Generation { what, source } => match source {
                GenerationError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                GenerationError::InvalidJson(cause) => {
                    error!(what, error = %cause, "Model returned invalid JSON");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "AI returned invalid JSON".to_string(),
                    )
                }
                GenerationError::Llm(cause) => {
                    error!(what, error = %cause, "Generation failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
                }
            },
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use services::services::llm_client::LlmError;

    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn generation_errors_map_to_status_codes() {
        let validation = ApiError::generating("quiz")(GenerationError::Validation("Missing topic".into()));
        assert_eq!(status_of(validation), StatusCode::BAD_REQUEST);

        let invalid = ApiError::generating("quiz")(LlmError::InvalidJson("x".into()).into());
        assert_eq!(status_of(invalid), StatusCode::INTERNAL_SERVER_ERROR);

        let provider = ApiError::generating("study plan")(LlmError::MissingApiKey.into());
        assert_eq!(provider.to_string(), "Failed to generate study plan");
        assert_eq!(status_of(provider), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_is_404() {
        assert_eq!(
            status_of(ApiError::NotFound("Project not found".into())),
            StatusCode::NOT_FOUND
        );
    }
}
