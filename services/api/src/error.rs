//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and the JSON
//! envelope every failed request is answered with.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use interview_core::{InterviewError, PortError};
use serde::Serialize;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A rule of the interview platform rejected the request.
    #[error(transparent)]
    Interview(#[from] InterviewError),

    /// The identity headers were missing or malformed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request payload, with per-field details when available.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

/// A single rejected field of a request payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Status, machine-readable code and client-facing message for a core error.
fn interview_status(err: &InterviewError) -> (StatusCode, &'static str) {
    use InterviewError::*;
    match err {
        Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        EmptyQuestionPool => (StatusCode::BAD_REQUEST, "EMPTY_QUESTION_POOL"),
        NotFoundOrDenied => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        InvalidToken => (StatusCode::NOT_FOUND, "INVALID_TOKEN"),
        Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        EmailMismatch => (StatusCode::FORBIDDEN, "EMAIL_MISMATCH"),
        AlreadyUsed => (StatusCode::CONFLICT, "TOKEN_ALREADY_USED"),
        InterviewClosed => (StatusCode::CONFLICT, "INTERVIEW_CLOSED"),
        SessionAlreadyCompleted => (StatusCode::CONFLICT, "SESSION_COMPLETED"),
        DuplicateOrder(_) => (StatusCode::CONFLICT, "DUPLICATE_RESPONSE"),
        OutOfOrder { .. } => (StatusCode::CONFLICT, "OUT_OF_ORDER"),
        NoMoreQuestions => (StatusCode::CONFLICT, "NO_MORE_QUESTIONS"),
        Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        UpstreamUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE"),
        Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

fn internal(detail: &dyn std::fmt::Display) -> (StatusCode, Option<&'static str>, String) {
    tracing::error!("Internal error: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Some("INTERNAL_ERROR"),
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut errors = None;
        let (status, code, message) = match self {
            ApiError::Interview(InterviewError::Internal(detail)) => internal(&detail),
            ApiError::Interview(err) => {
                let (status, code) = interview_status(&err);
                if status == StatusCode::SERVICE_UNAVAILABLE {
                    tracing::warn!("Upstream collaborator failed: {}", err);
                }
                (status, Some(code), err.to_string())
            }
            ApiError::Port(err) => match InterviewError::from(err) {
                InterviewError::Internal(detail) => internal(&detail),
                err => {
                    let (status, code) = interview_status(&err);
                    (status, Some(code), err.to_string())
                }
            },
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, Some("UNAUTHORIZED"), msg),
            ApiError::Validation {
                message,
                errors: fields,
            } => {
                if !fields.is_empty() {
                    errors = Some(fields);
                }
                (StatusCode::BAD_REQUEST, Some("VALIDATION_ERROR"), message)
            }
            ApiError::Config(e) => internal(&e),
            ApiError::Database(e) => internal(&e),
            ApiError::Migration(e) => internal(&e),
            ApiError::Io(e) => internal(&e),
            ApiError::Internal(msg) => internal(&msg),
        };

        let body = ErrorBody {
            message,
            code,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        let message = match details.as_slice() {
            [single] => single.message.clone(),
            _ => format!("{} validation errors", details.len()),
        };
        ApiError::Validation {
            message,
            errors: details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (InterviewError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (InterviewError::EmptyQuestionPool, StatusCode::BAD_REQUEST),
            (InterviewError::NotFoundOrDenied, StatusCode::NOT_FOUND),
            (InterviewError::InvalidToken, StatusCode::NOT_FOUND),
            (InterviewError::Forbidden, StatusCode::FORBIDDEN),
            (InterviewError::EmailMismatch, StatusCode::FORBIDDEN),
            (InterviewError::AlreadyUsed, StatusCode::CONFLICT),
            (InterviewError::DuplicateOrder(2), StatusCode::CONFLICT),
            (
                InterviewError::UpstreamUnavailable("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (InterviewError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn envelope_carries_message_and_code() {
        let (status, body) = body_json(InterviewError::AlreadyUsed.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "TOKEN_ALREADY_USED");
        assert_eq!(body["message"], "This interview link has already been used");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let (status, body) =
            body_json(ApiError::Port(PortError::Unexpected("pool exploded".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn port_not_found_is_masked() {
        let (status, body) = body_json(ApiError::Port(PortError::NotFound("session".into()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[derive(Validate)]
    struct Payload {
        #[validate(email(message = "A valid email is required"))]
        email: String,
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        let invalid = Payload {
            email: "nope".to_string(),
        };
        let err: ApiError = invalid.validate().unwrap_err().into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "A valid email is required");
        assert_eq!(body["errors"][0]["field"], "email");
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let (status, body) = body_json(ApiError::Unauthorized("x-user-id header is required".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}
