use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service::ServiceError;
use session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Service(ServiceError::Forbidden(message)) => (StatusCode::FORBIDDEN, message),
            AppError::Service(ServiceError::NotFound(message)) => (StatusCode::NOT_FOUND, message),
            AppError::Service(ServiceError::Validation(message)) => (StatusCode::BAD_REQUEST, message),
            AppError::Service(ServiceError::DataUnavailable(e)) => {
                tracing::error!(error = %e, "Backend unavailable.");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The data is unavailable right now. Try again shortly.".to_string(),
                )
            }
            AppError::Service(other) => {
                tracing::error!(error = ?other, "Service error.");
                (StatusCode::BAD_GATEWAY, "The backend request failed".to_string())
            }
            AppError::Session(SessionError::Backend(e)) if e.is_unavailable() => {
                tracing::error!(error = %e, "Backend unavailable while resolving the caller.");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The data is unavailable right now. Try again shortly.".to_string(),
                )
            }
            AppError::Session(other) => {
                tracing::warn!(error = %other, "Caller could not be resolved.");
                (StatusCode::UNAUTHORIZED, "Invalid or expired session".to_string())
            }
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
