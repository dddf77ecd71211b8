use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tourdesk_booking::BookingError;
use tourdesk_catalog::CatalogError;
use tourdesk_core::StoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    RateLimited,
    ServiceUnavailable(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string()),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::MissingFields
            | BookingError::InvalidEmailFormat
            | BookingError::InvalidGuestCount
            | BookingError::InsufficientCapacity { .. } => AppError::ValidationError(message),
            BookingError::ScheduleNotFound | BookingError::BookingNotFound => AppError::NotFoundError(message),
            BookingError::Unauthorized => AppError::AuthorizationError(message),
            // Retries exhausted: the request was fine, the server was busy.
            BookingError::TransactionConflict { .. } => AppError::ServiceUnavailable(message),
            BookingError::InvalidTransition { .. } => AppError::ConflictError(message),
            // Already logged by the engine; callers only see the generic text.
            BookingError::Unexpected(_) => AppError::InternalServerError(message),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MissingFields(msg) | CatalogError::Invalid(msg) => AppError::ValidationError(msg),
            CatalogError::UnknownStatus(status) => {
                AppError::InternalServerError(format!("Unknown schedule status: {}", status))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => AppError::ConflictError("Request conflicted with a concurrent update, please retry".to_string()),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}
