//! API error types rendered as the uniform failure envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::appointment::AppointmentError;
use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::directory::DirectoryError;
use crate::identity::IdentityError;
use crate::vitals::VitalsError;

/// `{"success": false, "code": ..., "message": ...}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Slot conflict: {0}")]
    SlotConflict(String),
    #[error("Invalid state transition: {0}")]
    InvalidState(String),
    #[error("Conflict: {message}")]
    Conflict { code: &'static str, message: String },
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail.clone()),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Retry after {retry_after}s"),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::SlotConflict(detail) => {
                (StatusCode::CONFLICT, "SLOT_CONFLICT", detail.clone())
            }
            ApiError::InvalidState(detail) => (
                StatusCode::CONFLICT,
                "INVALID_STATE_TRANSITION",
                detail.clone(),
            ),
            ApiError::Conflict { code, message } => (StatusCode::CONFLICT, *code, message.clone()),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
        };

        let body = ErrorBody {
            success: false,
            code,
            message,
        };

        let mut response = (status, Json(body)).into_response();
        // Add retry-after header for rate limited responses
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
            CoreError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<AppointmentError> for ApiError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::NotFound { .. } => ApiError::NotFound(message),
            AppointmentError::Unauthorized { .. } => ApiError::Forbidden(message),
            AppointmentError::SlotConflict { .. } => ApiError::SlotConflict(message),
            AppointmentError::Validation(_) => ApiError::BadRequest(message),
            AppointmentError::InvalidStateTransition { .. } => ApiError::InvalidState(message),
            AppointmentError::DoctorUnavailable => ApiError::Conflict {
                code: "DOCTOR_UNAVAILABLE",
                message,
            },
            AppointmentError::Database(e) => e.into(),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        let message = err.to_string();
        match err {
            DirectoryError::NotFound { .. } => ApiError::NotFound(message),
            DirectoryError::Validation(_) => ApiError::BadRequest(message),
            DirectoryError::DuplicateEmail(_) => ApiError::Conflict {
                code: "DUPLICATE_EMAIL",
                message,
            },
            DirectoryError::Database(e) => e.into(),
        }
    }
}

impl From<VitalsError> for ApiError {
    fn from(err: VitalsError) -> Self {
        let message = err.to_string();
        match err {
            VitalsError::NotFound { .. } => ApiError::NotFound(message),
            VitalsError::Validation(_) => ApiError::BadRequest(message),
            VitalsError::Database(e) => e.into(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredential => ApiError::Unauthorized,
            IdentityError::Database(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
