use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::models::motion::MotionStatus;
use crate::responses::ApiErrorResponse;
use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    /// No resolved caller identity.
    Unauthenticated,
    /// Resolved identity lacks the role or relationship the action needs.
    Unauthorized(String),
    NotFound,
    InvalidTransition {
        from: MotionStatus,
        to: MotionStatus,
    },
    /// Request conflicts with the record's current state (already a member,
    /// motion not open for seconding).
    Conflict(String),
    BadRequest(String),
    /// Safe to retry: contention outlasted the store's retry budget or the
    /// store was unreachable.
    Transient(String),
    Store(StoreError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthenticated => write!(f, "Not authenticated"),
            AppError::Unauthorized(reason) => write!(f, "Not authorized: {reason}"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::InvalidTransition { from, to } => {
                write!(f, "Invalid status transition: {from} -> {to}")
            }
            AppError::Conflict(reason) => write!(f, "Conflict: {reason}"),
            AppError::BadRequest(reason) => write!(f, "Bad request: {reason}"),
            AppError::Transient(reason) => write!(f, "Temporarily unavailable: {reason}"),
            AppError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        }
        // Backend details stay in the log.
        let error = match self {
            AppError::Store(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(ApiErrorResponse {
            error,
            details: None,
        })
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AppError::Transient(e.to_string()),
            StoreError::Unavailable(_) => AppError::Transient(e.to_string()),
            // A path that cannot exist names a record that does not exist.
            StoreError::InvalidPath(_) | StoreError::NotFound(_) => AppError::NotFound,
            other => AppError::Store(other),
        }
    }
}
