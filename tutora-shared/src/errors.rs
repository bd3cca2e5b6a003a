use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Booking lifecycle errors
/// - E2xxx: Classroom/attendance errors
/// - E3xxx: Payment ledger errors
/// - E4xxx: Recurring series errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,

    // Booking lifecycle (E1xxx)
    BookingNotFound,
    TeacherNotFound,
    StudentNotFound,
    BookingStatusConflict,
    CompletionAlreadyReversed,

    // Classroom (E2xxx)
    SessionNotFound,
    ComplaintNotFound,
    ComplaintAlreadyReviewed,
    UnknownAttendanceAction,

    // Payments (E3xxx)
    TransactionNotFound,
    TransactionAlreadyPaid,
    NoPendingTransactions,

    // Recurring series (E4xxx)
    PatternNotFound,
    InsufficientCredit,
    EmptyWeekdaySet,
    EmptySeries,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::BadRequest => "E0006",

            // Booking lifecycle
            Self::BookingNotFound => "E1001",
            Self::TeacherNotFound => "E1002",
            Self::StudentNotFound => "E1003",
            Self::BookingStatusConflict => "E1004",
            Self::CompletionAlreadyReversed => "E1005",

            // Classroom
            Self::SessionNotFound => "E2001",
            Self::ComplaintNotFound => "E2002",
            Self::ComplaintAlreadyReviewed => "E2003",
            Self::UnknownAttendanceAction => "E2004",

            // Payments
            Self::TransactionNotFound => "E3001",
            Self::TransactionAlreadyPaid => "E3002",
            Self::NoPendingTransactions => "E3003",

            // Recurring series
            Self::PatternNotFound => "E4001",
            Self::InsufficientCredit => "E4002",
            Self::EmptyWeekdaySet => "E4003",
            Self::EmptySeries => "E4004",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound
            | Self::BookingNotFound
            | Self::TeacherNotFound
            | Self::StudentNotFound
            | Self::SessionNotFound
            | Self::ComplaintNotFound
            | Self::TransactionNotFound
            | Self::PatternNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            // State-conflict and validation failures all surface as 400
            // with the offending state echoed in the details.
            Self::ValidationError
            | Self::BadRequest
            | Self::BookingStatusConflict
            | Self::CompletionAlreadyReversed
            | Self::ComplaintAlreadyReviewed
            | Self::UnknownAttendanceAction
            | Self::TransactionAlreadyPaid
            | Self::NoPendingTransactions
            | Self::InsufficientCredit
            | Self::EmptyWeekdaySet
            | Self::EmptySeries => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// A precondition on the entity's current status was not met. The
    /// current status is always echoed back to the caller.
    pub fn state_conflict(code: ErrorCode, message: impl Into<String>, current_status: &str) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(serde_json::json!({ "current_status": current_status })),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
