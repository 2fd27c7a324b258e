use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::engine::{SelectError, SubmissionError};
use crate::services::drill::DrillError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse { success: true, data })
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, code, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "CONFIGURATION_ERROR".to_string(),
            message: message.into(),
            is_operational: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, error = %self.message, "request failed");
            "Internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        let code = match &err {
            SubmissionError::NoPendingQuestion => "NO_PENDING_QUESTION",
            SubmissionError::QuestionMismatch { .. } => "QUESTION_MISMATCH",
            SubmissionError::QuestionAlreadyGraded => "QUESTION_ALREADY_GRADED",
        };
        Self::conflict(code, err.to_string())
    }
}

impl From<DrillError> for AppError {
    fn from(err: DrillError) -> Self {
        match err {
            DrillError::SessionNotFound => Self::not_found("Session not found"),
            DrillError::SessionForbidden => Self::forbidden("Session belongs to another user"),
            DrillError::ItemNotFound(id) => Self::not_found(format!("Verb not found: {id}")),
            DrillError::Select(SelectError::EmptyCatalog) => {
                Self::configuration("The verb catalog is empty")
            }
            DrillError::Select(SelectError::QuestionPending) => Self::conflict(
                "QUESTION_PENDING",
                "Answer the current question before asking for the next one",
            ),
            DrillError::Submission(inner) => inner.into(),
            DrillError::Contention => {
                Self::conflict("CONFLICT", "Session changed while grading, please retry")
            }
            DrillError::Database(inner) => Self::internal(inner.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::internal(err.to_string())
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}
