//! Error types shared by the HTTP surface and the remote client

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Boundary classification of a failure, chosen where the error is raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Server,
    Network,
}

impl ErrorKind {
    /// Sentence shown in the error banner when the raw message is not meant
    /// for the user
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Please check the highlighted fields and try again.",
            ErrorKind::NotFound => "The requested item could not be found.",
            ErrorKind::Server => "Something went wrong on the server. Please try again.",
            ErrorKind::Network => {
                "Unable to reach the server. Please check your internet connection."
            }
        }
    }
}

/// Errors raised by the report-log service
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Storage(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                ErrorKind::Server
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Server | ErrorKind::Network => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "API error");
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a call to the remote task/staff API
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    /// HTTP status, absent for transport failures
    pub status: Option<u16>,
    pub message: String,
}

impl ClientError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            status: None,
            message: message.into(),
        }
    }

    /// Build from a non-success HTTP status and the server's message
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            404 => ErrorKind::NotFound,
            _ => ErrorKind::Server,
        };
        Self {
            kind,
            status: Some(status),
            message: message.into(),
        }
    }

    /// 401, 403 and 404 are final answers and must not be retried
    pub fn is_retryable(&self) -> bool {
        !matches!(self.status, Some(401) | Some(403) | Some(404))
    }

    /// Text for the error banner: validation and not-found messages are
    /// shown verbatim, everything else gets the generic sentence
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation | ErrorKind::NotFound if !self.message.is_empty() => {
                self.message.clone()
            }
            kind => kind.user_message().to_string(),
        }
    }
}
