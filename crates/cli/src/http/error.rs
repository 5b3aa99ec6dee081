use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;

/// A status code with the plain-text message sent as the response body.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}

impl From<bgw_core::Error> for AppError {
    fn from(err: bgw_core::Error) -> Self {
        use bgw_core::Error;

        let status = match &err {
            Error::NotFound(_) | Error::FolderNotFound(_) | Error::BucketNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Error::AlreadyExists(_) => StatusCode::CONFLICT,
            Error::SameName(_) | Error::InvalidKey(_) => StatusCode::BAD_REQUEST,
            Error::Network(_) | Error::Auth(_) => StatusCode::BAD_GATEWAY,
            Error::Unconfirmed(_)
            | Error::Config(_)
            | Error::Archive(_)
            | Error::Io(_)
            | Error::General(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if err.is_rejection() {
            tracing::debug!(error = %err, "Request rejected");
        } else {
            tracing::error!(error = %err, "Request failed");
        }
        AppError::new(status, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::from(bgw_core::Error::Io(err))
    }
}
