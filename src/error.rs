use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::backend::BackendError;
use crate::views;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Debug, Serialize, strum_macros::AsRefStr)]
#[serde(tag = "type", content = "data")]
pub enum Error {
    LoginFail,

    // -- Config errors.
    EnvVarError(String),
    Io(String),

    // -- Auth errors.
    Unauthenticated,
    Forbidden,
    SessionInvalid,
    SessionEncodeFail,

    // -- Request errors.
    InvalidInput { field: String, reason: String },
    RateLimited,

    // -- Model errors.
    SongNotFound { id: String },
    UploadVerificationFailed { path: String },

    // -- Collaborator errors.
    Backend(String),
}

impl Error {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, client_error) = self.client_status_and_error();
        self.log(status_code);

        let response_body = serde_json::json!({
            "success": false,
            "error": client_error.as_ref(),
            "message": self.client_message(),
        });

        (status_code, Json(response_body)).into_response()
    }
}

impl Error {
    pub fn client_status_and_error(&self) -> (StatusCode, ClientError) {
        match self {
            Self::LoginFail => (StatusCode::UNAUTHORIZED, ClientError::LOGIN_FAIL),

            Self::Unauthenticated | Self::SessionInvalid => {
                (StatusCode::UNAUTHORIZED, ClientError::NO_AUTH)
            }
            Self::Forbidden => (StatusCode::FORBIDDEN, ClientError::FORBIDDEN),

            Self::InvalidInput { .. } => (StatusCode::BAD_REQUEST, ClientError::INVALID_PARAMS),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, ClientError::RATE_LIMITED),

            Self::SongNotFound { .. } => (StatusCode::NOT_FOUND, ClientError::RESOURCE_NOT_FOUND),
            Self::UploadVerificationFailed { .. } => {
                (StatusCode::NOT_FOUND, ClientError::UPLOAD_NOT_VERIFIED)
            }

            Self::EnvVarError(_) | Self::Io(_) | Self::SessionEncodeFail | Self::Backend(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ClientError::SERVICE_ERROR,
            ),
        }
    }

    /// Message safe to show to the caller; collaborator details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            Self::LoginFail => "Invalid email or password".to_string(),
            Self::Unauthenticated | Self::SessionInvalid => "Please log in first".to_string(),
            Self::Forbidden => "You are not allowed to do that".to_string(),
            Self::InvalidInput { field, reason } => format!("{field}: {reason}"),
            Self::RateLimited => "Too many requests, slow down".to_string(),
            Self::SongNotFound { .. } => "Song not found".to_string(),
            Self::UploadVerificationFailed { path } => {
                format!("Uploaded file not found in storage: {path}")
            }
            Self::EnvVarError(_) | Self::Io(_) | Self::SessionEncodeFail | Self::Backend(_) => {
                "Could not complete request".to_string()
            }
        }
    }

    fn log(&self, status: StatusCode) {
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::debug!("request rejected: {self}");
        }
    }
}

#[derive(Debug, strum_macros::AsRefStr)]
#[allow(non_camel_case_types)]
pub enum ClientError {
    LOGIN_FAIL,
    NO_AUTH,
    FORBIDDEN,
    INVALID_PARAMS,
    RATE_LIMITED,
    RESOURCE_NOT_FOUND,
    UPLOAD_NOT_VERIFIED,
    SERVICE_ERROR,
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        Error::Backend(err.to_string())
    }
}

impl From<std::env::VarError> for Error {
    fn from(err: std::env::VarError) -> Self {
        Error::EnvVarError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Malformed or mistyped JSON bodies are the caller's input error.
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::invalid("body", rejection.body_text())
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        Error::SessionInvalid
    }
}

/// Same error, rendered as an HTML page for browser-facing routes.
#[derive(Debug)]
pub struct PageError(pub Error);

pub type PageResult<T> = core::result::Result<T, PageError>;

impl From<Error> for PageError {
    fn from(err: Error) -> Self {
        PageError(err)
    }
}

impl From<BackendError> for PageError {
    fn from(err: BackendError) -> Self {
        PageError(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status_code, _) = self.0.client_status_and_error();
        self.0.log(status_code);

        let page = views::pages::error_page(status_code, &self.0.client_message());
        (status_code, page).into_response()
    }
}
