use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;

use crate::db::UserWriteError;

/// Per-field validation messages, rendered as the body of a 400 response.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// 400; the body is the per-field error map itself.
    Validation(FieldErrors),

    /// 401 for the login endpoint; never reveals whether the email exists.
    BadCredentials,

    /// 401: protected route hit without an `Authorization` header.
    NotAuthenticated,

    /// 401: a key was presented but matches no token.
    InvalidToken,

    /// 401: the key is valid but the account was deactivated.
    InactiveUser,

    /// 403.
    PermissionDenied,

    /// 404.
    NotFound,

    /// 500; the message is logged, never sent to the caller.
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(_) => write!(f, "Validation failed"),
            Self::BadCredentials => write!(f, "Invalid email or password"),
            Self::NotAuthenticated => write!(f, "Authentication credentials were not provided"),
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::InactiveUser => write!(f, "User inactive or deleted"),
            Self::PermissionDenied => write!(f, "Permission denied"),
            Self::NotFound => write!(f, "Not found"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            Self::BadCredentials => detail(StatusCode::UNAUTHORIZED, "Invalid email or password"),
            Self::NotAuthenticated => detail(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            ),
            Self::InvalidToken => detail(StatusCode::UNAUTHORIZED, "Invalid token."),
            Self::InactiveUser => detail(StatusCode::UNAUTHORIZED, "User inactive or deleted."),
            Self::PermissionDenied => detail(
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ),
            Self::NotFound => detail(StatusCode::NOT_FOUND, "Not found."),
            Self::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
        }
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<UserWriteError> for ApiError {
    fn from(err: UserWriteError) -> Self {
        match err {
            UserWriteError::EmailTaken => Self::field("email", "Email already exists."),
            UserWriteError::EmptyEmail => Self::field("email", "This field may not be blank."),
            UserWriteError::Database(err) => Self::Internal(err.to_string()),
            UserWriteError::Internal(err) => Self::Internal(format!("{err:#}")),
        }
    }
}

impl ApiError {
    /// A 400 carrying a single message for a single field.
    #[must_use]
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }
}
