// src/core/errors.rs
//! Error taxonomy of the request layer and its normalization into a single
//! user-displayable shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

const AUTH_REQUIRED_MESSAGE: &str = "Authentication required. Please log in and try again.";
const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
const NOT_FOUND_MESSAGE: &str = "The requested resource was not found.";
const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
const NETWORK_MESSAGE: &str =
    "Network error. Please check your internet connection and try again.";

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No response at all: DNS, refused connection, reset, timeout.
    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    Http {
        status: u16,
        status_text: String,
        message: String,
        details: Option<Value>,
    },

    /// A 2xx response whose body could not be read as expected.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Expired or missing session detected locally.
    #[error("Session error: {0}")]
    Session(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The request could not be built (bad URL, unserializable body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "NETWORK_ERROR",
            ApiError::Http { .. } => "HTTP_ERROR",
            ApiError::Parse(_) => "PARSE_ERROR",
            ApiError::Session(_) => "SESSION_ERROR",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    pub fn info(&self) -> ErrorInfo {
        let details = match self {
            ApiError::Http { details, .. } => details.clone(),
            _ => None,
        };
        ErrorInfo {
            message: self.to_string(),
            code: Some(self.code().to_string()),
            status_code: self.status(),
            details,
        }
    }

    pub fn user_message(&self) -> String {
        to_user_message(&self.info())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status_code: None,
            details: None,
        }
    }

    /// For failures that carry nothing usable.
    pub fn unknown() -> Self {
        Self::new(FALLBACK_MESSAGE)
    }

    /// Typed `ApiError`s keep their status and code; any other error only
    /// contributes its message.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        if let Some(api_error) = err.downcast_ref::<ApiError>() {
            return api_error.info();
        }
        let message = err.to_string();
        if message.is_empty() {
            Self::unknown()
        } else {
            Self::new(message)
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ApiError>() {
            Some(api_error) => api_error.info(),
            None => Self::new(format!("{:#}", err)),
        }
    }

    pub fn user_message(&self) -> String {
        to_user_message(self)
    }
}

impl From<&ApiError> for ErrorInfo {
    fn from(err: &ApiError) -> Self {
        err.info()
    }
}

impl From<ApiError> for ErrorInfo {
    fn from(err: ApiError) -> Self {
        err.info()
    }
}

impl From<&str> for ErrorInfo {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ErrorInfo {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

pub fn to_user_message(info: &ErrorInfo) -> String {
    match info.status_code {
        Some(401) => return AUTH_REQUIRED_MESSAGE.to_string(),
        Some(403) => return FORBIDDEN_MESSAGE.to_string(),
        Some(404) => return NOT_FOUND_MESSAGE.to_string(),
        Some(status) if status >= 500 => return SERVER_ERROR_MESSAGE.to_string(),
        _ => {}
    }

    if info.message.to_lowercase().contains("network") {
        return NETWORK_MESSAGE.to_string();
    }

    if info.message.is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        info.message.clone()
    }
}
