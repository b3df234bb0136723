// src/types/response.rs
use serde::{Deserialize, Serialize};

use crate::core::errors::FALLBACK_MESSAGE;

// ===== Uniform result envelope =====

/// What every request-layer and store call resolves to. Failures never
/// surface as `Err`; they arrive here with `success == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    pub status: Option<u16>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            status: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            message: self.message,
            status: self.status,
        }
    }

    /// Re-type a failed envelope, keeping its error and status.
    pub fn cast_failure<U>(self) -> ApiResponse<U> {
        ApiResponse {
            success: false,
            data: None,
            error: self.error.or_else(|| Some(FALLBACK_MESSAGE.to_string())),
            message: self.message,
            status: self.status,
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(MISSING_DATA.to_string()),
            (false, _) => Err(self.error.unwrap_or_else(|| FALLBACK_MESSAGE.to_string())),
        }
    }
}

const MISSING_DATA: &str = "Response contained no data";
