//! Request failure taxonomy shared by the client, session manager, and UI.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of request failures for consistent handling.
///
/// The response interceptor classifies every failed call into exactly one of
/// these; consumers treat the classification as read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 400: the server rejected the request parameters
    BadRequest,
    /// 401: missing or invalid credentials
    Unauthorized,
    /// 403: authenticated but not allowed
    Forbidden,
    /// 404: no such resource
    NotFound,
    /// 408 or a client-side abort
    Timeout,
    /// 500/502/503/504
    ServerError,
    /// No response at all
    Network,
    /// Any other status
    Unknown,
}

impl ErrorCategory {
    /// Maps an HTTP status code to its category.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 => Self::Timeout,
            500 | 502 | 503 | 504 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Fallback message shown when the server body carries none.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::BadRequest => "Invalid request parameters",
            Self::Unauthorized => "Not authorized, please sign in again",
            Self::Forbidden => "Access denied",
            Self::NotFound => "The requested resource does not exist",
            Self::Timeout => "Request timed out",
            Self::ServerError => "Server error",
            Self::Network => "Network connection failed",
            Self::Unknown => "Request failed",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::BadRequest => write!(f, "bad_request"),
            ErrorCategory::Unauthorized => write!(f, "unauthorized"),
            ErrorCategory::Forbidden => write!(f, "forbidden"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::ServerError => write!(f, "server_error"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

/// Structured request failure with category and display message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error category
    pub category: ErrorCategory,
    /// One-line summary suitable for display
    pub message: String,
    /// Raw response body, when one was received
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new error with no captured body.
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            details: None,
        }
    }

    /// Builds the error for a non-2xx response, preferring the server's
    /// `message` field over the per-category default.
    pub fn from_response(status: u16, body: &str) -> Self {
        let category = ErrorCategory::from_status(status);
        let message = extract_message(body)
            .unwrap_or_else(|| category.default_message().to_string());
        let details = if body.is_empty() {
            None
        } else {
            Some(body.to_string())
        };
        Self {
            category,
            message,
            details,
        }
    }

    /// Creates a timeout error (client-side abort).
    pub fn timeout() -> Self {
        Self::new(
            ErrorCategory::Timeout,
            ErrorCategory::Timeout.default_message(),
        )
    }

    /// Creates a network error (no response at all).
    pub fn network() -> Self {
        Self::new(
            ErrorCategory::Network,
            ErrorCategory::Network.default_message(),
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        self.category == ErrorCategory::Unauthorized
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for classified request operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Pulls the `message` field out of a JSON error body, if any.
fn extract_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("message")
        .and_then(Value::as_str)
        .map(std::string::ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: status codes map to the documented categories.
    #[test]
    fn test_category_from_status() {
        assert_eq!(ErrorCategory::from_status(400), ErrorCategory::BadRequest);
        assert_eq!(ErrorCategory::from_status(401), ErrorCategory::Unauthorized);
        assert_eq!(ErrorCategory::from_status(403), ErrorCategory::Forbidden);
        assert_eq!(ErrorCategory::from_status(404), ErrorCategory::NotFound);
        assert_eq!(ErrorCategory::from_status(408), ErrorCategory::Timeout);
        for status in [500, 502, 503, 504] {
            assert_eq!(ErrorCategory::from_status(status), ErrorCategory::ServerError);
        }
        assert_eq!(ErrorCategory::from_status(418), ErrorCategory::Unknown);
        assert_eq!(ErrorCategory::from_status(501), ErrorCategory::Unknown);
    }

    /// Test: classification is a pure function of the response.
    #[test]
    fn test_classification_is_idempotent() {
        let first = ApiError::from_response(403, r#"{"message":"nope"}"#);
        let second = ApiError::from_response(403, r#"{"message":"nope"}"#);
        assert_eq!(first.category, second.category);
        assert_eq!(first.message, second.message);
    }

    /// Test: the server's message field wins over the default text.
    #[test]
    fn test_server_message_preferred() {
        let err = ApiError::from_response(400, r#"{"message":"username taken"}"#);
        assert_eq!(err.category, ErrorCategory::BadRequest);
        assert_eq!(err.message, "username taken");
        assert_eq!(err.details.as_deref(), Some(r#"{"message":"username taken"}"#));
    }

    /// Test: non-JSON and empty bodies fall back to the category default.
    #[test]
    fn test_default_message_fallback() {
        let err = ApiError::from_response(502, "<html>Bad Gateway</html>");
        assert_eq!(err.category, ErrorCategory::ServerError);
        assert_eq!(err.message, "Server error");

        let err = ApiError::from_response(404, "");
        assert_eq!(err.message, "The requested resource does not exist");
        assert!(err.details.is_none());
    }
}
