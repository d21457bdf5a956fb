//! Error types for the gateway
//!
//! Every failure a handler can produce is a [`GatewayError`]. The router
//! turns it into a response through the [`ErrorResponder`](crate::server::ErrorResponder),
//! which decides between a status-coded reply and the legacy 200 envelope.

use hyper::StatusCode;
use serde::{Deserialize, Serialize};

/// Machine-readable error body shared by every failure response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub key: String,
    pub value: String,
}

impl ErrorEnvelope {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Main error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Validation { key: &'static str, message: String },

    #[error("request rate limit exceeded")]
    RateLimited,

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("{message}")]
    Upstream { key: &'static str, message: String },

    #[error("{message}")]
    Extraction { key: &'static str, message: String },

    #[error("{message}")]
    Storage { key: &'static str, message: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Storage refused the write; keeps the endpoint's own key
    #[error("{message}")]
    StorageDenied { key: &'static str, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(key: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            key,
            message: message.into(),
        }
    }

    pub fn upstream(key: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            key,
            message: message.into(),
        }
    }

    pub fn extraction(key: &'static str, message: impl Into<String>) -> Self {
        Self::Extraction {
            key,
            message: message.into(),
        }
    }

    pub fn storage(key: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            key,
            message: message.into(),
        }
    }

    pub fn storage_denied(key: &'static str, message: impl Into<String>) -> Self {
        Self::StorageDenied {
            key,
            message: message.into(),
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Extraction { .. } => StatusCode::BAD_GATEWAY,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PermissionDenied(_) | Self::StorageDenied { .. } => StatusCode::FORBIDDEN,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine code placed in the envelope and the access log
    pub fn key(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::NotFound(_) => "not_found",
            Self::Validation { key, .. } => key,
            Self::RateLimited => "rate_limit_exceeded",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Upstream { key, .. } => key,
            Self::Extraction { key, .. } => key,
            Self::Storage { key, .. } | Self::StorageDenied { key, .. } => key,
            Self::PermissionDenied(_) => "permission_denied",
            Self::Config(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// Whether compat mode may fold this error into a 200 envelope.
    ///
    /// Authentication, routing and method failures happen before any
    /// handler logic runs and are always status-coded.
    pub fn is_compat_eligible(&self) -> bool {
        !matches!(
            self,
            Self::Unauthorized(_) | Self::MethodNotAllowed | Self::NotFound(_)
        )
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.key(), self.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<hyper::Error> for GatewayError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::validation("url_invalid", "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(GatewayError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            GatewayError::upstream("fetch_character_error", "boom").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::PermissionDenied("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_storage_denied_keeps_endpoint_key() {
        let err = GatewayError::storage_denied("save_icon_image_error", "bucket is read-only");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.key(), "save_icon_image_error");
        assert!(err.is_compat_eligible());
    }

    #[test]
    fn test_envelope_uses_key_and_message() {
        let err = GatewayError::validation("missing_parameter", "url, category, group is required");
        let envelope = err.envelope();
        assert_eq!(envelope.key, "missing_parameter");
        assert_eq!(envelope.value, "url, category, group is required");

        assert_eq!(GatewayError::RateLimited.envelope().key, "rate_limit_exceeded");
    }

    #[test]
    fn test_compat_eligibility() {
        assert!(!GatewayError::Unauthorized("x".into()).is_compat_eligible());
        assert!(!GatewayError::MethodNotAllowed.is_compat_eligible());
        assert!(GatewayError::RateLimited.is_compat_eligible());
        assert!(GatewayError::storage("save_icon_image_error", "disk").is_compat_eligible());
    }
}
