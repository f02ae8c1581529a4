// Error handling module
// Defines the error taxonomy shared by the auth layer, the API client and the tools

use std::sync::Arc;
use thiserror::Error;

/// Maximum number of characters of an upstream error body kept in `ApiError::Api`
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors that can occur while talking to the VerifyWise API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Upstream returned 404 for the requested path
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    /// Upstream returned an error status other than 404
    #[error("VerifyWise API error {status}: {message}")]
    Api { status: u16, message: String },

    /// No HTTP response could be obtained
    #[error("Network error calling {path}: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Login/refresh response did not carry a recognised token field
    #[error("Authentication response error: {0}")]
    AuthResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tool argument validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The client was closed and can no longer issue requests
    #[error("API client is closed")]
    Closed,

    /// Outcome of a single-flight auth operation, shared with every waiter
    #[error(transparent)]
    Shared(Arc<ApiError>),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Build an `Api` error, truncating the body excerpt
    pub fn api(status: u16, body: &str) -> Self {
        ApiError::Api {
            status,
            message: truncate_chars(body, MAX_ERROR_BODY_CHARS),
        }
    }

    /// Unwrap any `Shared` layers and return the underlying error
    pub fn root(&self) -> &ApiError {
        match self {
            ApiError::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// True if the upstream reported the resource as absent
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), ApiError::NotFound { .. })
    }

    /// HTTP status reported by the upstream, if any
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            ApiError::NotFound { .. } => Some(404),
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Single-line message safe to surface to an agent or end user.
    ///
    /// Never contains credentials; upstream bodies are already capped at
    /// `MAX_ERROR_BODY_CHARS`.
    pub fn user_message(&self) -> String {
        match self.root() {
            ApiError::Network { path, source } => {
                format!(
                    "Network error calling {} (kind: {})",
                    path,
                    transport_error_kind(source)
                )
            }
            other => other.to_string(),
        }
    }
}

/// Truncate a string to at most `max` characters on a char boundary
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Categorize a transport failure for logs and user-facing messages
pub fn transport_error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::NotFound {
            path: "/api/projects/999".to_string(),
        };
        assert_eq!(err.to_string(), "Resource not found: /api/projects/999");

        let err = ApiError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "VerifyWise API error 500: boom");

        let err = ApiError::AuthResponse("no token field".to_string());
        assert_eq!(
            err.to_string(),
            "Authentication response error: no token field"
        );
    }

    #[test]
    fn test_config_error_message() {
        let err = ApiError::Config("VERIFYWISE_EMAIL is required".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: VERIFYWISE_EMAIL is required"
        );
    }

    #[test]
    fn test_internal_error_message() {
        let err = ApiError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }

    #[test]
    fn test_api_error_truncates_body() {
        let body = "x".repeat(500);
        let err = ApiError::api(502, &body);
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message.chars().count(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let s = "ééééé";
        assert_eq!(truncate_chars(s, 3), "ééé");
        assert_eq!(truncate_chars(s, 10), s);
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_shared_error_is_transparent() {
        let inner = Arc::new(ApiError::AuthResponse("missing".to_string()));
        let err = ApiError::Shared(inner);
        assert_eq!(err.to_string(), "Authentication response error: missing");
        assert!(matches!(err.root(), ApiError::AuthResponse(_)));
        assert_eq!(err.user_message(), err.to_string());
    }

    #[test]
    fn test_status_and_not_found() {
        let err = ApiError::Shared(Arc::new(ApiError::NotFound {
            path: "/x".to_string(),
        }));
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));

        let err = ApiError::api(503, "unavailable");
        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(503));

        assert_eq!(ApiError::Closed.status(), None);
    }
}
