//! Typed errors for the Redis Cloud management API
//!
//! Every handler returns [`CloudError`]. Callers that need to branch on the
//! failure class use the `is_*` predicates rather than matching variants,
//! which keeps them insulated from how a given status code is represented.

use thiserror::Error;

/// Error type for all Cloud API operations
#[derive(Error, Debug)]
pub enum CloudError {
    /// Authentication failed (401/403)
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Resource not found (404)
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Conflicting operation in flight (409), e.g. subscription not active
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Request rejected by validation (400)
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Rate limited (429); the client retries these before surfacing
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// Server-side failure (5xx); retried before surfacing
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other HTTP status
    #[error("API error (HTTP {code}): {message}")]
    Api { code: u16, message: String },

    /// Transport-level failure
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Response body did not match the expected shape
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Result type alias for Cloud API operations
pub type Result<T> = std::result::Result<T, CloudError>;

impl CloudError {
    /// Returns true for 404 responses
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound { .. })
    }

    /// Returns true for 401/403 responses
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CloudError::AuthenticationFailed { .. })
    }

    /// Returns true for 409 responses
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, CloudError::Conflict { .. })
    }

    /// Returns true for 400 responses
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self, CloudError::BadRequest { .. })
    }

    /// Returns true for 429 responses
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CloudError::RateLimited { .. })
    }

    /// Returns true for 5xx responses
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, CloudError::ServerError(_))
    }

    /// Returns true if retrying the request may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CloudError::RateLimited { .. }
                | CloudError::ServerError(_)
                | CloudError::ConnectionError(_)
        )
    }
}

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CloudError::Deserialization(err.to_string())
        } else {
            CloudError::ConnectionError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CloudError {
    fn from(err: serde_json::Error) -> Self {
        CloudError::Deserialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_predicate() {
        let err = CloudError::NotFound {
            message: "subscription 42 not found".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_retryable_classes() {
        assert!(
            CloudError::RateLimited {
                message: "slow down".to_string()
            }
            .is_retryable()
        );
        assert!(CloudError::ServerError("boom".to_string()).is_retryable());
        assert!(CloudError::ConnectionError("reset".to_string()).is_retryable());
        assert!(
            !CloudError::BadRequest {
                message: "bad".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_display_includes_message() {
        let err = CloudError::Conflict {
            message: "SUBSCRIPTION_NOT_ACTIVE".to_string(),
        };
        assert!(err.to_string().contains("SUBSCRIPTION_NOT_ACTIVE"));
    }
}
