//! Provider error type and API error classification
//!
//! Lifecycle code branches on [`ErrorClass`] rather than on raw
//! [`CloudError`] variants: a 404 means "plan a recreate", a 409 means "the
//! subscription is busy", a 400 is surfaced verbatim, and everything else is
//! fatal.

use std::time::Duration;

use rediscloud_api::CloudError;
use thiserror::Error;

/// Error type for all provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The remote resource does not exist
    #[error("{resource} {id} was not found")]
    NotFound { resource: &'static str, id: String },

    /// The remote API refused a concurrent or out-of-order mutation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The configuration is invalid; message is user-facing
    #[error("{0}")]
    Invalid(String),

    /// A changed attribute can only be applied by replacing the resource
    #[error("changing {attribute} forces a new resource")]
    RequiresReplacement { attribute: &'static str },

    /// An API-side task settled in the error state
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// A region-scoped write of an Active-Active update failed.
    ///
    /// Earlier regions are not rolled back; the next read surfaces the
    /// partial state and a later apply converges it.
    #[error("updating region {region}: {source}")]
    RegionWrite {
        region: String,
        #[source]
        source: Box<ProviderError>,
    },

    /// A wait loop ran out of time
    #[error("timeout after {elapsed:?} waiting for {resource} {id} to reach {target}")]
    Timeout {
        resource: &'static str,
        id: String,
        target: String,
        elapsed: Duration,
    },

    /// A wait loop observed a state outside both the pending and target sets
    #[error("unexpected state {state:?} waiting for {resource} {id}")]
    UnexpectedState {
        resource: &'static str,
        id: String,
        state: String,
    },

    /// Underlying API failure, surfaced as-is
    #[error(transparent)]
    Api(#[from] CloudError),

    /// A bug in the provider itself (codec failures, impossible states)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failure classes the lifecycle components branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Treat as a deletion race: clear the id, plan a recreate
    NotFound,
    /// Retry after the subscription settles
    Conflict,
    /// Validation failure; surface the message verbatim
    Invalid,
    /// Network or 5xx; the client already retried, surface as fatal
    Transient,
    /// Everything else
    Fatal,
}

/// Classify an API error into the class the lifecycle acts on
#[must_use]
pub fn classify(err: &CloudError) -> ErrorClass {
    if err.is_not_found() {
        ErrorClass::NotFound
    } else if err.is_conflict() {
        ErrorClass::Conflict
    } else if err.is_bad_request() {
        ErrorClass::Invalid
    } else if err.is_retryable() {
        ErrorClass::Transient
    } else {
        ErrorClass::Fatal
    }
}

impl ProviderError {
    /// Classify this error, delegating to [`classify`] for API errors
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            ProviderError::NotFound { .. } => ErrorClass::NotFound,
            ProviderError::Conflict(_) => ErrorClass::Conflict,
            ProviderError::Invalid(_) | ProviderError::RequiresReplacement { .. } => {
                ErrorClass::Invalid
            }
            ProviderError::Api(err) => classify(err),
            _ => ErrorClass::Fatal,
        }
    }

    /// Returns true if the error means the resource no longer exists
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        let err = CloudError::NotFound {
            message: "database not found".to_string(),
        };
        assert_eq!(classify(&err), ErrorClass::NotFound);
    }

    #[test]
    fn test_classify_conflict() {
        let err = CloudError::Conflict {
            message: "SUBSCRIPTION_NOT_ACTIVE".to_string(),
        };
        assert_eq!(classify(&err), ErrorClass::Conflict);
    }

    #[test]
    fn test_classify_invalid() {
        let err = CloudError::BadRequest {
            message: "DATABASE_INVALID_CERT".to_string(),
        };
        assert_eq!(classify(&err), ErrorClass::Invalid);
    }

    #[test]
    fn test_classify_transient_and_fatal() {
        assert_eq!(
            classify(&CloudError::ServerError("boom".to_string())),
            ErrorClass::Transient
        );
        assert_eq!(
            classify(&CloudError::AuthenticationFailed {
                message: "denied".to_string()
            }),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn test_provider_error_class_passthrough() {
        let err: ProviderError = CloudError::NotFound {
            message: "gone".to_string(),
        }
        .into();
        assert!(err.is_not_found());

        let err = ProviderError::RequiresReplacement {
            attribute: "memory_storage",
        };
        assert_eq!(err.class(), ErrorClass::Invalid);
    }
}
