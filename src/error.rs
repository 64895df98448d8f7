//! Error types for dispatch operations.
//!
//! Defines the error conditions that can occur while submitting, delivering,
//! or draining requests. Errors carry context for debugging and are
//! categorized so that a single delivery's failure can be reported without
//! affecting the queue, the scheduler, or other in-flight deliveries.

use std::fmt;

use thiserror::Error;

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Error conditions surfaced by the dispatcher.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Document could not be encoded at submit time, or a drained payload
    /// could not be decoded back into a document.
    #[error("serialization failed: {message}")]
    Serialization {
        /// Error message from the serializer
        message: String,
    },

    /// Network-level connectivity failure while delivering a payload.
    #[error("network connection failed: {message}")]
    Network {
        /// Error message describing the network failure
        message: String,
    },

    /// HTTP request timeout exceeded.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Number of seconds before the request timed out
        timeout_seconds: u64,
    },

    /// Delivery was interrupted by dispatcher teardown.
    ///
    /// Only raised when a running dispatcher is dropped without calling
    /// `shutdown()`; a graceful shutdown lets in-flight deliveries finish.
    #[error("delivery cancelled by dispatcher teardown")]
    Cancelled,

    /// Invalid dispatcher or client configuration.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// Operation rejected because the dispatcher has been shut down.
    #[error("dispatcher is stopped")]
    Stopped,
}

impl DispatchError {
    /// Creates a serialization error from a message.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Returns `true` if this error describes a failed delivery attempt
    /// rather than a caller-side problem.
    ///
    /// Transport failures are always scoped to the single item that caused
    /// them; the queue and other deliveries continue unaffected.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. } | Self::Cancelled)
    }
}

/// Category of dispatch error for structured log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Document encoding or decoding problems.
    Serialization,
    /// Network connectivity issues.
    Network,
    /// Request timeouts.
    Timeout,
    /// Deliveries interrupted by teardown.
    Cancelled,
    /// Configuration problems.
    Configuration,
    /// Lifecycle violations (use after shutdown).
    Lifecycle,
}

impl From<&DispatchError> for ErrorCategory {
    fn from(error: &DispatchError) -> Self {
        match error {
            DispatchError::Serialization { .. } => Self::Serialization,
            DispatchError::Network { .. } => Self::Network,
            DispatchError::Timeout { .. } => Self::Timeout,
            DispatchError::Cancelled => Self::Cancelled,
            DispatchError::Configuration { .. } => Self::Configuration,
            DispatchError::Stopped => Self::Lifecycle,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization => write!(f, "serialization"),
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Configuration => write!(f, "configuration"),
            Self::Lifecycle => write!(f, "lifecycle"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_identified_correctly() {
        assert!(DispatchError::network("connection refused").is_transport_failure());
        assert!(DispatchError::timeout(30).is_transport_failure());
        assert!(DispatchError::Cancelled.is_transport_failure());

        assert!(!DispatchError::serialization("bad key").is_transport_failure());
        assert!(!DispatchError::configuration("limit is zero").is_transport_failure());
        assert!(!DispatchError::Stopped.is_transport_failure());
    }

    #[test]
    fn error_categories_mapped_correctly() {
        assert_eq!(ErrorCategory::from(&DispatchError::network("test")), ErrorCategory::Network);
        assert_eq!(ErrorCategory::from(&DispatchError::timeout(5)), ErrorCategory::Timeout);
        assert_eq!(ErrorCategory::from(&DispatchError::Cancelled), ErrorCategory::Cancelled);
        assert_eq!(ErrorCategory::from(&DispatchError::Stopped), ErrorCategory::Lifecycle);
    }

    #[test]
    fn error_display_format() {
        let error = DispatchError::timeout(30);
        assert_eq!(error.to_string(), "request timeout after 30s");

        let stopped = DispatchError::Stopped;
        assert_eq!(stopped.to_string(), "dispatcher is stopped");

        assert_eq!(ErrorCategory::Network.to_string(), "network");
    }
}
