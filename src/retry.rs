//! Failure classification and the retry budget.
//!
//! Each failed attempt is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - timeouts and closed connections, worth another attempt
//! - [`FailureType::Permanent`] - everything else; retrying would not help
//! - [`FailureType::Canceled`] - the caller aborted; not a failure at all
//!
//! The [`RetryPolicy`] then decides whether another attempt fits in the budget.
//! Attempts are issued back to back; there is no backoff delay.
//!
//! # Example
//!
//! ```
//! use request_kit::{RetryDecision, RetryPolicy, FailureType, TransportError, classify_error};
//!
//! let policy = RetryPolicy::new(2);
//! let error = TransportError::timeout("https://example.com/");
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { attempt } => println!("sending attempt {attempt}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use tracing::{debug, instrument};

use crate::transport::TransportError;

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: read timeout, connection reset by peer.
    Transient,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: DNS failure, refused connection, malformed response,
    /// redirect budget exhausted.
    Permanent,

    /// The caller aborted the call.
    Canceled,
}

/// Decision on whether to send another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Send another attempt.
    Retry {
        /// Which attempt this will be (1-indexed, so the first retry is attempt 2).
        attempt: u32,
    },

    /// Stop and surface the error.
    DoNotRetry {
        /// Human-readable reason why no retry is attempted.
        reason: String,
    },
}

/// Retry budget for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` attempts after the first.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
        }
    }

    /// Returns the maximum number of attempts, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Decides whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts()))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Canceled => {
                return RetryDecision::DoNotRetry {
                    reason: "canceled by caller".to_string(),
                };
            }
            FailureType::Transient => {}
        }

        if attempt >= self.max_attempts() {
            debug!(attempt, max = self.max_attempts(), "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts()),
            };
        }

        RetryDecision::Retry {
            attempt: attempt + 1,
        }
    }
}

/// Classifies a transport error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | ConnectionClosed | Transient |
/// | Canceled | Canceled |
/// | everything else | Permanent |
#[must_use]
pub fn classify_error(error: &TransportError) -> FailureType {
    match error {
        TransportError::Timeout { .. } | TransportError::ConnectionClosed { .. } => {
            FailureType::Transient
        }
        TransportError::Canceled { .. } => FailureType::Canceled,
        TransportError::TooManyRedirects { .. }
        | TransportError::BodyTooLarge { .. }
        | TransportError::InvalidUrl { .. }
        | TransportError::Network { .. }
        | TransportError::Protocol { .. }
        | TransportError::Build { .. } => FailureType::Permanent,
    }
}
