//! Error types for building and sending requests.
//!
//! Builder setters never fail on the spot; they record the first problem as
//! a deferred [`RequestError`] which [`Request::send`](crate::Request::send)
//! returns before any network activity.

use thiserror::Error;

use crate::multipart::MultipartError;
use crate::transport::TransportError;

/// Errors returned by [`Request::send`](crate::Request::send).
#[derive(Debug, Error)]
pub enum RequestError {
    /// The transport failed and the retry budget (if any) did not help.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Building a multipart body failed.
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// A header name or value could not be represented on the wire.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The method name is not a valid HTTP token.
    #[error("invalid HTTP method: {method}")]
    InvalidMethod {
        /// The rejected method name.
        method: String,
    },

    /// More than one body-producing option was supplied for one request.
    #[error("conflicting body options: {options}")]
    ConflictingBody {
        /// The options that were combined, e.g. `"body, data"`.
        options: String,
    },

    /// A raw request could not be parsed.
    #[error("malformed raw request: {reason}")]
    MalformedRaw {
        /// Description of the parse failure.
        reason: String,
    },

    /// The request has no transport attached.
    #[error("no transport client attached to request")]
    MissingClient,
}

impl RequestError {
    /// Creates an invalid header error.
    pub fn invalid_header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid method error.
    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod {
            method: method.into(),
        }
    }

    /// Creates a conflicting body error from the option names involved.
    pub fn conflicting_body(options: &[&str]) -> Self {
        Self::ConflictingBody {
            options: options.join(", "),
        }
    }

    /// Creates a malformed raw request error.
    pub fn malformed_raw(reason: impl Into<String>) -> Self {
        Self::MalformedRaw {
            reason: reason.into(),
        }
    }
}
