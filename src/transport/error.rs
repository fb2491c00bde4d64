//! Error types for the wire engine.

use thiserror::Error;

/// Errors a [`Transport`](super::Transport) reports for one dispatch.
///
/// `Timeout` and `ConnectionClosed` are the transient kinds the execution
/// engine retries; `Canceled` is reported as
/// [`Outcome::Canceled`](crate::Outcome::Canceled) instead of an error.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The read, write or per-call deadline elapsed.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL being requested.
        url: String,
    },

    /// The peer closed the connection before a full response arrived.
    #[error("connection closed requesting {url}: {detail}")]
    ConnectionClosed {
        /// The URL being requested.
        url: String,
        /// What the engine observed.
        detail: String,
    },

    /// The call was aborted by the caller.
    #[error("request to {url} was canceled")]
    Canceled {
        /// The URL being requested.
        url: String,
    },

    /// The redirect budget ran out before a final response.
    #[error("too many redirects requesting {url} (max {max})")]
    TooManyRedirects {
        /// The URL of the first request in the chain.
        url: String,
        /// The redirect budget.
        max: usize,
    },

    /// The response body exceeded the configured size limit.
    #[error("response body from {url} exceeds {limit} bytes")]
    BodyTooLarge {
        /// The URL being requested.
        url: String,
        /// The configured limit in bytes.
        limit: usize,
    },

    /// The request URI is not a valid absolute URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URI.
        url: String,
    },

    /// Network-level failure (DNS, refused connection, TLS, protocol).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL being requested.
        url: String,
        /// The underlying engine error.
        #[source]
        source: reqwest::Error,
    },

    /// Any other failure, e.g. a malformed response from a custom engine.
    #[error("transport error requesting {url}: {message}")]
    Protocol {
        /// The URL being requested.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// The client could not be built from its configuration.
    #[error("failed to build HTTP client: {source}")]
    Build {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a connection-closed error.
    pub fn connection_closed(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates a cancellation error.
    pub fn canceled(url: impl Into<String>) -> Self {
        Self::Canceled { url: url.into() }
    }

    /// Creates a redirect budget error.
    pub fn too_many_redirects(url: impl Into<String>, max: usize) -> Self {
        Self::TooManyRedirects {
            url: url.into(),
            max,
        }
    }

    /// Creates a body size error.
    pub fn body_too_large(url: impl Into<String>, limit: usize) -> Self {
        Self::BodyTooLarge {
            url: url.into(),
            limit,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a generic protocol error.
    pub fn protocol(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Maps an engine error onto the taxonomy, recognising timeouts,
    /// closed connections and cancellation.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            return Self::Timeout { url };
        }
        if let Some(detail) = closed_connection_detail(&source) {
            return Self::ConnectionClosed { url, detail };
        }
        if is_canceled(&source) {
            return Self::Canceled { url };
        }
        Self::Network { url, source }
    }
}

/// Walks the source chain looking for a connection that went away mid-call.
fn closed_connection_detail(error: &reqwest::Error) -> Option<String> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>()
            && matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            )
        {
            return Some(io.to_string());
        }
        let text = err.to_string().to_lowercase();
        if text.contains("connection closed") || text.contains("incomplete message") {
            return Some(text);
        }
        current = err.source();
    }
    None
}

fn is_canceled(error: &reqwest::Error) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = current {
        let text = err.to_string().to_lowercase();
        if text.contains("canceled") || text.contains("cancelled") {
            return true;
        }
        current = err.source();
    }
    false
}
