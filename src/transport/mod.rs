//! The wire engine seam.
//!
//! The execution engine only needs two dispatch operations and the ability to
//! tell transient failures apart. [`HttpClient`] provides them on top of
//! reqwest; tests and callers can plug in any other [`Transport`].

mod client;
mod error;

use async_trait::async_trait;

pub use client::HttpClient;
pub use error::TransportError;

use crate::wire::{WireRequest, WireResponse};

/// A wire engine able to send one request and fill in one response.
///
/// Implementations must be shareable across concurrent calls and must not
/// change configuration after construction.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Sends `request` once without following redirects.
    ///
    /// `response` is overwritten with whatever the server returned, including
    /// 3xx responses.
    async fn execute(
        &self,
        request: &WireRequest,
        response: &mut WireResponse,
    ) -> Result<(), TransportError>;

    /// Sends `request` and follows redirects, at most `max_redirects` hops.
    ///
    /// Returns the request of the last hop when at least one redirect was
    /// followed, and `None` when `request` itself produced the response.
    /// Exceeding the budget fails with [`TransportError::TooManyRedirects`].
    async fn execute_redirects(
        &self,
        request: &WireRequest,
        response: &mut WireResponse,
        max_redirects: usize,
    ) -> Result<Option<WireRequest>, TransportError>;
}
