//! The execution engine: drives one logical call.
//!
//! ```text
//! Prepare -> InjectCookies -> Attempt loop -> PersistCookies -> Trace -> Done
//! ```
//!
//! The attempt loop sends up to `1 + retry` attempts. The first goes through
//! the primary client, later ones through the retry client when one is set.
//! A redirect budget above 1 switches every attempt to redirect-following
//! dispatch.

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{HeaderValue, USER_AGENT};
use tracing::{debug, info, instrument, warn};

use super::Request;
use crate::constants::DEFAULT_USER_AGENT;
use crate::cookies::{inject_cookies, persist_cookies};
use crate::error::RequestError;
use crate::response::Response;
use crate::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::trace::TraceInfo;
use crate::transport::Transport;
use crate::wire::WireRequest;

/// How a call that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response was received.
    Completed,
    /// The call was aborted by the caller. The response may be incomplete.
    Canceled,
}

impl Outcome {
    /// Returns `true` for [`Outcome::Completed`].
    #[must_use]
    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

impl Request {
    /// Sends the request and fills in `response`.
    ///
    /// Retries and redirects happen inside this call, strictly one after
    /// another. Cookies set by the final response are stored in the jar even
    /// when the call fails, and the trace entry (if tracing is on) covers the
    /// whole call.
    ///
    /// # Errors
    ///
    /// - The deferred builder error, if any, before anything is sent.
    /// - [`RequestError::MissingClient`] when no transport is attached.
    /// - [`RequestError::Transport`] with the last error once retries are
    ///   exhausted, or immediately for non-transient failures.
    #[instrument(
        skip(self, response),
        fields(method = %self.wire.method(), uri = %self.wire.uri())
    )]
    pub async fn send(&mut self, response: &mut Response) -> Result<Outcome, RequestError> {
        if let Some(error) = self.error.take() {
            debug!(error = %error, "rejecting request with deferred error");
            return Err(error);
        }
        let client = self.client.clone().ok_or(RequestError::MissingClient)?;

        if !self.wire.headers().contains_key(USER_AGENT) {
            self.wire
                .headers_mut()
                .insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }
        response.begin_call();

        let url = match self.wire.url() {
            Ok(url) => Some(url),
            Err(e) => {
                debug!(error = %e, "target is not an absolute URL; skipping cookies");
                None
            }
        };
        if let (Some(url), Some(jar)) = (&url, &self.jar) {
            inject_cookies(jar.as_ref(), url, &mut self.wire);
        }

        let started = Instant::now();
        let mut final_hop = None;
        let result = self.attempt_loop(&client, response, &mut final_hop).await;

        if let (Some(url), Some(jar)) = (&url, &self.jar) {
            persist_cookies(jar.as_ref(), url, response.wire());
        }
        if let Some(trace) = &self.trace {
            trace.push(TraceInfo {
                request: final_hop.as_ref().unwrap_or(&self.wire).to_string(),
                response: response.to_string(),
                duration: started.elapsed(),
            });
        }

        result
    }

    async fn attempt_loop(
        &self,
        client: &Arc<dyn Transport>,
        response: &mut Response,
        final_hop: &mut Option<WireRequest>,
    ) -> Result<Outcome, RequestError> {
        let policy = RetryPolicy::new(self.max_retry);
        let mut attempt = 1;

        loop {
            let transport = if attempt == 1 {
                client
            } else {
                self.retry_client.as_ref().unwrap_or(client)
            };

            let result = if self.max_redirects > 1 {
                transport
                    .execute_redirects(&self.wire, response.wire_mut(), self.max_redirects)
                    .await
                    .map(|hop| *final_hop = hop)
            } else {
                transport.execute(&self.wire, response.wire_mut()).await
            };

            let error = match result {
                Ok(()) => {
                    debug!(attempt, status = %response.status(), "call completed");
                    return Ok(Outcome::Completed);
                }
                Err(error) => error,
            };

            let failure = classify_error(&error);
            if failure == FailureType::Canceled {
                info!(attempt, "call canceled");
                return Ok(Outcome::Canceled);
            }

            match policy.should_retry(failure, attempt) {
                RetryDecision::Retry { attempt: next } => {
                    warn!(
                        attempt,
                        next_attempt = next,
                        max_attempts = policy.max_attempts(),
                        error = %error,
                        "transient failure, retrying"
                    );
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(attempt, %reason, error = %error, "giving up");
                    return Err(error.into());
                }
            }
        }
    }
}
