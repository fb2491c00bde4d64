//! Scripted in-memory transports for engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use request_kit::{Transport, TransportError, WireRequest, WireResponse};
use reqwest::StatusCode;
use reqwest::header::{HeaderName, HeaderValue};

/// One scripted reply.
#[derive(Debug)]
pub enum Step {
    /// Fill the response and succeed.
    Reply {
        status: StatusCode,
        headers: Vec<(&'static str, &'static str)>,
        body: Vec<u8>,
    },
    /// Fill the response headers, then fail.
    FailAfterHeaders {
        headers: Vec<(&'static str, &'static str)>,
        error: TransportError,
    },
    /// Fail without touching the response.
    Fail(TransportError),
}

impl Step {
    pub fn ok(body: &str) -> Self {
        Self::Reply {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn timeout() -> Self {
        Self::Fail(TransportError::timeout("http://stub.test/"))
    }

    pub fn closed() -> Self {
        Self::Fail(TransportError::connection_closed(
            "http://stub.test/",
            "peer reset",
        ))
    }
}

/// Replays [`Step`]s in order; once exhausted every call replies `200 ok`.
#[derive(Debug, Default)]
pub struct StubTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    redirect_calls: AtomicUsize,
    seen: Mutex<Vec<WireRequest>>,
    /// URI reported as the last hop by `execute_redirects`.
    final_uri: Option<&'static str>,
}

#[allow(dead_code)]
impl StubTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    /// Makes `execute_redirects` report a hop to `uri` on success.
    pub fn redirecting_to(mut self, uri: &'static str) -> Self {
        self.final_uri = Some(uri);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn redirect_calls(&self) -> usize {
        self.redirect_calls.load(Ordering::SeqCst)
    }

    /// Requests exactly as the transport received them.
    pub fn seen(&self) -> Vec<WireRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn play(&self, request: &WireRequest, response: &mut WireResponse) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::ok("ok"));

        match step {
            Step::Reply {
                status,
                headers,
                body,
            } => {
                response.reset();
                response.set_status(status);
                fill_headers(response, &headers);
                response.set_body(body);
                Ok(())
            }
            Step::FailAfterHeaders { headers, error } => {
                response.reset();
                fill_headers(response, &headers);
                Err(error)
            }
            Step::Fail(error) => Err(error),
        }
    }
}

fn fill_headers(response: &mut WireResponse, headers: &[(&'static str, &'static str)]) {
    for &(name, value) in headers {
        response
            .headers_mut()
            .append(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(
        &self,
        request: &WireRequest,
        response: &mut WireResponse,
    ) -> Result<(), TransportError> {
        self.play(request, response)
    }

    async fn execute_redirects(
        &self,
        request: &WireRequest,
        response: &mut WireResponse,
        _max_redirects: usize,
    ) -> Result<Option<WireRequest>, TransportError> {
        self.redirect_calls.fetch_add(1, Ordering::SeqCst);
        self.play(request, response)?;
        Ok(self.final_uri.map(|uri| {
            let mut hop = request.clone();
            hop.clear_uri();
            hop.set_uri(uri);
            hop
        }))
    }
}
