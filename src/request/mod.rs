//! Fluent request builder.
//!
//! Setters take `&mut self` and return `&mut Self` so calls chain on a
//! pooled [`Request`]. They never fail on the spot: the first invalid input
//! is kept as a deferred error and returned by [`Request::send`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use request_kit::{ClientConfig, HttpClient, RequestOptions, RequestPool};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = RequestPool::new(Arc::new(HttpClient::new(ClientConfig::default())?));
//! let (mut request, mut response) = pool.acquire_pair();
//!
//! request
//!     .post("https://example.com/login", RequestOptions::new().body("user=me"))
//!     .max_redirects(5)
//!     .retry(2);
//! request.send(&mut response).await?;
//! println!("{} {}", response.status(), response.title());
//!
//! pool.release_pair(request, response);
//! # Ok(())
//! # }
//! ```

mod execute;
mod options;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use reqwest::Method;
use reqwest::header::{
    AUTHORIZATION, CONTENT_TYPE, COOKIE, HOST, HeaderName, HeaderValue, USER_AGENT,
};

pub use execute::Outcome;
pub use options::{Data, Headers, Params, RequestOptions};

use crate::constants::{
    CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, CONTENT_TYPE_OCTET_STREAM, CONTENT_TYPE_XML,
    METHOD_DELETE, METHOD_GET, METHOD_HEAD, METHOD_MOVE, METHOD_OPTIONS, METHOD_PATCH,
    METHOD_POST, METHOD_PUT,
};
use crate::cookies::CookieStore;
use crate::error::RequestError;
use crate::multipart::{self, Files};
use crate::pool::Recycle;
use crate::trace::TraceLog;
use crate::transport::Transport;
use crate::wire::WireRequest;

/// One outgoing HTTP call and the policy driving it.
#[derive(Debug, Default)]
pub struct Request {
    wire: WireRequest,
    trace: Option<TraceLog>,
    /// 0 or 1 disables redirect following.
    max_redirects: usize,
    max_retry: u32,
    retry_client: Option<Arc<dyn Transport>>,
    jar: Option<Arc<dyn CookieStore>>,
    client: Option<Arc<dyn Transport>>,
    error: Option<RequestError>,
}

impl Request {
    /// Creates an empty request with no transport or cookie jar attached.
    ///
    /// Requests are normally obtained from a
    /// [`RequestPool`](crate::RequestPool), which attaches both.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Wire fields ====================

    /// Sets the method. Any valid HTTP token is accepted.
    pub fn method(&mut self, method: &str) -> &mut Self {
        match Method::from_bytes(method.as_bytes()) {
            Ok(method) => self.wire.set_method(method),
            Err(_) => self.defer(RequestError::invalid_method(method)),
        }
        self
    }

    /// Sets the target URI, dropping any query arguments set earlier.
    pub fn uri(&mut self, uri: &str) -> &mut Self {
        self.wire.clear_uri();
        self.wire.set_uri(uri);
        self
    }

    /// Sets the `User-Agent` header.
    pub fn user_agent(&mut self, user_agent: &str) -> &mut Self {
        self.set_header(USER_AGENT, user_agent)
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(&mut self, content_type: &str) -> &mut Self {
        self.set_header(CONTENT_TYPE, content_type)
    }

    /// Sets a header, replacing any previous value.
    ///
    /// A `Cookie` header is split into request cookies so it is sent as one
    /// line together with jar cookies.
    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        match HeaderName::from_bytes(name.as_bytes()) {
            Ok(header_name) => self.set_header(header_name, value),
            Err(e) => {
                self.defer(RequestError::invalid_header(name, e.to_string()));
                self
            }
        }
    }

    /// Sets every header in `headers`.
    pub fn headers(&mut self, headers: &Headers) -> &mut Self {
        for (name, value) in headers {
            self.header(name, value);
        }
        self
    }

    /// Sets the body and infers the content type from its first byte.
    ///
    /// | Body | Content type |
    /// |------|--------------|
    /// | starts with `{` or `[` | JSON |
    /// | starts with `<` | XML |
    /// | contains `=` or `%` | form |
    /// | anything else non-empty | octet-stream |
    ///
    /// An empty body leaves the content type untouched.
    pub fn body_raw(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        let body = body.into();
        let content_type = match body.first() {
            None => None,
            Some(b'{' | b'[') => Some(CONTENT_TYPE_JSON),
            Some(b'<') => Some(CONTENT_TYPE_XML),
            Some(_) if body.iter().any(|b| matches!(b, b'=' | b'%')) => Some(CONTENT_TYPE_FORM),
            Some(_) => Some(CONTENT_TYPE_OCTET_STREAM),
        };
        self.wire.set_body(body);
        if let Some(content_type) = content_type {
            self.content_type(content_type);
        }
        self
    }

    /// Replaces the query string with `params`.
    pub fn params(&mut self, params: &Params) -> &mut Self {
        self.wire.set_query(
            params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        self
    }

    /// Replaces the body with the form encoding of `data`.
    pub fn data(&mut self, data: &Data) -> &mut Self {
        self.content_type(CONTENT_TYPE_FORM);
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(data.iter())
            .finish();
        self.wire.set_body(encoded.into_bytes());
        self
    }

    /// Replaces the body with a `multipart/form-data` encoding of `files`.
    pub fn multipart_files(&mut self, files: &Files) -> &mut Self {
        match multipart::encode(files) {
            Ok(encoded) => {
                let content_type = encoded.content_type();
                self.wire.set_body(encoded.body);
                self.content_type(&content_type);
            }
            Err(e) => self.defer(e.into()),
        }
        self
    }

    /// Forces the `Host` header.
    ///
    /// For an `https` target the TLS server name is set to the host without
    /// its port. Set the URI first. An empty host is ignored.
    pub fn host(&mut self, host: &str) -> &mut Self {
        if host.is_empty() {
            return self;
        }
        self.set_header(HOST, host);
        if self.wire.url().is_ok_and(|url| url.scheme() == "https") {
            let server_name = host.split(':').next().unwrap_or(host);
            self.wire.set_tls_server_name(Some(server_name.to_string()));
        }
        self
    }

    /// Sets `Authorization: Basic` credentials.
    pub fn basic_auth(&mut self, username: &str, password: &str) -> &mut Self {
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        self.set_header(AUTHORIZATION, &format!("Basic {token}"))
    }

    /// Sets a deadline for each dispatch of this request.
    ///
    /// The clients attached to the request are not modified.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.wire.set_timeout(Some(timeout));
        self
    }

    /// Replaces the wire request with one parsed from raw HTTP/1.1 text.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MalformedRaw`] when the text is not a valid
    /// request.
    pub fn from_raw(&mut self, raw: &str) -> Result<&mut Self, RequestError> {
        self.wire = WireRequest::parse(raw)?;
        Ok(self)
    }

    /// Empties the body.
    pub fn reset_body(&mut self) -> &mut Self {
        self.wire.clear_body();
        self
    }

    /// Clears the URI together with its query arguments.
    pub fn reset_params(&mut self) -> &mut Self {
        self.wire.clear_uri();
        self
    }

    /// Removes every header and request cookie.
    pub fn reset_headers(&mut self) -> &mut Self {
        self.wire.headers_mut().clear();
        self.wire.clear_cookies();
        self
    }

    // ==================== Method shortcuts ====================

    /// Prepares a `GET` to `uri`.
    pub fn get(&mut self, uri: &str, options: RequestOptions) -> &mut Self {
        self.method(METHOD_GET).prepare(uri, options)
    }

    /// Prepares a `POST` to `uri`.
    pub fn post(&mut self, uri: &str, options: RequestOptions) -> &mut Self {
        self.method(METHOD_POST).prepare(uri, options)
    }

    /// Prepares a `PUT` to `uri`.
    pub fn put(&mut self, uri: &str, options: RequestOptions) -> &mut Self {
        self.method(METHOD_PUT).prepare(uri, options)
    }

    /// Prepares a `DELETE` to `uri`.
    pub fn delete(&mut self, uri: &str, options: RequestOptions) -> &mut Self {
        self.method(METHOD_DELETE).prepare(uri, options)
    }

    /// Prepares a `HEAD` to `uri`.
    pub fn head(&mut self, uri: &str, options: RequestOptions) -> &mut Self {
        self.method(METHOD_HEAD).prepare(uri, options)
    }

    /// Prepares an `OPTIONS` to `uri`.
    pub fn options(&mut self, uri: &str, options: RequestOptions) -> &mut Self {
        self.method(METHOD_OPTIONS).prepare(uri, options)
    }

    /// Prepares a `PATCH` to `uri`.
    pub fn patch(&mut self, uri: &str, options: RequestOptions) -> &mut Self {
        self.method(METHOD_PATCH).prepare(uri, options)
    }

    /// Prepares a WebDAV `MOVE` of `uri`.
    pub fn move_to(&mut self, uri: &str, options: RequestOptions) -> &mut Self {
        self.method(METHOD_MOVE).prepare(uri, options)
    }

    fn prepare(&mut self, uri: &str, options: RequestOptions) -> &mut Self {
        self.reset_body();
        self.uri(uri);

        let sources = options.body_sources();
        if sources.len() > 1 {
            self.defer(RequestError::conflicting_body(&sources));
            return self;
        }

        let RequestOptions {
            body,
            files,
            headers,
            params,
            data,
        } = options;
        if let Some(headers) = headers {
            self.headers(&headers);
        }
        if let Some(params) = params {
            self.params(&params);
        }
        if let Some(body) = body {
            self.body_raw(body);
        }
        if let Some(files) = files {
            self.multipart_files(&files);
        }
        if let Some(data) = data {
            self.data(&data);
        }
        self
    }

    // ==================== Call policy ====================

    /// Sets the redirect budget. 0 and 1 disable redirect following.
    pub fn max_redirects(&mut self, max_redirects: usize) -> &mut Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Allows `max_retry` further attempts after a transient failure.
    pub fn retry(&mut self, max_retry: u32) -> &mut Self {
        self.max_retry = max_retry;
        self
    }

    /// Sets the transport used for attempts after the first.
    ///
    /// Without one, retries go through the primary client.
    pub fn retry_client(&mut self, client: Arc<dyn Transport>) -> &mut Self {
        self.retry_client = Some(client);
        self
    }

    /// Sets the transport used for the first attempt.
    pub fn client(&mut self, client: Arc<dyn Transport>) -> &mut Self {
        self.client = Some(client);
        self
    }

    /// Sets the cookie jar, for example to share one across requests.
    pub fn jar(&mut self, jar: Arc<dyn CookieStore>) -> &mut Self {
        self.jar = Some(jar);
        self
    }

    /// Records one [`TraceInfo`](crate::TraceInfo) per call into `log`.
    pub fn with_trace(&mut self, log: &TraceLog) -> &mut Self {
        self.trace = Some(log.clone());
        self
    }

    /// Empties the attached trace log, if any.
    pub fn clear_trace(&mut self) -> &mut Self {
        if let Some(trace) = &self.trace {
            trace.clear();
        }
        self
    }

    // ==================== Accessors ====================

    /// Returns the wire request.
    #[must_use]
    pub fn wire(&self) -> &WireRequest {
        &self.wire
    }

    /// Returns the wire request for modification.
    pub fn wire_mut(&mut self) -> &mut WireRequest {
        &mut self.wire
    }

    /// Returns the redirect budget.
    #[must_use]
    pub fn redirect_budget(&self) -> usize {
        self.max_redirects
    }

    /// Returns the retry budget.
    #[must_use]
    pub fn retry_budget(&self) -> u32 {
        self.max_retry
    }

    /// Returns the deferred configuration error, if any.
    #[must_use]
    pub fn deferred_error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    fn set_header(&mut self, name: HeaderName, value: &str) -> &mut Self {
        if name == COOKIE {
            self.wire.merge_cookie_header(value);
            return self;
        }
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.wire.headers_mut().insert(name, value);
            }
            Err(e) => self.defer(RequestError::invalid_header(name.as_str(), e.to_string())),
        }
        self
    }

    fn defer(&mut self, error: RequestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl Recycle for Request {
    fn recycle(&mut self) {
        let Self {
            wire,
            trace,
            max_redirects,
            max_retry,
            retry_client,
            jar,
            client,
            error,
        } = self;
        wire.reset();
        *trace = None;
        *max_redirects = 0;
        *max_retry = 0;
        *retry_client = None;
        *jar = None;
        *client = None;
        *error = None;
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.wire.fmt(f)
    }
}
