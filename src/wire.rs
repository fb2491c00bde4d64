//! Owned wire-level request and response values.
//!
//! These are what a [`Transport`](crate::transport::Transport) reads and
//! writes. Both types reset in place so pooled wrappers keep their
//! allocations across tenants, and both render an HTTP/1.1 text snapshot
//! through `Display` for trace entries.

use std::fmt;
use std::time::Duration;

use reqwest::header::{
    CONTENT_ENCODING, CONTENT_LENGTH, COOKIE, HOST, HeaderMap, HeaderName, HeaderValue, SET_COOKIE,
    TRANSFER_ENCODING,
};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::RequestError;

/// A mutable HTTP request as handed to the transport.
#[derive(Debug, Clone, Default)]
pub struct WireRequest {
    method: Method,
    uri: String,
    /// `Some` replaces the query string of `uri` entirely.
    query: Option<Vec<(String, String)>>,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    body: Vec<u8>,
    timeout: Option<Duration>,
    tls_server_name: Option<String>,
}

impl WireRequest {
    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Sets the request method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Returns the request URI exactly as it was set.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Sets the request URI. Any query override is kept.
    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = uri.into();
    }

    /// Replaces the query string with the given pairs.
    pub fn set_query(&mut self, pairs: Vec<(String, String)>) {
        self.query = Some(pairs);
    }

    /// Clears the URI and any query override.
    pub fn clear_uri(&mut self) {
        self.uri.clear();
        self.query = None;
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the request cookies in insertion order.
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Sets a request cookie, updating the value of an existing cookie with
    /// the same name and keeping every other cookie.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        if let Some(existing) = self.cookies.iter_mut().find(|(n, _)| n == name) {
            existing.1.clear();
            existing.1.push_str(value);
        } else {
            self.cookies.push((name.to_string(), value.to_string()));
        }
    }

    /// Merges the `name=value` pairs of a `Cookie` header value into the
    /// request cookies. Pairs without `=` are ignored.
    pub fn merge_cookie_header(&mut self, value: &str) {
        for pair in value.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                self.set_cookie(name.trim(), value.trim());
            }
        }
    }

    /// Removes every request cookie.
    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    /// Renders the request cookies as a single `Cookie` header value.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replaces the request body.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// Empties the request body.
    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    /// Per-call deadline, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets the per-call deadline.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// TLS server name to present instead of the URL host.
    #[must_use]
    pub fn tls_server_name(&self) -> Option<&str> {
        self.tls_server_name.as_deref()
    }

    /// Sets the TLS server name override.
    pub fn set_tls_server_name(&mut self, name: Option<String>) {
        self.tls_server_name = name;
    }

    /// Builds the target URL, applying the query override.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the URI is not an absolute URL.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.uri)?;
        if let Some(pairs) = &self.query {
            if pairs.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(pairs.iter());
            }
        }
        Ok(url)
    }

    /// Returns every field to its default value, keeping allocations.
    pub fn reset(&mut self) {
        self.method = Method::GET;
        self.uri.clear();
        self.query = None;
        self.headers.clear();
        self.cookies.clear();
        self.body.clear();
        self.timeout = None;
        self.tls_server_name = None;
    }

    /// Parses a raw HTTP/1.x request.
    ///
    /// An absolute-form request target is used as the URI. An origin-form
    /// target is resolved against the `Host` header with the `http` scheme.
    /// `Cookie` headers become request cookies; `Content-Length` and
    /// `Transfer-Encoding` are dropped because the transport frames the body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MalformedRaw`] for a missing or invalid request
    /// line, an invalid header, or an origin-form target without `Host`.
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let (head, body) = split_head_body(raw);
        let mut lines = head.lines().map(|line| line.trim_end_matches('\r'));

        let request_line = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| RequestError::malformed_raw("missing request line"))?;
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Err(RequestError::malformed_raw(format!(
                "invalid request line: {request_line}"
            )));
        };
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| RequestError::malformed_raw(format!("invalid method: {method}")))?;

        let mut request = Self {
            method,
            ..Self::default()
        };

        for line in lines {
            if line.is_empty() {
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                return Err(RequestError::malformed_raw(format!(
                    "invalid header line: {line}"
                )));
            };
            let name = name.trim();
            let value = value.trim();
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| RequestError::malformed_raw(format!("invalid header name: {name}")))?;

            if header_name == COOKIE {
                request.merge_cookie_header(value);
                continue;
            }
            if header_name == CONTENT_LENGTH || header_name == TRANSFER_ENCODING {
                continue;
            }

            let header_value = HeaderValue::from_str(value).map_err(|_| {
                RequestError::malformed_raw(format!("invalid value for header {name}"))
            })?;
            request.headers.append(header_name, header_value);
        }

        request.uri = if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            let host = request
                .headers
                .get(HOST)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| {
                    RequestError::malformed_raw("origin-form target requires a Host header")
                })?;
            format!("http://{host}{target}")
        };
        request.body = body.as_bytes().to_vec();

        Ok(request)
    }

    fn request_target(&self) -> String {
        match self.url() {
            Ok(url) => match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            },
            Err(_) => self.uri.clone(),
        }
    }
}

fn split_head_body(raw: &str) -> (&str, &str) {
    if let Some(index) = raw.find("\r\n\r\n") {
        (&raw[..index], &raw[index + 4..])
    } else if let Some(index) = raw.find("\n\n") {
        (&raw[..index], &raw[index + 2..])
    } else {
        (raw, "")
    }
}

impl fmt::Display for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} HTTP/1.1\r\n", self.method, self.request_target())?;
        if !self.headers.contains_key(HOST)
            && let Ok(url) = self.url()
            && let Some(host) = url.host_str()
        {
            match url.port() {
                Some(port) => write!(f, "Host: {host}:{port}\r\n")?,
                None => write!(f, "Host: {host}\r\n")?,
            }
        }
        write_headers(f, &self.headers)?;
        if let Some(cookie) = self.cookie_header() {
            write!(f, "Cookie: {cookie}\r\n")?;
        }
        f.write_str("\r\n")?;
        f.write_str(&String::from_utf8_lossy(&self.body))
    }
}

/// A mutable HTTP response as filled in by the transport.
#[derive(Debug, Clone, Default)]
pub struct WireResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// The response body is still content-encoded with an encoding this layer
/// cannot undo.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported content encoding: {0}")]
pub struct UnsupportedEncoding(pub String);

impl WireResponse {
    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the first value of a header as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Iterates over every `Set-Cookie` value that is valid text.
    pub fn set_cookie_values(&self) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
    }

    /// Returns the raw body bytes as received.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// Appends bytes to the body.
    pub fn extend_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    /// Returns the body with any content encoding removed.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedEncoding`] when a `Content-Encoding` other than
    /// `identity` is still present.
    pub fn body_uncompressed(&self) -> Result<&[u8], UnsupportedEncoding> {
        match self.header(CONTENT_ENCODING.as_str()).map(str::trim) {
            None | Some("") => Ok(&self.body),
            Some(encoding) if encoding.eq_ignore_ascii_case("identity") => Ok(&self.body),
            Some(encoding) => Err(UnsupportedEncoding(encoding.to_string())),
        }
    }

    /// Renders the status line and headers.
    #[must_use]
    pub fn header_block(&self) -> String {
        let mut block = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("")
        );
        for (name, value) in &self.headers {
            block.push_str(&canonical_name(name));
            block.push_str(": ");
            block.push_str(&String::from_utf8_lossy(value.as_bytes()));
            block.push_str("\r\n");
        }
        block.push_str("\r\n");
        block
    }

    /// Returns every field to its default value, keeping allocations.
    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
    }
}

impl fmt::Display for WireResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_block())?;
        f.write_str(&String::from_utf8_lossy(&self.body))
    }
}

fn write_headers(f: &mut fmt::Formatter<'_>, headers: &HeaderMap) -> fmt::Result {
    for (name, value) in headers {
        write!(
            f,
            "{}: {}\r\n",
            canonical_name(name),
            String::from_utf8_lossy(value.as_bytes())
        )?;
    }
    Ok(())
}

/// Renders a header name the way it is written on the wire, with every
/// dash-separated word capitalised (`content-type` becomes `Content-Type`).
#[must_use]
pub fn canonical_name(name: &HeaderName) -> String {
    let mut canonical = String::with_capacity(name.as_str().len());
    let mut upper = true;
    for c in name.as_str().chars() {
        if upper {
            canonical.push(c.to_ascii_uppercase());
        } else {
            canonical.push(c);
        }
        upper = c == '-';
    }
    canonical
}
