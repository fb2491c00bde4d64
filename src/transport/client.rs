//! reqwest-backed [`Transport`] implementation.
//!
//! The underlying reqwest client never follows redirects on its own; redirect
//! following is done here, hop by hop, so the execution engine controls the
//! budget per call.

use std::borrow::Cow;
use std::net::SocketAddr;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, COOKIE, HOST, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Method, Proxy, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{Transport, TransportError};
use crate::config::{ClientConfig, ProxyConfig};
use crate::wire::{WireRequest, WireResponse};

/// HTTP/1.1 client built once from a [`ClientConfig`].
///
/// Cloning is cheap and clones share the connection pool. The configuration
/// is fixed at construction; use [`HttpClient::with_proxy`] to derive a
/// sibling client (for example a dedicated retry client) instead of mutating
/// a shared one.
///
/// # Example
///
/// ```no_run
/// use request_kit::{ClientConfig, HttpClient, ProxyConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let primary = HttpClient::new(ClientConfig::default())?;
/// let retry = primary.with_proxy(Some(ProxyConfig::socks5("127.0.0.1:1080")))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
}

impl HttpClient {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] when the proxy URL is invalid or the
    /// TLS backend cannot be initialised.
    #[instrument(level = "debug", skip(config), fields(proxy = ?config.proxy))]
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let client = base_client_builder(&config)?
            .build()
            .map_err(|source| TransportError::Build { source })?;
        Ok(Self { client, config })
    }

    /// Builds a new client with the same settings and a different proxy.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::new`].
    pub fn with_proxy(&self, proxy: Option<ProxyConfig>) -> Result<Self, TransportError> {
        Self::new(self.config.clone().with_proxy(proxy))
    }

    /// Returns the configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// One request/response exchange on the wire.
    async fn dispatch(
        &self,
        request: &WireRequest,
        response: &mut WireResponse,
    ) -> Result<(), TransportError> {
        let mut url = request
            .url()
            .map_err(|_| TransportError::invalid_url(request.uri()))?;
        let display_url = url.to_string();
        let client = self.client_for(request, &mut url).await?;

        let mut builder = client
            .request(request.method().clone(), url)
            .headers(request.headers().clone());
        if let Some(cookie) = request.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }
        if !request.body().is_empty() {
            builder = builder.body(request.body().to_vec());
        }
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }

        let reply = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(display_url.as_str(), e))?;

        response.reset();
        response.set_status(reply.status());
        *response.headers_mut() = reply.headers().clone();
        read_body(reply, response, self.config.max_body_size, &display_url).await
    }

    /// Picks the client for this request.
    ///
    /// With a TLS server name override on an HTTPS target, the original host
    /// is resolved, the URL is rewritten to the server name, and a one-off
    /// client pins the server name to the resolved addresses. The shared
    /// client is never modified.
    async fn client_for(
        &self,
        request: &WireRequest,
        url: &mut Url,
    ) -> Result<Cow<'_, Client>, TransportError> {
        let Some(server_name) = request.tls_server_name() else {
            return Ok(Cow::Borrowed(&self.client));
        };
        if url.scheme() != "https" || url.host_str() == Some(server_name) {
            return Ok(Cow::Borrowed(&self.client));
        }

        let host = url
            .host_str()
            .ok_or_else(|| TransportError::invalid_url(url.as_str()))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(443);
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| TransportError::protocol(url.as_str(), format!("resolving {host}: {e}")))?
            .collect();

        url.set_host(Some(server_name))
            .map_err(|_| TransportError::invalid_url(server_name))?;
        debug!(%host, %server_name, "dialing with overridden TLS server name");

        let client = base_client_builder(&self.config)?
            .resolve_to_addrs(server_name, &addrs)
            .build()
            .map_err(|source| TransportError::Build { source })?;
        Ok(Cow::Owned(client))
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(
        level = "debug",
        skip(self, request, response),
        fields(method = %request.method(), uri = %request.uri())
    )]
    async fn execute(
        &self,
        request: &WireRequest,
        response: &mut WireResponse,
    ) -> Result<(), TransportError> {
        let attempts = if is_idempotent(request.method()) {
            self.config.idempotent_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            match self.dispatch(request, response).await {
                Err(TransportError::ConnectionClosed { detail, .. }) if attempt < attempts => {
                    debug!(attempt, %detail, "connection closed; re-dialing idempotent request");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    #[instrument(
        level = "debug",
        skip(self, request, response),
        fields(method = %request.method(), uri = %request.uri())
    )]
    async fn execute_redirects(
        &self,
        request: &WireRequest,
        response: &mut WireResponse,
        max_redirects: usize,
    ) -> Result<Option<WireRequest>, TransportError> {
        let mut current = Cow::Borrowed(request);
        let mut redirects = 0;

        loop {
            self.execute(&current, response).await?;

            let status = response.status();
            if !is_redirect(status) {
                return Ok(final_hop(current));
            }
            let Some(location) = response.header(LOCATION.as_str()).map(str::to_string) else {
                debug!(%status, "redirect without Location; returning as-is");
                return Ok(final_hop(current));
            };

            redirects += 1;
            if redirects > max_redirects {
                warn!(redirects, max = max_redirects, "redirect budget exhausted");
                return Err(TransportError::too_many_redirects(
                    request.uri(),
                    max_redirects,
                ));
            }

            let base = current
                .url()
                .map_err(|_| TransportError::invalid_url(current.uri()))?;
            let next = base
                .join(&location)
                .map_err(|_| TransportError::invalid_url(location.as_str()))?;
            debug!(redirects, %status, location = %next, "following redirect");

            let next_request = current.to_mut();
            if next.host_str() != base.host_str() {
                next_request.headers_mut().remove(HOST);
                next_request.set_tls_server_name(None);
            }
            next_request.clear_uri();
            next_request.set_uri(next.to_string());
            if status == StatusCode::SEE_OTHER
                || (matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND)
                    && next_request.method() == Method::POST)
            {
                next_request.set_method(Method::GET);
                next_request.clear_body();
                next_request.headers_mut().remove(CONTENT_TYPE);
            }
        }
    }
}

fn base_client_builder(config: &ClientConfig) -> Result<ClientBuilder, TransportError> {
    let mut builder = Client::builder()
        .http1_only()
        .redirect(Policy::none())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .pool_idle_timeout(config.idle_timeout)
        .connect_timeout(config.write_timeout)
        .read_timeout(config.read_timeout)
        .http1_title_case_headers()
        .gzip(true);

    builder = match &config.proxy {
        Some(proxy) => builder.proxy(
            Proxy::all(proxy.proxy_url()).map_err(|source| TransportError::Build { source })?,
        ),
        None => builder.no_proxy(),
    };
    Ok(builder)
}

/// Streams the body into `response`, failing once `limit` is exceeded.
async fn read_body(
    reply: reqwest::Response,
    response: &mut WireResponse,
    limit: usize,
    url: &str,
) -> Result<(), TransportError> {
    let limit_bytes = u64::try_from(limit).unwrap_or(u64::MAX);
    if reply.content_length().is_some_and(|len| len > limit_bytes) {
        return Err(TransportError::body_too_large(url, limit));
    }

    let mut stream = reply.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TransportError::from_reqwest(url, e))?;
        if response.body().len() + chunk.len() > limit {
            return Err(TransportError::body_too_large(url, limit));
        }
        response.extend_body(&chunk);
    }
    Ok(())
}

fn final_hop(current: Cow<'_, WireRequest>) -> Option<WireRequest> {
    match current {
        Cow::Owned(hop) => Some(hop),
        Cow::Borrowed(_) => None,
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        method.as_str(),
        "GET" | "HEAD" | "PUT" | "DELETE" | "OPTIONS" | "TRACE"
    )
}
