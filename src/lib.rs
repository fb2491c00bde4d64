//! request-kit
//!
//! A pooled HTTP request/response convenience layer. It sits above a wire
//! engine (reqwest by default) and owns the parts of a call that callers keep
//! rewriting: object reuse, the retry and redirect loop, cookie persistence,
//! multipart bodies and response decoding.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`pool`] - Request/response free lists with exhaustive reset on release
//! - [`request`] - Fluent builder and the execution engine (`send`)
//! - [`response`] - Lazy text decoding (UTF-8 / GB18030), title and regex extraction
//! - [`cookies`] - Adapter between `Set-Cookie` headers and a URL-scoped jar
//! - [`multipart`] - `multipart/form-data` encoding
//! - [`transport`] - The [`Transport`] seam and the reqwest-backed [`HttpClient`]
//! - [`retry`] - Failure classification and the retry budget
//! - [`config`] - Client configuration and config-file loading
//! - [`wire`] - Owned wire-level request/response values
//! - [`trace`] - Per-call trace records
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
//! request.get("https://example.com/", RequestOptions::new()).retry(2);
//! request.send(&mut response).await?;
//! println!("{}", response.title());
//! pool.release_pair(request, response);
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod cookies;
pub mod error;
pub mod multipart;
pub mod pool;
pub mod request;
pub mod response;
pub mod retry;
pub mod trace;
pub mod transport;
pub mod wire;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError, ProxyConfig, load_config_file, parse_config_str};
pub use cookies::{CookieStore, inject_cookies, persist_cookies};
pub use error::RequestError;
pub use multipart::{File, Files, MultipartBody, MultipartError};
pub use pool::{Pool, Recycle, RequestPool};
pub use request::{Data, Headers, Outcome, Params, Request, RequestOptions};
pub use response::Response;
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
pub use trace::{TraceInfo, TraceLog};
pub use transport::{HttpClient, Transport, TransportError};
pub use wire::{UnsupportedEncoding, WireRequest, WireResponse};
