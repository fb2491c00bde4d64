//! Per-call options accepted by the method shortcuts.

use std::collections::BTreeMap;

use crate::multipart::Files;

/// Query-string arguments.
pub type Params = BTreeMap<String, String>;

/// Form fields, sent as an `application/x-www-form-urlencoded` body.
pub type Data = BTreeMap<String, String>;

/// Request headers.
pub type Headers = BTreeMap<String, String>;

/// Everything a method shortcut such as
/// [`Request::get`](crate::Request::get) can apply in one go.
///
/// At most one body-producing option (`body`, `files`, `data`) may be set;
/// combining them is reported as
/// [`RequestError::ConflictingBody`](crate::RequestError::ConflictingBody).
///
/// # Example
///
/// ```
/// use request_kit::{Params, RequestOptions};
///
/// let mut params = Params::new();
/// params.insert("q".into(), "rust".into());
/// let options = RequestOptions::new().params(params).body(r#"{"k":1}"#);
/// assert!(options.body_sources().len() == 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Raw body; content type is inferred.
    pub body: Option<Vec<u8>>,
    /// Multipart parts.
    pub files: Option<Files>,
    /// Headers to set.
    pub headers: Option<Headers>,
    /// Query-string arguments replacing those of the URI.
    pub params: Option<Params>,
    /// Form fields.
    pub data: Option<Data>,
}

impl RequestOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets multipart parts.
    #[must_use]
    pub fn files(mut self, files: Files) -> Self {
        self.files = Some(files);
        self
    }

    /// Sets headers.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Sets query-string arguments.
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Sets form fields.
    #[must_use]
    pub fn data(mut self, data: Data) -> Self {
        self.data = Some(data);
        self
    }

    /// Names of the body-producing options that are set.
    #[must_use]
    pub fn body_sources(&self) -> Vec<&'static str> {
        let mut sources = Vec::new();
        if self.body.is_some() {
            sources.push("body");
        }
        if self.files.is_some() {
            sources.push("files");
        }
        if self.data.is_some() {
            sources.push("data");
        }
        sources
    }
}
