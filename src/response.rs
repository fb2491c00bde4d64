//! Response wrapper with lazy body decoding.
//!
//! [`Response::text`] and [`Response::title`] are computed on first use and
//! cached until the next call begins on this response (or it is released).

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use cookie::Cookie;
use regex::Regex;
use reqwest::StatusCode;
use tracing::debug;

use crate::pool::Recycle;
use crate::wire::WireResponse;

#[allow(clippy::expect_used)]
static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title.*?>(.*?)</title>").expect("title regex is valid")
});

#[allow(clippy::expect_used)]
static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\n\r\t]+").expect("line break regex is valid"));

/// A received HTTP response.
#[derive(Debug, Clone, Default)]
pub struct Response {
    wire: WireResponse,
    text: OnceCell<String>,
    title: OnceCell<String>,
}

impl Response {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the decoded body text.
    ///
    /// The uncompressed body is used when available, the raw body otherwise.
    /// Valid UTF-8 is returned as-is; anything else is decoded as GB18030,
    /// falling back to a lossy conversion of the original bytes.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| {
            let body = match self.wire.body_uncompressed() {
                Ok(body) => body,
                Err(e) => {
                    debug!(error = %e, "decoding raw body");
                    self.wire.body()
                }
            };
            decode_body(body)
        })
    }

    /// Returns the HTML `<title>` with entities decoded, line breaks and
    /// tabs removed, and surrounding whitespace trimmed.
    ///
    /// Empty when the body has no title.
    pub fn title(&self) -> &str {
        self.title.get_or_init(|| {
            TITLE_PATTERN
                .captures(self.text())
                .and_then(|caps| caps.get(1))
                .map(|m| {
                    let unescaped = html_escape::decode_html_entities(m.as_str());
                    LINE_BREAKS.replace_all(&unescaped, "").trim().to_string()
                })
                .unwrap_or_default()
        })
    }

    /// Matches `pattern` against the body text and returns each named group.
    ///
    /// Unnamed groups are skipped; a named group that did not participate
    /// maps to an empty string. No match yields an empty map.
    #[must_use]
    pub fn search(&self, pattern: &Regex) -> HashMap<String, String> {
        let Some(caps) = pattern.captures(self.text()) else {
            return HashMap::new();
        };
        pattern
            .capture_names()
            .flatten()
            .map(|name| {
                let value = caps.name(name).map_or("", |m| m.as_str());
                (name.to_string(), value.to_string())
            })
            .collect()
    }

    /// Returns whether the body text contains `needle`.
    pub fn body_contains(&self, needle: &str) -> bool {
        self.text().contains(needle)
    }

    /// Returns whether the status line and headers contain `needle`.
    ///
    /// Header names are matched in canonical form, e.g. `Server: nginx`.
    #[must_use]
    pub fn header_contains(&self, needle: &str) -> bool {
        self.wire.header_block().contains(needle)
    }

    /// Returns the value of the cookie `name` set by this response.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.wire
            .set_cookie_values()
            .filter_map(|value| Cookie::parse(value).ok())
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    /// Returns the first value of header `name`.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.wire.header(name)
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.wire.status()
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.wire.body()
    }

    /// Returns the underlying wire response.
    #[must_use]
    pub fn wire(&self) -> &WireResponse {
        &self.wire
    }

    /// Returns the underlying wire response for modification.
    ///
    /// Cached text and title are dropped, since the body may change.
    pub fn wire_mut(&mut self) -> &mut WireResponse {
        self.clear_caches();
        &mut self.wire
    }

    /// Prepares the response for a new call.
    pub(crate) fn begin_call(&mut self) {
        self.clear_caches();
        self.wire.reset();
    }

    fn clear_caches(&mut self) {
        self.text.take();
        self.title.take();
    }
}

impl Recycle for Response {
    fn recycle(&mut self) {
        self.begin_call();
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.wire.fmt(f)
    }
}

fn decode_body(body: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(body) {
        return text.to_string();
    }
    encoding_rs::GB18030
        .decode_without_bom_handling_and_without_replacement(body)
        .map_or_else(
            || String::from_utf8_lossy(body).into_owned(),
            std::borrow::Cow::into_owned,
        )
}
