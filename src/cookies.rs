//! Cookie jar adapter.
//!
//! Bridges `Set-Cookie` response headers and request cookies to a URL-scoped
//! [`CookieStore`]. Domain, path and expiry matching belong to the store; the
//! adapter only translates in both directions.
//!
//! Cookie values are never logged.

use cookie::Cookie;
use reqwest::header::HeaderValue;
use tracing::{debug, trace, warn};
use url::Url;

use crate::wire::{WireRequest, WireResponse};

/// A URL-scoped cookie store.
pub trait CookieStore: Send + Sync + std::fmt::Debug {
    /// Returns the cookies that apply to `url`.
    fn cookies_for(&self, url: &Url) -> Vec<Cookie<'static>>;

    /// Stores cookies received from `url`.
    fn store(&self, url: &Url, cookies: Vec<Cookie<'static>>);
}

impl CookieStore for reqwest::cookie::Jar {
    fn cookies_for(&self, url: &Url) -> Vec<Cookie<'static>> {
        let Some(header) = reqwest::cookie::CookieStore::cookies(self, url) else {
            return Vec::new();
        };
        let Ok(header) = header.to_str() else {
            warn!(%url, "stored cookies are not valid header text");
            return Vec::new();
        };

        header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some(Cookie::new(name.to_string(), value.to_string()))
            })
            .collect()
    }

    fn store(&self, url: &Url, cookies: Vec<Cookie<'static>>) {
        let values: Vec<HeaderValue> = cookies
            .iter()
            .filter_map(|cookie| match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(name = cookie.name(), "cookie cannot be encoded as a header");
                    None
                }
            })
            .collect();
        reqwest::cookie::CookieStore::set_cookies(self, &mut values.iter(), url);
    }
}

/// Copies the store's cookies for `url` into the request.
///
/// Same-name request cookies are updated; other request cookies are kept.
pub fn inject_cookies(store: &dyn CookieStore, url: &Url, request: &mut WireRequest) {
    let cookies = store.cookies_for(url);
    if cookies.is_empty() {
        trace!(%url, "no stored cookies");
        return;
    }

    debug!(%url, count = cookies.len(), "injecting stored cookies");
    for cookie in &cookies {
        request.set_cookie(cookie.name(), cookie.value());
    }
}

/// Parses every `Set-Cookie` header of the response and stores the result
/// for `url`.
///
/// Headers that fail to parse are skipped with a warning.
pub fn persist_cookies(store: &dyn CookieStore, url: &Url, response: &WireResponse) {
    let cookies: Vec<Cookie<'static>> = response
        .set_cookie_values()
        .filter_map(|value| match Cookie::parse(value.to_string()) {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                warn!(%url, error = %e, "skipping unparseable Set-Cookie header");
                None
            }
        })
        .collect();

    if cookies.is_empty() {
        return;
    }
    debug!(%url, count = cookies.len(), "persisting response cookies");
    store.store(url, cookies);
}
