//! Shared constants: method names, content types and client defaults.

use std::time::Duration;

/// `GET` method name.
pub const METHOD_GET: &str = "GET";
/// `POST` method name.
pub const METHOD_POST: &str = "POST";
/// `PUT` method name.
pub const METHOD_PUT: &str = "PUT";
/// WebDAV `MOVE` method name.
pub const METHOD_MOVE: &str = "MOVE";
/// `DELETE` method name.
pub const METHOD_DELETE: &str = "DELETE";
/// `HEAD` method name.
pub const METHOD_HEAD: &str = "HEAD";
/// `OPTIONS` method name.
pub const METHOD_OPTIONS: &str = "OPTIONS";
/// `PATCH` method name.
pub const METHOD_PATCH: &str = "PATCH";

/// JSON payloads.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// URL-encoded form payloads.
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
/// XML payloads.
pub const CONTENT_TYPE_XML: &str = "application/xml";
/// Plain text payloads.
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
/// Opaque binary payloads.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// User-Agent applied at send time when the caller did not set one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.6312.122 Safari/537.36";

/// Default idle lifetime of pooled connections (1 second).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default read timeout (5 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default write (connect) timeout (5 seconds).
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum response body size (10 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default number of transport-level attempts for idempotent requests.
pub const DEFAULT_IDEMPOTENT_ATTEMPTS: u32 = 1;

/// Upper bound on idle objects a pool keeps around.
pub const DEFAULT_POOL_CAPACITY: usize = 1024;
