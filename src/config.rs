//! Client configuration and config-file loading.
//!
//! A [`ClientConfig`] is built once and handed to
//! [`HttpClient::new`](crate::HttpClient::new); the resulting client never
//! changes afterwards, so it can be shared by any number of requests.
//!
//! Files use a flat `key = value` format with `#` comments and
//! double-quoted strings:
//!
//! ```text
//! read_timeout_secs = 10
//! write_timeout_secs = 10
//! max_body_size = 1048576
//! http_proxy = "127.0.0.1:8080" # local intercepting proxy
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::constants::{
    DEFAULT_IDEMPOTENT_ATTEMPTS, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT,
};

const MAX_TIMEOUT: Duration = Duration::from_secs(3600);
const MAX_IDEMPOTENT_ATTEMPTS: u32 = 10;

/// Proxy used to dial every connection of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyConfig {
    /// HTTP `CONNECT` proxy at `host:port`.
    Http(String),
    /// SOCKS5 proxy at `host:port`.
    Socks5(String),
}

impl ProxyConfig {
    /// HTTP proxy; a leading `http://` is accepted and stripped.
    #[must_use]
    pub fn http(addr: &str) -> Self {
        Self::Http(addr.strip_prefix("http://").unwrap_or(addr).to_string())
    }

    /// SOCKS5 proxy; a leading `socks5://` is accepted and stripped.
    #[must_use]
    pub fn socks5(addr: &str) -> Self {
        Self::Socks5(addr.strip_prefix("socks5://").unwrap_or(addr).to_string())
    }

    /// The proxy as a URL the engine understands.
    #[must_use]
    pub fn proxy_url(&self) -> String {
        match self {
            Self::Http(addr) => format!("http://{addr}"),
            Self::Socks5(addr) => format!("socks5://{addr}"),
        }
    }
}

/// Connection-level settings for one [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Accept any server certificate (the default, for scanning use).
    pub accept_invalid_certs: bool,
    /// How long an idle pooled connection is kept.
    pub idle_timeout: Duration,
    /// Read timeout for each response.
    pub read_timeout: Duration,
    /// Write timeout. Bounds connection establishment (TCP connect and TLS
    /// handshake) only; reqwest has no separate upload timeout, so request
    /// upload is bounded by the per-call timeout when one is set.
    pub write_timeout: Duration,
    /// Responses with larger bodies fail with `BodyTooLarge`.
    pub max_body_size: usize,
    /// Transport-level attempts for idempotent methods on closed connections.
    /// `1` disables transport-level re-dialing.
    pub idempotent_attempts: u32,
    /// Proxy used to dial connections.
    pub proxy: Option<ProxyConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: true,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            idempotent_attempts: DEFAULT_IDEMPOTENT_ATTEMPTS,
            proxy: None,
        }
    }
}

impl ClientConfig {
    /// Returns a copy with a different proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Returns a copy with both read and write timeouts set to `timeout`.
    #[must_use]
    pub fn with_timeouts(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self.write_timeout = timeout;
        self
    }

    /// Returns a copy with a different body size limit.
    #[must_use]
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Validates values against the supported ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("idle_timeout", self.idle_timeout)?;
        validate_timeout("read_timeout", self.read_timeout)?;
        validate_timeout("write_timeout", self.write_timeout)?;
        if self.max_body_size == 0 {
            return Err(ConfigError::out_of_range(
                "max_body_size",
                "must be greater than zero",
            ));
        }
        if !(1..=MAX_IDEMPOTENT_ATTEMPTS).contains(&self.idempotent_attempts) {
            return Err(ConfigError::out_of_range(
                "idempotent_attempts",
                format!("expected range 1..={MAX_IDEMPOTENT_ATTEMPTS}"),
            ));
        }
        Ok(())
    }
}

fn validate_timeout(field: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() || value > MAX_TIMEOUT {
        return Err(ConfigError::out_of_range(
            field,
            format!("expected a duration between 1ms and {}s", MAX_TIMEOUT.as_secs()),
        ));
    }
    Ok(())
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A line is not of the form `key = value`.
    #[error("invalid config syntax on line {line}: expected key = value")]
    Syntax {
        /// 1-based line number.
        line: usize,
    },

    /// A key this crate does not know.
    #[error("unknown configuration key '{key}' on line {line}")]
    UnknownKey {
        /// The unknown key.
        key: String,
        /// 1-based line number.
        line: usize,
    },

    /// A value could not be parsed for its key.
    #[error("invalid `{key}` value on line {line}: {reason}")]
    InvalidValue {
        /// The key whose value failed.
        key: String,
        /// 1-based line number.
        line: usize,
        /// What was expected.
        reason: String,
    },

    /// A parsed value is outside its supported range.
    #[error("invalid config value for `{key}`: {reason}")]
    OutOfRange {
        /// The offending field.
        key: String,
        /// The supported range.
        reason: String,
    },

    /// Both proxy kinds were configured.
    #[error("only one of `http_proxy` and `socks5_proxy` may be set")]
    ConflictingProxy,
}

impl ConfigError {
    fn out_of_range(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            key: key.into(),
            reason: reason.into(),
        }
    }

    fn invalid_value(key: &str, line: usize, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            line,
            reason: reason.into(),
        }
    }
}

/// Reads and parses a config file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read, or any parse or
/// validation error from [`parse_config_str`].
pub fn load_config_file(path: &Path) -> Result<ClientConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded client config file");
    parse_config_str(&raw)
}

/// Parses config text on top of [`ClientConfig::default`].
///
/// # Errors
///
/// Returns the first syntax, unknown-key, value or range error found.
pub fn parse_config_str(raw: &str) -> Result<ClientConfig, ConfigError> {
    let mut cfg = ClientConfig::default();
    let mut http_proxy = None;
    let mut socks5_proxy = None;

    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            return Err(ConfigError::Syntax { line: line_number });
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = |reason: String| ConfigError::invalid_value(key, line_number, reason);

        match key {
            "accept_invalid_certs" => {
                cfg.accept_invalid_certs = parse_boolean(value).map_err(invalid)?;
            }
            "idle_timeout_ms" => {
                cfg.idle_timeout = Duration::from_millis(parse_integer_u64(value).map_err(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout = Duration::from_secs(parse_integer_u64(value).map_err(invalid)?);
            }
            "write_timeout_secs" => {
                cfg.write_timeout = Duration::from_secs(parse_integer_u64(value).map_err(invalid)?);
            }
            "max_body_size" => {
                let parsed = parse_integer_u64(value).map_err(invalid)?;
                cfg.max_body_size = usize::try_from(parsed)
                    .map_err(|_| invalid("integer value out of range for usize".to_string()))?;
            }
            "idempotent_attempts" => {
                let parsed = parse_integer_u64(value).map_err(invalid)?;
                cfg.idempotent_attempts = u32::try_from(parsed)
                    .map_err(|_| invalid("integer value out of range for u32".to_string()))?;
            }
            "http_proxy" => {
                http_proxy = Some(ProxyConfig::http(
                    &parse_string_literal(value).map_err(invalid)?,
                ));
            }
            "socks5_proxy" => {
                socks5_proxy = Some(ProxyConfig::socks5(
                    &parse_string_literal(value).map_err(invalid)?,
                ));
            }
            unknown => {
                return Err(ConfigError::UnknownKey {
                    key: unknown.to_string(),
                    line: line_number,
                });
            }
        }
    }

    cfg.proxy = match (http_proxy, socks5_proxy) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingProxy),
        (http, socks) => http.or(socks),
    };
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String, String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        return Err("expected double-quoted string".to_string());
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64, String> {
    let token = raw_value.trim();
    if token.is_empty() {
        return Err("expected integer value".to_string());
    }
    let value = token.parse::<i128>().map_err(|e| e.to_string())?;
    if value < 0 {
        return Err("expected non-negative integer".to_string());
    }
    u64::try_from(value).map_err(|_| "integer value out of range for u64".to_string())
}

fn parse_boolean(raw_value: &str) -> Result<bool, String> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err("expected 'true' or 'false'".to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let cfg = ClientConfig::default();
        assert!(cfg.accept_invalid_certs);
        assert_eq!(cfg.idle_timeout, Duration::from_secs(1));
        assert_eq!(cfg.read_timeout, Duration::from_secs(5));
        assert_eq!(cfg.write_timeout, Duration::from_secs(5));
        assert_eq!(cfg.max_body_size, 10 * 1024 * 1024);
        assert_eq!(cfg.idempotent_attempts, 1);
        assert!(cfg.proxy.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
read_timeout_secs = 10
max_body_size = 65536
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.read_timeout, Duration::from_secs(10));
        assert_eq!(cfg.write_timeout, Duration::from_secs(5));
        assert_eq!(cfg.max_body_size, 65536);
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
http_proxy = "http://127.0.0.1:8080" # burp
accept_invalid_certs = false # strict
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.proxy, Some(ProxyConfig::Http("127.0.0.1:8080".into())));
        assert!(!cfg.accept_invalid_certs);
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("colour = 3").expect_err("unknown key expected");
        assert!(err.to_string().contains("colour"), "{err}");
        assert!(err.to_string().contains("line 1"), "{err}");
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("\nread_timeout_secs 10").expect_err("syntax error expected");
        assert!(matches!(err, ConfigError::Syntax { line: 2 }));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("read_timeout_secs = 4 trailing")
            .expect_err("expected trailing token error");
        assert!(err.to_string().contains("read_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_zero_timeout() {
        let err = parse_config_str("read_timeout_secs = 0").expect_err("zero timeout rejected");
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("http_proxy = bare").expect_err("quotes required");
        assert!(err.to_string().contains("double-quoted"), "{err}");
    }

    #[test]
    fn test_parse_config_rejects_both_proxies() {
        let err = parse_config_str(
            r#"
http_proxy = "127.0.0.1:8080"
socks5_proxy = "127.0.0.1:1080"
"#,
        )
        .expect_err("conflicting proxies");
        assert!(matches!(err, ConfigError::ConflictingProxy));
    }

    #[test]
    fn test_parse_config_rejects_too_many_idempotent_attempts() {
        let err = parse_config_str("idempotent_attempts = 11").expect_err("out of range");
        assert!(err.to_string().contains("idempotent_attempts"));
    }

    #[test]
    fn test_proxy_urls() {
        assert_eq!(
            ProxyConfig::http("http://10.0.0.1:3128").proxy_url(),
            "http://10.0.0.1:3128"
        );
        assert_eq!(
            ProxyConfig::socks5("10.0.0.1:1080").proxy_url(),
            "socks5://10.0.0.1:1080"
        );
    }

    #[test]
    fn test_load_config_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.conf");
        std::fs::write(&path, "max_body_size = 2048\n").unwrap();
        let cfg = load_config_file(&path).unwrap();
        assert_eq!(cfg.max_body_size, 2048);
    }

    #[test]
    fn test_load_config_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_file(&dir.path().join("absent.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
