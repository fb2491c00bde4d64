//! `multipart/form-data` body construction.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use thiserror::Error;

use crate::constants::CONTENT_TYPE_OCTET_STREAM;

/// One part of a multipart upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    /// Filename reported in `Content-Disposition`, if any.
    pub filename: Option<String>,
    /// Content type of the part, if any.
    pub content_type: Option<String>,
    /// Raw part content.
    pub content: Vec<u8>,
}

impl File {
    /// Creates a file part with a filename and content.
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: None,
            content: content.into(),
        }
    }

    /// Creates a plain form field part without a filename.
    pub fn field(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Sets the content type of the part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Part name to part.
pub type Files = BTreeMap<String, File>;

/// Errors building a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultipartError {
    /// A part header would contain a line break.
    #[error("multipart part {part}: {field} contains a line break")]
    LineBreak {
        /// Name of the offending part.
        part: String,
        /// Which header field was rejected.
        field: &'static str,
    },
}

/// An encoded multipart body and its boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    /// Encoded body bytes.
    pub body: Vec<u8>,
    /// Boundary separating the parts.
    pub boundary: String,
}

impl MultipartBody {
    /// Value for the `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Encodes `files` with a fresh random boundary.
///
/// # Errors
///
/// Returns [`MultipartError::LineBreak`] when a part name, filename or
/// content type contains CR or LF.
pub fn encode(files: &Files) -> Result<MultipartBody, MultipartError> {
    encode_with_boundary(files, random_boundary())
}

fn encode_with_boundary(files: &Files, boundary: String) -> Result<MultipartBody, MultipartError> {
    let mut body = Vec::new();

    for (index, (name, file)) in files.iter().enumerate() {
        check_line_break(name, name, "name")?;
        if index == 0 {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        } else {
            body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
        }

        let mut head = format!("Content-Disposition: form-data; name=\"{}\"", escape_quotes(name));
        if let Some(filename) = &file.filename {
            check_line_break(name, filename, "filename")?;
            let _ = write!(head, "; filename=\"{}\"", escape_quotes(filename));
        }
        head.push_str("\r\n");

        let content_type = match (&file.content_type, &file.filename) {
            (Some(content_type), _) => Some(content_type.as_str()),
            (None, Some(_)) => Some(CONTENT_TYPE_OCTET_STREAM),
            (None, None) => None,
        };
        if let Some(content_type) = content_type {
            check_line_break(name, content_type, "content type")?;
            let _ = write!(head, "Content-Type: {content_type}\r\n");
        }
        head.push_str("\r\n");

        body.extend_from_slice(head.as_bytes());
        body.extend_from_slice(&file.content);
    }

    if files.is_empty() {
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    } else {
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    }

    Ok(MultipartBody { body, boundary })
}

fn check_line_break(part: &str, value: &str, field: &'static str) -> Result<(), MultipartError> {
    if value.contains(['\r', '\n']) {
        return Err(MultipartError::LineBreak {
            part: part.to_string(),
            field,
        });
    }
    Ok(())
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn random_boundary() -> String {
    let bytes: [u8; 30] = rand::random();
    bytes.iter().fold(String::with_capacity(60), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}
