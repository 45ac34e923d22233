//! HTTP response building module
//!
//! Pure builders: inputs in, finished byte block out. Nothing here touches a sink,
//! so every response can be asserted on byte-for-byte.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Status codes this component ever emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    MovedPermanently,
    NotModified,
    NotFound,
}

impl Status {
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::MovedPermanently => 301,
            Self::NotModified => 304,
            Self::NotFound => 404,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::MovedPermanently => "Moved Permanently",
            Self::NotModified => "Not Modified",
            Self::NotFound => "Not Found",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/1.1 {} {}", self.code(), self.reason())
    }
}

/// Status line plus an ordered header list
///
/// Headers are emitted exactly in insertion order.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: Status,
    headers: Vec<(&'static str, String)>,
}

impl ResponseHead {
    pub const fn new(status: Status) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Serialize the head, terminated by the blank line
    pub fn to_bytes(&self) -> Bytes {
        self.with_body(&[])
    }

    /// Serialize the head followed directly by `body` as one block
    pub fn with_body(&self, body: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(128 + body.len());
        out.put_slice(self.status.to_string().as_bytes());
        for (name, value) in &self.headers {
            out.put_slice(b"\r\n");
            out.put_slice(name.as_bytes());
            out.put_slice(b": ");
            out.put_slice(value.as_bytes());
        }
        out.put_slice(b"\r\n\r\n");
        out.put_slice(body);
        out.freeze()
    }
}

/// Build 200 reply carrying an arbitrary payload
pub fn build_reply_response(body: &[u8], content_type: &str) -> Bytes {
    ResponseHead::new(Status::Ok)
        .header("Access-Control-Allow-Origin", "*")
        .header("Content-Type", content_type)
        .header("Content-Length", body.len().to_string())
        .with_body(body)
}

/// Build CORS preflight response
pub fn build_options_response(allow_headers: &str) -> Bytes {
    ResponseHead::new(Status::Ok)
        .header("Content-Length", "0")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "POST, GET, OPTIONS")
        .header("Access-Control-Allow-Headers", allow_headers)
        .header("Access-Control-Max-Age", "2592000")
        .to_bytes()
}

/// Build 301 redirect response
pub fn build_301_response(location: &str) -> Bytes {
    ResponseHead::new(Status::MovedPermanently)
        .header("Content-Length", "0")
        .header("Location", location)
        .to_bytes()
}

/// Build 304 Not Modified response
pub fn build_304_response() -> Bytes {
    empty_response(Status::NotModified)
}

/// Build 404 Not Found response
pub fn build_404_response() -> Bytes {
    empty_response(Status::NotFound)
}

/// Build the header block that precedes a streamed file body
pub fn build_file_header(
    status: Status,
    content_type: &str,
    content_length: u64,
    last_modified: &str,
) -> Bytes {
    ResponseHead::new(status)
        .header("Content-Type", format!("{content_type}; charset=\"utf-8\""))
        .header("Content-Length", content_length.to_string())
        .header("Last-Modified", last_modified)
        .to_bytes()
}

fn empty_response(status: Status) -> Bytes {
    ResponseHead::new(status)
        .header("Content-Length", "0")
        .to_bytes()
}
