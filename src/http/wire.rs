//! Request head parser used by the bundled server
//!
//! Produces a `ParsedRequest` descriptor from raw socket bytes. The `Request`
//! component only ever sees the descriptor.

use super::request::RequestDescriptor;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use thiserror::Error;

const MAX_HEADERS: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("malformed request head: {0}")]
    Malformed(String),

    #[error("unsupported HTTP version 1.{0}")]
    UnsupportedVersion(u8),

    #[error("request path is not valid UTF-8 once decoded: {0}")]
    InvalidPath(String),

    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),
}

/// A fully parsed request head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    headers: HashMap<String, String>,
    method: String,
    path: String,
    url: String,
    query: String,
    /// Minor version of HTTP/1.x
    minor_version: u8,
    /// Bytes taken by the head, blank line included
    pub head_len: usize,
    /// Declared body length, zero when absent
    pub content_length: usize,
}

impl ParsedRequest {
    /// Protocol version as written in the request line, e.g. `1.0`
    pub const fn http_version(&self) -> &'static str {
        match self.minor_version {
            0 => "1.0",
            _ => "1.1",
        }
    }
}

impl RequestDescriptor for ParsedRequest {
    fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    fn http_method(&self) -> &str {
        &self.method
    }

    fn request_path(&self) -> &str {
        &self.path
    }

    fn request_url(&self) -> &str {
        &self.url
    }

    fn query_string(&self) -> &str {
        &self.query
    }
}

/// Parse a request head
///
/// Returns `Ok(None)` while the head is still incomplete.
pub fn parse_request(bytes: &[u8]) -> Result<Option<ParsedRequest>, WireError> {
    let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut request = httparse::Request::new(&mut header_storage);
    let head_len = match request
        .parse(bytes)
        .map_err(|err| WireError::Malformed(err.to_string()))?
    {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => return Ok(None),
    };

    let method = request
        .method
        .ok_or_else(|| WireError::Malformed("missing method".to_string()))?
        .to_string();
    let url = request
        .path
        .ok_or_else(|| WireError::Malformed("missing request target".to_string()))?
        .to_string();
    let minor_version = match request.version {
        Some(v @ (1 | 0)) => v,
        Some(v) => return Err(WireError::UnsupportedVersion(v)),
        None => return Err(WireError::Malformed("missing version".to_string())),
    };

    let mut headers = HashMap::with_capacity(request.headers.len());
    for header in request.headers.iter() {
        let value = String::from_utf8_lossy(header.value).trim().to_string();
        headers.insert(header.name.to_string(), value);
    }

    let content_length = match headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
    {
        Some((_, value)) => value
            .parse::<usize>()
            .map_err(|_| WireError::InvalidContentLength(value.clone()))?,
        None => 0,
    };

    let (raw_path, query) = match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url.as_str(), ""),
    };
    let path = percent_decode_str(raw_path)
        .decode_utf8()
        .map_err(|_| WireError::InvalidPath(raw_path.to_string()))?
        .into_owned();
    let query = query.to_string();

    Ok(Some(ParsedRequest {
        headers,
        method,
        path,
        url,
        query,
        minor_version,
        head_len,
        content_length,
    }))
}
