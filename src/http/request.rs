//! Inbound request snapshot and its reply operations
//!
//! A `Request` copies everything it needs out of the wire parser at construction and
//! never looks at the parser again. Each reply builds complete response blocks and
//! hands them to the sink; no reply buffers, queues or retries anything.

use super::cache::{format_http_date, is_modified_since};
use super::files::{ResolveError, Resolved, StaticFiles, CHUNK_SIZE};
use super::mime::content_type_for;
use super::response::{
    build_301_response, build_304_response, build_404_response, build_file_header,
    build_options_response, build_reply_response, Status,
};
use super::sink::Sink;
use crate::logger;
use bytes::Bytes;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::SystemTime;

/// What a wire parser exposes about one request
pub trait RequestDescriptor {
    fn headers(&self) -> &HashMap<String, String>;
    fn http_method(&self) -> &str;
    /// Decoded path, without query string
    fn request_path(&self) -> &str;
    /// Request target exactly as received
    fn request_url(&self) -> &str;
    /// Query string without the leading `?`, empty if none
    fn query_string(&self) -> &str;
}

/// Summary of an emitted response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    pub status: Status,
    /// Body bytes handed to the sink, headers excluded
    pub body_bytes: u64,
}

impl Sent {
    const fn empty(status: Status) -> Self {
        Self {
            status,
            body_bytes: 0,
        }
    }
}

/// One HTTP request/response exchange
#[derive(Debug)]
pub struct Request<S> {
    stream: S,
    headers: HashMap<String, String>,
    method: String,
    path: String,
    url: String,
    query: String,
    body: Bytes,
}

impl<S: Sink> Request<S> {
    pub fn new<D>(stream: S, parser: &D, body: impl Into<Bytes>) -> Self
    where
        D: RequestDescriptor + ?Sized,
    {
        Self {
            stream,
            headers: parser.headers().clone(),
            method: parser.http_method().to_string(),
            path: parser.request_path().to_string(),
            url: parser.request_url().to_string(),
            query: parser.query_string().to_string(),
            body: body.into(),
        }
    }

    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Header value by ASCII case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_options(&self) -> bool {
        self.method == "OPTIONS"
    }

    /// Give back the sink, e.g. to inspect captured writes
    pub fn into_stream(self) -> S {
        self.stream
    }

    /// Send `body` as a 200 response in a single write
    pub fn reply(&mut self, body: impl AsRef<[u8]>, content_type: &str) -> io::Result<Sent> {
        let body = body.as_ref();
        self.stream
            .stream_write(build_reply_response(body, content_type))?;
        Ok(Sent {
            status: Status::Ok,
            body_bytes: body.len() as u64,
        })
    }

    /// Answer a CORS preflight check
    pub fn reply_to_options(&mut self) -> io::Result<Sent> {
        let allow_headers = self
            .header("Access-Control-Request-Headers")
            .unwrap_or_default();
        let block = build_options_response(allow_headers);
        self.stream.stream_write(block)?;
        Ok(Sent::empty(Status::Ok))
    }

    /// Serve a static file from `root` with the default index document
    pub fn reply_with_file(&mut self, root: impl AsRef<Path>) -> io::Result<Sent> {
        self.reply_with_static(&StaticFiles::new(root.as_ref()))
    }

    /// Serve a static file using the given settings
    ///
    /// Missing files and traversal attempts produce the same 404 so a client
    /// learns nothing about the filesystem outside the root.
    pub fn reply_with_static(&mut self, files: &StaticFiles) -> io::Result<Sent> {
        match files.resolve(&self.path) {
            Ok(Resolved::Redirect) => {
                let block = build_301_response(&self.redirect_location());
                self.stream.stream_write(block)?;
                Ok(Sent::empty(Status::MovedPermanently))
            }
            Ok(Resolved::File(path)) => self.send_file(&path, Status::Ok),
            Err(err) => {
                match &err {
                    ResolveError::OutsideRoot { .. } => {
                        logger::log_traversal_blocked(&self.path, &err);
                    }
                    ResolveError::RootUnavailable { .. } => logger::log_warning(&err.to_string()),
                    // Misses are routine
                    ResolveError::NotFound(_) | ResolveError::NotAFile(_) => {}
                }
                match files.not_found_page() {
                    Some(page) => self.send_file(&page, Status::NotFound),
                    None => self.send_not_found(),
                }
            }
        }
    }

    fn send_not_found(&mut self) -> io::Result<Sent> {
        self.stream.stream_write(build_404_response())?;
        Ok(Sent::empty(Status::NotFound))
    }

    /// Header block first, then the body in chunks read from one open handle
    fn send_file(&mut self, path: &Path, status: Status) -> io::Result<Sent> {
        let (mut file, len, modified) = match open_file(path) {
            Ok(opened) => opened,
            Err(e) => {
                logger::log_warning(&format!("Failed to open '{}': {e}", path.display()));
                return self.send_not_found();
            }
        };

        if status == Status::Ok && !is_modified_since(modified, self.header("If-Modified-Since"))
        {
            self.stream.stream_write(build_304_response())?;
            return Ok(Sent::empty(Status::NotModified));
        }

        let content_type = content_type_for(path);
        let head = build_file_header(status, content_type, len, &format_http_date(modified));
        self.stream.stream_write(head)?;

        let body_bytes = self.stream_body(&mut file, path)?;
        Ok(Sent { status, body_bytes })
    }

    fn stream_body(&mut self, file: &mut File, path: &Path) -> io::Result<u64> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut sent = 0u64;
        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => return Ok(sent),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Header is already out; the short body ends the exchange
                    logger::log_error(&format!("Failed to read '{}': {e}", path.display()));
                    return Ok(sent);
                }
            };
            self.stream
                .stream_write(Bytes::copy_from_slice(&buf[..n]))?;
            sent += n as u64;
        }
    }

    fn redirect_location(&self) -> String {
        let scheme = self
            .header("X-Forwarded-Proto")
            .and_then(|proto| proto.split(',').next())
            .map(str::trim)
            .and_then(|proto| {
                ["http", "https"]
                    .into_iter()
                    .find(|known| proto.eq_ignore_ascii_case(known))
            })
            .unwrap_or("http");
        let host = self.header("Host").unwrap_or_default();

        let mut location = format!("{scheme}://{host}{}/", self.path);
        if !self.query.is_empty() {
            location.push('?');
            location.push_str(&self.query);
        }
        location
    }
}

fn open_file(path: &Path) -> io::Result<(File, u64, SystemTime)> {
    let file = File::open(path)?;
    let meta = file.metadata()?;
    let modified = meta.modified()?;
    Ok((file, meta.len(), modified))
}
