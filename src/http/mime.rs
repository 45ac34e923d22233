//! MIME type detection module
//!
//! Maps a file extension to a bare media type. The charset parameter is added by
//! the response builder, so the table holds types only.

use std::path::Path;

/// Media type used when the extension is missing or unknown
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Get media type based on file extension
///
/// # Examples
/// ```
/// use http_bridge::http::mime::content_type_for;
/// use std::path::Path;
/// assert_eq!(content_type_for(Path::new("app.js")), "application/javascript");
/// assert_eq!(content_type_for(Path::new("README")), "text/html");
/// ```
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("txt") => "text/plain",
        Some("xml") => "application/xml",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/vnd.microsoft.icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
