//! HTTP cache validation module
//!
//! Provides `Last-Modified` formatting and `If-Modified-Since` evaluation.

use chrono::{DateTime, Utc};
use std::time::SystemTime;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an IMF-fixdate, e.g. `Wed, 21 Oct 2015 07:28:00 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Check whether a file changed after the client's `If-Modified-Since` date
///
/// Comparison is done at whole-second resolution, which is all the header can carry.
/// A missing or unparsable header counts as modified.
pub fn is_modified_since(modified: SystemTime, if_modified_since: Option<&str>) -> bool {
    let Some(since) = if_modified_since else {
        return true;
    };
    let Ok(since) = DateTime::parse_from_rfc2822(since.trim()) else {
        return true;
    };
    DateTime::<Utc>::from(modified).timestamp() > since.timestamp()
}
