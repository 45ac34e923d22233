//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with `$variables`

use chrono::Local;
use serde_json::json;

const CLF_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One finished request/response exchange
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client address
    pub remote_addr: String,
    /// Time the request head was read
    pub time: chrono::DateTime<Local>,
    pub method: String,
    /// Request target as received, query string included
    pub url: String,
    /// Version from the request line, e.g. `1.1`
    pub http_version: String,
    pub status: u16,
    /// Response body size in bytes, headers excluded
    pub body_bytes: u64,
    pub host: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Time spent from request head to last sink write
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, url: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            url,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            host: None,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME_FORMAT),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_combined(&self) -> String {
        format!(
            "{} \"{}\" \"{}\"",
            self.format_common(),
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    fn format_json(&self) -> String {
        json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "url": self.url,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "host": self.host,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    /// Custom pattern. Recognised variables:
    /// `$remote_addr`, `$time_local`, `$time_iso8601`, `$request`, `$request_method`,
    /// `$request_uri`, `$server_protocol`, `$status`, `$body_bytes_sent`, `$host`,
    /// `$http_referer`, `$http_user_agent`,
    /// `$request_time` (seconds, 3 decimal places)
    fn format_custom(&self, pattern: &str) -> String {
        #[allow(clippy::cast_precision_loss)]
        let request_time = self.request_time_us as f64 / 1_000_000.0;

        // $request_time and $request_* must be replaced before $request
        pattern
            .replace("$remote_addr", &self.remote_addr)
            .replace("$time_local", &self.time.format(CLF_TIME_FORMAT).to_string())
            .replace("$time_iso8601", &self.time.to_rfc3339())
            .replace("$request_time", &format!("{request_time:.3}"))
            .replace("$request_method", &self.method)
            .replace("$request_uri", &self.url)
            .replace("$request", &self.request_line())
            .replace("$server_protocol", &format!("HTTP/{}", self.http_version))
            .replace("$status", &self.status.to_string())
            .replace("$body_bytes_sent", &self.body_bytes.to_string())
            .replace("$host", self.host.as_deref().unwrap_or("-"))
            .replace("$http_referer", self.referer.as_deref().unwrap_or("-"))
            .replace("$http_user_agent", self.user_agent.as_deref().unwrap_or("-"))
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.url, self.http_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "10.0.0.7:51234".to_string(),
            "GET".to_string(),
            "/blogs/12?ok=true".to_string(),
        );
        entry.status = 301;
        entry.body_bytes = 0;
        entry.host = Some("wonderland.lit".to_string());
        entry.user_agent = Some("Mozilla/5.0".to_string());
        entry.request_time_us = 1_250_000;
        entry
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.starts_with("10.0.0.7:51234 - - ["));
        assert!(log.ends_with("\"GET /blogs/12?ok=true HTTP/1.1\" 301 0"));
        assert!(!log.contains("Mozilla"));
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.contains("\"GET /blogs/12?ok=true HTTP/1.1\" 301 0"));
        assert!(log.ends_with("\"-\" \"Mozilla/5.0\""));
    }

    #[test]
    fn test_format_combined_with_referer_and_http_1_0() {
        let mut entry = create_test_entry();
        entry.http_version = "1.0".to_string();
        entry.referer = Some("http://wonderland.lit/".to_string());
        let log = entry.format("combined");
        assert!(log.contains("\"GET /blogs/12?ok=true HTTP/1.0\" 301 0"));
        assert!(log.ends_with("\"http://wonderland.lit/\" \"Mozilla/5.0\""));

        let custom = entry.format("$server_protocol from $http_referer");
        assert_eq!(custom, "HTTP/1.0 from http://wonderland.lit/");
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["method"], "GET");
        assert_eq!(value["url"], "/blogs/12?ok=true");
        assert_eq!(value["status"], 301);
        assert_eq!(value["host"], "wonderland.lit");
        assert_eq!(value["request_time_us"], 1_250_000);
    }

    #[test]
    fn test_format_json_escapes_quotes() {
        let mut entry = create_test_entry();
        entry.user_agent = Some("evil\" agent".to_string());
        let value: serde_json::Value = serde_json::from_str(&entry.format("json")).unwrap();
        assert_eq!(value["user_agent"], "evil\" agent");
    }

    #[test]
    fn test_format_custom() {
        let log = create_test_entry().format("$request_method $request_uri -> $status in $request_time");
        assert_eq!(log, "GET /blogs/12?ok=true -> 301 in 1.250");
    }

    #[test]
    fn test_format_custom_request_line() {
        let log = create_test_entry().format("[$host] $request");
        assert_eq!(log, "[wonderland.lit] GET /blogs/12?ok=true HTTP/1.1");
    }
}
