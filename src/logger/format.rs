//! Access log format module
//!
//! Supports:
//! - `text`: `RESPONSE GET 0.01s 200 http://localhost:3000/api/v1/ping`
//! - `json`: one JSON object per line
//! - any other string: a pattern with `$` variables

use chrono::{DateTime, Local};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessLogFormat {
    Text,
    Json,
    Pattern(String),
}

impl From<&str> for AccessLogFormat {
    fn from(format: &str) -> Self {
        match format {
            "text" => Self::Text,
            "json" => Self::Json,
            pattern => Self::Pattern(pattern.to_string()),
        }
    }
}

/// One line per completed request
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub time: DateTime<Local>,
    pub method: String,
    /// Target resolved against the server origin
    pub url: String,
    pub status: u16,
    pub elapsed: Duration,
}

impl AccessLogEntry {
    /// Create an entry stamped with the current time
    pub fn new(method: &str, url: &str, status: u16, elapsed: Duration) -> Self {
        Self {
            time: Local::now(),
            method: method.to_string(),
            url: url.to_string(),
            status,
            elapsed,
        }
    }

    /// Elapsed seconds with two decimals
    fn request_time(&self) -> String {
        format!("{:.2}", self.elapsed.as_secs_f64())
    }

    pub fn format(&self, format: &AccessLogFormat) -> String {
        match format {
            AccessLogFormat::Text => format!(
                "RESPONSE {} {}s {} {}",
                self.method,
                self.request_time(),
                self.status,
                self.url
            ),
            AccessLogFormat::Json => serde_json::json!({
                "time": self.time.to_rfc3339(),
                "method": self.method,
                "url": self.url,
                "status": self.status,
                "elapsed_s": self.request_time(),
            })
            .to_string(),
            AccessLogFormat::Pattern(pattern) => self.format_pattern(pattern),
        }
    }

    /// Supported variables: `$time_iso8601`, `$method`, `$url`, `$status`,
    /// `$request_time` (seconds, two decimals)
    fn format_pattern(&self, pattern: &str) -> String {
        pattern
            .replace("$time_iso8601", &self.time.to_rfc3339())
            .replace("$request_time", &self.request_time())
            .replace("$method", &self.method)
            .replace("$url", &self.url)
            .replace("$status", &self.status.to_string())
    }
}
