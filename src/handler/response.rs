//! Handler response values
//!
//! A compute function describes its answer as a [`HandlerResponse`]; the
//! wrapper turns it into bytes on the wire.

use hyper::StatusCode;
use serde::Serialize;

use super::HandlerError;

/// Response body chosen by the handler author
///
/// Each variant has exactly one serialization:
/// - `Empty` writes nothing
/// - `Text` is written verbatim
/// - `Number` is written as decimal text
/// - `Json` is written as compact JSON with `Content-Type: application/json`
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Text(String),
    Number(f64),
    Json(serde_json::Value),
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for ResponseBody {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for ResponseBody {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<serde_json::Value> for ResponseBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Status, headers and body returned by a compute function
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    /// Applied in order; a later duplicate name overwrites an earlier one
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl HandlerResponse {
    pub fn new(status: StatusCode, body: impl Into<ResponseBody>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub const fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: ResponseBody::Empty,
        }
    }

    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self::new(status, ResponseBody::Text(text.into()))
    }

    pub fn number(status: StatusCode, n: impl Into<f64>) -> Self {
        Self::new(status, ResponseBody::Number(n.into()))
    }

    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self, HandlerError> {
        Ok(Self::new(
            status,
            ResponseBody::Json(serde_json::to_value(value)?),
        ))
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
