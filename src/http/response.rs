//! HTTP response building module
//!
//! Builders for the fixed responses external callers depend on, plus the
//! static asset responses.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use hyper::{Response, StatusCode};

pub const NOT_FOUND_BODY: &str = r#"{"error":"not found"}"#;
pub const INTERNAL_ERROR_BODY: &str = r#"{"error":"internal server error"}"#;

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    fixed_json_response(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    fixed_json_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY)
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str, cache_control: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, etag)
        .header(CACHE_CONTROL, cache_control)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::NOT_MODIFIED, &e);
            with_status(StatusCode::NOT_MODIFIED, Bytes::new())
        })
}

/// Build 200 response for a static file
///
/// `HEAD` requests get the same headers with an empty body.
pub fn build_asset_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    cache_control: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(ETAG, etag)
        .header(CACHE_CONTROL, cache_control)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::OK, &e);
            with_status(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new())
        })
}

fn fixed_json_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            with_status(status, Bytes::from_static(body.as_bytes()))
        })
}

fn with_status(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
