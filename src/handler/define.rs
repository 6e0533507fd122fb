//! Handler wrapper
//!
//! Turns a pure compute function into a [`Handler`] that always answers with a
//! well-formed response: the computed one, or the fixed 500 error response.

use async_trait::async_trait;
use futures_util::FutureExt;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Response};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use url::Url;

use super::{Handler, HandlerError, HandlerResponse, ResponseBody};
use crate::http;
use crate::logger;

/// Request information handed to a compute function
///
/// New fields may be added without breaking existing handlers.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct HandlerContext {
    pub method: Method,
    /// Request target resolved against the server origin
    pub url: Url,
    pub headers: HeaderMap,
}

impl HandlerContext {
    pub fn new(method: Method, url: Url, headers: HeaderMap) -> Self {
        Self {
            method,
            url,
            headers,
        }
    }

    /// Value of the first query parameter named `name`
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Handler produced by [`define_handler`]
pub struct ComputeHandler<F> {
    compute: F,
}

/// Wrap `compute` into an error-safe [`Handler`]
pub const fn define_handler<F, Fut>(compute: F) -> ComputeHandler<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerResponse, HandlerError>> + Send,
{
    ComputeHandler { compute }
}

impl<F, Fut> ComputeHandler<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerResponse, HandlerError>> + Send,
{
    async fn respond(
        &self,
        req: &Parts,
        origin: &Url,
    ) -> Result<Response<Full<Bytes>>, HandlerError> {
        let url = http::resolve_target(origin, &req.uri).map_err(|source| {
            HandlerError::MalformedUrl {
                target: req.uri.to_string(),
                source,
            }
        })?;
        let ctx = HandlerContext::new(req.method.clone(), url, req.headers.clone());

        let computed = AssertUnwindSafe(async { (self.compute)(ctx).await })
            .catch_unwind()
            .await
            .map_err(|payload| HandlerError::from_panic(payload.as_ref()))??;

        write_response(computed)
    }
}

#[async_trait]
impl<F, Fut> Handler for ComputeHandler<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerResponse, HandlerError>> + Send,
{
    async fn handle(
        &self,
        req: &Parts,
        origin: &Url,
    ) -> Result<Response<Full<Bytes>>, HandlerError> {
        match self.respond(req, origin).await {
            Ok(response) => Ok(response),
            Err(err) => {
                logger::log_handler_error(&err);
                // Nothing has been handed to the connection yet, so the
                // partial response is simply replaced.
                Ok(http::build_500_response())
            }
        }
    }
}

/// Serialize a computed response: status, then headers in order, then body
fn write_response(computed: HandlerResponse) -> Result<Response<Full<Bytes>>, HandlerError> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = computed.status;

    let headers = response.headers_mut();
    for (name, value) in &computed.headers {
        let invalid = || HandlerError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(header_name, header_value);
    }

    let body = match computed.body {
        ResponseBody::Empty => Bytes::new(),
        ResponseBody::Text(text) => Bytes::from(text),
        ResponseBody::Number(n) => Bytes::from(format_number(n)),
        ResponseBody::Json(value) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Bytes::from(serde_json::to_vec(&value)?)
        }
    };

    *response.body_mut() = Full::new(body);
    Ok(response)
}

/// Decimal text the way a browser prints numbers: `42`, `1.5`, `NaN`, `Infinity`
///
/// Magnitudes from `1e21` up and below `1e-6` switch to exponent form
/// (`1e+21`, `1.5e-7`).
#[allow(clippy::float_cmp)]
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        // covers negative zero
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let text = format!("{n:e}");
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => text,
        }
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::{Request, StatusCode};
    use serde_json::json;

    fn origin() -> Url {
        Url::parse("http://localhost:3000").unwrap()
    }

    fn parts(target: &str) -> Parts {
        Request::builder()
            .uri(target)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn run<F, Fut>(compute: F, target: &str) -> Response<Full<Bytes>>
    where
        F: Fn(HandlerContext) -> Fut + Send + Sync,
        Fut: Future<Output = Result<HandlerResponse, HandlerError>> + Send,
    {
        define_handler(compute)
            .handle(&parts(target), &origin())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_text_body() {
        let response = run(
            |_| async { Ok(HandlerResponse::text(StatusCode::OK, "hi")) },
            "/api/v1/hi",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(body_text(response).await, "hi");
    }

    #[tokio::test]
    async fn test_number_body() {
        let response = run(
            |_| async { Ok(HandlerResponse::number(StatusCode::OK, 42)) },
            "/",
        )
        .await;
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(body_text(response).await, "42");
    }

    #[tokio::test]
    async fn test_json_body_sets_content_type() {
        let response = run(
            |_| async { Ok(HandlerResponse::new(StatusCode::OK, json!({"a": 1}))) },
            "/",
        )
        .await;
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_text(response).await, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_json_content_type_overrides_handler_header() {
        let response = run(
            |_| async {
                Ok(HandlerResponse::new(StatusCode::OK, json!([1, 2]))
                    .with_header("Content-Type", "text/plain"))
            },
            "/",
        )
        .await;
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_text(response).await, "[1,2]");
    }

    #[tokio::test]
    async fn test_empty_body() {
        let response = run(
            |_| async { Ok(HandlerResponse::empty(StatusCode::NO_CONTENT)) },
            "/",
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_duplicate_headers_last_write_wins() {
        let response = run(
            |_| async {
                Ok(HandlerResponse::text(StatusCode::OK, "ok")
                    .with_header("X-Trace", "first")
                    .with_header("x-trace", "second"))
            },
            "/",
        )
        .await;
        let values: Vec<_> = response.headers().get_all("x-trace").iter().collect();
        assert_eq!(values, vec!["second"]);
    }

    #[tokio::test]
    async fn test_context_carries_url_and_query() {
        let response = run(
            |ctx| async move {
                let name = ctx.query("name").unwrap_or_default();
                Ok(HandlerResponse::text(
                    StatusCode::OK,
                    format!("{} {} {name}", ctx.method, ctx.url.path()),
                ))
            },
            "/api/v1/greet?name=ferris",
        )
        .await;
        assert_eq!(body_text(response).await, "GET /api/v1/greet ferris");
    }

    async fn assert_internal_error(response: Response<Full<Bytes>>) {
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            body_text(response).await,
            r#"{"error":"internal server error"}"#
        );
    }

    #[tokio::test]
    async fn test_compute_error_becomes_500() {
        let response = run(
            |_| async { Err(HandlerError::other("backend unavailable")) },
            "/",
        )
        .await;
        assert_internal_error(response).await;
    }

    #[tokio::test]
    async fn test_compute_panic_becomes_500() {
        let response = run(
            |ctx| async move {
                assert!(ctx.url.path().is_empty(), "compute exploded");
                Ok(HandlerResponse::text(StatusCode::OK, "unreachable"))
            },
            "/",
        )
        .await;
        assert_internal_error(response).await;
    }

    #[tokio::test]
    async fn test_invalid_header_becomes_500() {
        let response = run(
            |_| async {
                Ok(HandlerResponse::text(StatusCode::OK, "ok").with_header("bad header", "x"))
            },
            "/",
        )
        .await;
        assert_internal_error(response).await;
    }

    #[tokio::test]
    async fn test_malformed_target_is_reported() {
        let handler = define_handler(|_| async { Ok(HandlerResponse::text(StatusCode::OK, "ok")) });
        let err = handler.respond(&parts("//"), &origin()).await.unwrap_err();
        assert!(
            matches!(&err, HandlerError::MalformedUrl { target, .. } if target == "//"),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_malformed_target_becomes_500() {
        let response = run(
            |_| async { Ok(HandlerResponse::text(StatusCode::OK, "ok")) },
            "//",
        )
        .await;
        assert_internal_error(response).await;
    }

    #[tokio::test]
    async fn test_handler_survives_failure() {
        let handler = define_handler(|ctx: HandlerContext| async move {
            if ctx.query("fail").is_some() {
                return Err(HandlerError::other("requested failure"));
            }
            Ok(HandlerResponse::text(StatusCode::OK, "fine"))
        });

        let failed = handler.handle(&parts("/?fail=1"), &origin()).await.unwrap();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let ok = handler.handle(&parts("/"), &origin()).await.unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(body_text(ok).await, "fine");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_format_number_exponent_range() {
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e30), "-2.5e+30");
        assert_eq!(format_number(0.000_001), "0.000001");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
    }
}
