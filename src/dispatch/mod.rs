//! Request dispatch module
//!
//! Entry point for HTTP request processing. Every request runs the same
//! fallthrough: static assets, then the versioned API table, then the 404
//! fallback. The first stage returning [`Outcome::Terminal`] owns the
//! response; later stages never run.

use async_trait::async_trait;
use futures_util::FutureExt;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::{Request, Response, StatusCode};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::assets::AssetStage;
use crate::handler::{Handler, HandlerError};
use crate::http;
use crate::logger::{self, AccessLogEntry, AccessLogFormat};
use crate::routing::{RouteKey, RouteTable};

/// Result of one pipeline stage
#[derive(Debug)]
pub enum Outcome {
    /// The stage produced the response for this request
    Terminal(Response<Full<Bytes>>),
    /// The stage declined; the next one runs
    Continue,
}

/// Default 404 fallback
pub struct NotFound;

#[async_trait]
impl Handler for NotFound {
    async fn handle(
        &self,
        _req: &Parts,
        _origin: &Url,
    ) -> Result<Response<Full<Bytes>>, HandlerError> {
        Ok(http::build_404_response())
    }
}

pub struct Dispatcher {
    assets: Arc<dyn AssetStage>,
    routes: RouteTable,
    fallback: Arc<dyn Handler>,
    origin: Url,
    access_log: Option<AccessLogFormat>,
}

impl Dispatcher {
    /// `origin` is the fixed base request targets are resolved against,
    /// e.g. `http://localhost:3000`.
    pub fn new(assets: Arc<dyn AssetStage>, routes: RouteTable, origin: Url) -> Self {
        Self {
            assets,
            routes,
            fallback: Arc::new(NotFound),
            origin,
            access_log: Some(AccessLogFormat::Text),
        }
    }

    /// Replace the 404 fallback
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Handler + 'static) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    /// `None` disables request and access log lines
    #[must_use]
    pub fn with_access_log(mut self, format: Option<AccessLogFormat>) -> Self {
        self.access_log = format;
        self
    }

    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Produce the single response for `req`
    ///
    /// The request body is never read.
    pub async fn dispatch<B>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        let started = Instant::now();
        let (parts, _) = req.into_parts();

        let response = match self.assets.serve(&parts).await {
            Outcome::Terminal(response) => response,
            Outcome::Continue => self.route(&parts).await,
        };

        if let Some(format) = &self.access_log {
            let entry = self.access_entry(&parts, response.status(), started.elapsed());
            logger::log_access(&entry, format);
        }

        response
    }

    /// API stage followed by the 404 fallback
    async fn route(&self, parts: &Parts) -> Response<Full<Bytes>> {
        match http::resolve_target(&self.origin, &parts.uri) {
            Ok(url) => {
                if self.access_log.is_some() {
                    logger::log_request(parts.method.as_str(), url.as_str());
                }
                if let Outcome::Terminal(response) = self.api_stage(parts, &url).await {
                    return response;
                }
            }
            Err(e) => {
                logger::log_warning(&format!("Unroutable request target '{}': {e}", parts.uri));
            }
        }

        self.not_found(parts).await
    }

    async fn api_stage(&self, parts: &Parts, url: &Url) -> Outcome {
        if !parts.method.as_str().eq_ignore_ascii_case("GET") {
            return Outcome::Continue;
        }
        let Some(key) = RouteKey::parse(url.path()) else {
            return Outcome::Continue;
        };
        let Some(handler) = self.routes.lookup(&key) else {
            return Outcome::Continue;
        };

        match invoke(handler.as_ref(), parts, &self.origin).await {
            Ok(response) => Outcome::Terminal(response),
            Err(err) => {
                logger::log_handler_error(&err);
                Outcome::Continue
            }
        }
    }

    async fn not_found(&self, parts: &Parts) -> Response<Full<Bytes>> {
        match invoke(self.fallback.as_ref(), parts, &self.origin).await {
            Ok(response) => response,
            Err(err) => {
                logger::log_handler_error(&err);
                http::build_404_response()
            }
        }
    }

    /// Access log record; the method is logged uppercased, as routed
    fn access_entry(
        &self,
        parts: &Parts,
        status: StatusCode,
        elapsed: Duration,
    ) -> AccessLogEntry {
        AccessLogEntry::new(
            &parts.method.as_str().to_ascii_uppercase(),
            &self.display_target(parts),
            status.as_u16(),
            elapsed,
        )
    }

    fn display_target(&self, parts: &Parts) -> String {
        http::resolve_target(&self.origin, &parts.uri)
            .map_or_else(|_| parts.uri.to_string(), String::from)
    }
}

/// Run a handler, turning a panic into an error
async fn invoke(
    handler: &dyn Handler,
    parts: &Parts,
    origin: &Url,
) -> Result<Response<Full<Bytes>>, HandlerError> {
    AssertUnwindSafe(handler.handle(parts, origin))
        .catch_unwind()
        .await
        .map_err(|payload| HandlerError::from_panic(payload.as_ref()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::NoAssets;
    use crate::handler::{define_handler, HandlerContext, HandlerResponse};
    use http_body_util::BodyExt;
    use hyper::header::CONTENT_TYPE;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a single fixed path
    struct OneAsset(&'static str);

    #[async_trait]
    impl AssetStage for OneAsset {
        async fn serve(&self, req: &Parts) -> Outcome {
            if req.uri.path() == self.0 {
                Outcome::Terminal(
                    Response::builder()
                        .status(StatusCode::OK)
                        .body(Full::new(Bytes::from_static(b"asset")))
                        .unwrap(),
                )
            } else {
                Outcome::Continue
            }
        }
    }

    struct Failing;

    #[async_trait]
    impl Handler for Failing {
        async fn handle(
            &self,
            _req: &Parts,
            _origin: &Url,
        ) -> Result<Response<Full<Bytes>>, HandlerError> {
            Err(HandlerError::other("raw handler failure"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl Handler for Panicking {
        async fn handle(
            &self,
            req: &Parts,
            _origin: &Url,
        ) -> Result<Response<Full<Bytes>>, HandlerError> {
            assert!(req.uri.path().is_empty(), "raw handler panic");
            Ok(http::build_404_response())
        }
    }

    fn counted(calls: &Arc<AtomicUsize>, body: &'static str) -> impl Handler {
        let calls = Arc::clone(calls);
        define_handler(move |_: HandlerContext| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(HandlerResponse::text(StatusCode::OK, body)) }
        })
    }

    fn dispatcher(assets: Arc<dyn AssetStage>, routes: RouteTable) -> Dispatcher {
        Dispatcher::new(assets, routes, Url::parse("http://localhost:3000").unwrap())
            .with_access_log(None)
    }

    fn ping_table() -> RouteTable {
        RouteTable::builder()
            .route(
                "v1",
                "ping",
                define_handler(|_| async { Ok(HandlerResponse::text(StatusCode::OK, "pong")) }),
            )
            .build()
    }

    fn request(method: &str, target: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(target)
            .body(())
            .unwrap()
    }

    async fn send(d: &Dispatcher, method: &str, target: &str) -> (StatusCode, String) {
        let response = d.dispatch(request(method, target)).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn not_found() -> (StatusCode, String) {
        (StatusCode::NOT_FOUND, http::NOT_FOUND_BODY.to_string())
    }

    #[tokio::test]
    async fn test_registered_route() {
        let d = dispatcher(Arc::new(NoAssets), ping_table());
        assert_eq!(
            send(&d, "GET", "/api/v1/ping").await,
            (StatusCode::OK, "pong".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_version_is_404() {
        let d = dispatcher(Arc::new(NoAssets), ping_table());
        assert_eq!(send(&d, "GET", "/api/v2/ping").await, not_found());
        assert_eq!(send(&d, "GET", "/api/v1/pong").await, not_found());
        assert_eq!(send(&d, "GET", "/api").await, not_found());
    }

    #[tokio::test]
    async fn test_non_get_is_404() {
        let d = dispatcher(Arc::new(NoAssets), ping_table());
        for method in ["POST", "PUT", "DELETE", "HEAD", "PATCH"] {
            assert_eq!(send(&d, method, "/api/v1/ping").await, not_found());
        }
    }

    #[tokio::test]
    async fn test_lowercase_method_is_uppercased() {
        let d = dispatcher(Arc::new(NoAssets), ping_table());
        assert_eq!(send(&d, "get", "/api/v1/ping").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_access_entry_uppercases_method() {
        let d = dispatcher(Arc::new(NoAssets), ping_table());
        let (parts, ()) = request("get", "/api/v1/ping?x=1").into_parts();

        let entry = d.access_entry(&parts, StatusCode::OK, Duration::from_millis(5));
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.url, "http://localhost:3000/api/v1/ping?x=1");
        assert_eq!(entry.status, 200);
    }

    #[tokio::test]
    async fn test_other_namespace_is_404() {
        let d = dispatcher(Arc::new(NoAssets), ping_table());
        assert_eq!(send(&d, "GET", "/v1/ping").await, not_found());
        assert_eq!(send(&d, "GET", "/apis/v1/ping").await, not_found());
        assert_eq!(send(&d, "GET", "/").await, not_found());
    }

    #[tokio::test]
    async fn test_trailing_slash_not_normalized() {
        let d = dispatcher(Arc::new(NoAssets), ping_table());
        assert_eq!(send(&d, "GET", "/api/v1/ping/").await, not_found());
    }

    #[tokio::test]
    async fn test_query_does_not_affect_routing() {
        let d = dispatcher(Arc::new(NoAssets), ping_table());
        assert_eq!(
            send(&d, "GET", "/api/v1/ping?x=1").await,
            (StatusCode::OK, "pong".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_subpath_is_a_key() {
        let table = RouteTable::builder()
            .route(
                "v1",
                "",
                define_handler(|_| async { Ok(HandlerResponse::text(StatusCode::OK, "index")) }),
            )
            .build();
        let d = dispatcher(Arc::new(NoAssets), table);
        assert_eq!(send(&d, "GET", "/api/v1").await.1, "index");
        assert_eq!(send(&d, "GET", "/api/v1/").await.1, "index");
    }

    #[tokio::test]
    async fn test_exact_handler_invoked() {
        let ping_calls = Arc::new(AtomicUsize::new(0));
        let users_calls = Arc::new(AtomicUsize::new(0));
        let table = RouteTable::builder()
            .route("v1", "ping", counted(&ping_calls, "pong"))
            .route("v1", "users/list", counted(&users_calls, "users"))
            .build();
        let d = dispatcher(Arc::new(NoAssets), table);

        assert_eq!(send(&d, "GET", "/api/v1/users/list").await.1, "users");
        assert_eq!(ping_calls.load(Ordering::SeqCst), 0);
        assert_eq!(users_calls.load(Ordering::SeqCst), 1);

        send(&d, "POST", "/api/v1/ping").await;
        assert_eq!(ping_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_static_asset_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let table = RouteTable::builder()
            .route("v1", "ping", counted(&calls, "pong"))
            .build();
        let d = dispatcher(Arc::new(OneAsset("/api/v1/ping")), table);

        assert_eq!(
            send(&d, "GET", "/api/v1/ping").await,
            (StatusCode::OK, "asset".to_string())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_static_miss_falls_through() {
        let d = dispatcher(Arc::new(OneAsset("/logo.svg")), ping_table());
        assert_eq!(send(&d, "GET", "/logo.svg").await.1, "asset");
        assert_eq!(send(&d, "GET", "/api/v1/ping").await.1, "pong");
        assert_eq!(send(&d, "GET", "/missing.png").await, not_found());
    }

    #[tokio::test]
    async fn test_idempotent_responses() {
        let table = RouteTable::builder()
            .route(
                "v1",
                "config",
                define_handler(|_| async {
                    Ok(HandlerResponse::new(StatusCode::OK, json!({"theme": "dark"})))
                }),
            )
            .build();
        let d = dispatcher(Arc::new(NoAssets), table);
        let first = send(&d, "GET", "/api/v1/config").await;
        let second = send(&d, "GET", "/api/v1/config").await;
        assert_eq!(first, second);
        assert_eq!(first.1, r#"{"theme":"dark"}"#);
    }

    #[tokio::test]
    async fn test_compute_failure_is_500_and_server_continues() {
        let table = RouteTable::builder()
            .route(
                "v1",
                "broken",
                define_handler(|_| async { Err(HandlerError::other("boom")) }),
            )
            .route(
                "v1",
                "ping",
                define_handler(|_| async { Ok(HandlerResponse::text(StatusCode::OK, "pong")) }),
            )
            .build();
        let d = dispatcher(Arc::new(NoAssets), table);

        let response = d.dispatch(request("GET", "/api/v1/broken")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], http::INTERNAL_ERROR_BODY.as_bytes());

        assert_eq!(send(&d, "GET", "/api/v1/ping").await.1, "pong");
    }

    #[tokio::test]
    async fn test_raw_handler_error_falls_back_to_404() {
        let table = RouteTable::builder()
            .route("v1", "failing", Failing)
            .route("v1", "panicking", Panicking)
            .build();
        let d = dispatcher(Arc::new(NoAssets), table);
        assert_eq!(send(&d, "GET", "/api/v1/failing").await, not_found());
        assert_eq!(send(&d, "GET", "/api/v1/panicking").await, not_found());
    }

    #[tokio::test]
    async fn test_custom_fallback() {
        let d = dispatcher(Arc::new(NoAssets), ping_table()).with_fallback(define_handler(
            |ctx: HandlerContext| async move {
                Ok(HandlerResponse::new(
                    StatusCode::NOT_FOUND,
                    json!({"missing": ctx.url.path()}),
                ))
            },
        ));
        assert_eq!(
            send(&d, "GET", "/nope").await,
            (StatusCode::NOT_FOUND, r#"{"missing":"/nope"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_failing_fallback_uses_fixed_404() {
        let d = dispatcher(Arc::new(NoAssets), ping_table()).with_fallback(Failing);
        assert_eq!(send(&d, "GET", "/nope").await, not_found());
    }

    #[tokio::test]
    async fn test_unresolvable_target_is_404() {
        let d = dispatcher(Arc::new(NoAssets), ping_table());
        assert_eq!(send(&d, "GET", "//").await, not_found());
    }

    #[tokio::test]
    async fn test_access_log_enabled_does_not_alter_response() {
        let d = dispatcher(Arc::new(NoAssets), ping_table())
            .with_access_log(Some(AccessLogFormat::Json));
        assert_eq!(
            send(&d, "GET", "/api/v1/ping").await,
            (StatusCode::OK, "pong".to_string())
        );
    }
}
