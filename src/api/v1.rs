// Version 1 API handlers

use hyper::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::handler::{HandlerContext, HandlerError, HandlerResponse};

#[derive(Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

pub async fn ping(_ctx: HandlerContext) -> Result<HandlerResponse, HandlerError> {
    Ok(HandlerResponse::text(StatusCode::OK, "pong"))
}

pub async fn health(_ctx: HandlerContext) -> Result<HandlerResponse, HandlerError> {
    Ok(HandlerResponse::new(
        StatusCode::OK,
        serde_json::json!({"status": "ok"}),
    ))
}

pub async fn version(_ctx: HandlerContext) -> Result<HandlerResponse, HandlerError> {
    HandlerResponse::json(
        StatusCode::OK,
        &VersionInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

/// Path and query parameters as seen by handlers
pub async fn echo(ctx: HandlerContext) -> Result<HandlerResponse, HandlerError> {
    let query: Map<String, Value> = ctx
        .url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect();

    Ok(HandlerResponse::new(
        StatusCode::OK,
        serde_json::json!({
            "path": ctx.url.path(),
            "query": query,
        }),
    ))
}
