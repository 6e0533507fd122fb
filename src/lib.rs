//! Minimal HTTP request dispatcher
//!
//! Requests are offered to a static asset stage first; when no file matches,
//! `GET /api/<version>/<subpath...>` is routed through an immutable table of
//! handlers, and everything else receives a fixed 404 JSON response.

pub mod api;
pub mod assets;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use dispatch::{Dispatcher, Outcome};
pub use handler::{define_handler, Handler, HandlerContext, HandlerError, HandlerResponse, ResponseBody};
pub use routing::{RouteKey, RouteTable};
