//! Request handler module
//!
//! A handler turns the head of a request into a complete response. Handlers are
//! built once at startup, usually by wrapping a pure compute function with
//! [`define_handler`], and are shared by every request routed to them.

mod define;
mod error;
mod response;

pub use define::{define_handler, ComputeHandler, HandlerContext};
pub use error::HandlerError;
pub use response::{HandlerResponse, ResponseBody};

use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::Response;
use url::Url;

/// A capability producing a response for one request
///
/// `origin` is the fixed base URL the request target is resolved against.
/// Handlers built with [`define_handler`] never return `Err`; the dispatcher
/// still tolerates it from hand-written implementations.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        req: &Parts,
        origin: &Url,
    ) -> Result<Response<Full<Bytes>>, HandlerError>;
}
