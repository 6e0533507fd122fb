//! HTTP protocol layer module
//!
//! Fixed responses, content types, entity tags and request target resolution
//! shared by the dispatcher, the handler wrapper and the static asset stage.

pub mod cache;
pub mod mime;
pub mod response;
mod target;

pub use response::{
    build_304_response, build_404_response, build_500_response, build_asset_response,
    INTERNAL_ERROR_BODY, NOT_FOUND_BODY,
};
pub use target::resolve_target;
