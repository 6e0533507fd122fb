//! Static asset stage
//!
//! First stage of the dispatch pipeline. A stage either answers the request
//! completely or declines so API routing can run.

mod static_dir;

pub use static_dir::StaticDir;

use async_trait::async_trait;
use hyper::http::request::Parts;

use crate::dispatch::Outcome;

#[async_trait]
pub trait AssetStage: Send + Sync {
    async fn serve(&self, req: &Parts) -> Outcome;
}

/// Stage used when asset serving is disabled
pub struct NoAssets;

#[async_trait]
impl AssetStage for NoAssets {
    async fn serve(&self, _req: &Parts) -> Outcome {
        Outcome::Continue
    }
}
