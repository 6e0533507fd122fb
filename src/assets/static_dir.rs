//! Static file serving from a directory
//!
//! Files are answered with long-lived cache headers and an entity tag. Any
//! miss (missing file, directory without index, path outside the root, non
//! GET/HEAD method) declines to the next stage.

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::header::IF_NONE_MATCH;
use hyper::http::request::Parts;
use hyper::Method;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::AssetStage;
use crate::dispatch::Outcome;
use crate::http::{self, cache, mime};
use crate::logger;

/// One year, the usual lifetime for fingerprinted bundles
pub const DEFAULT_MAX_AGE: u64 = 31_536_000;

#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
    index_files: Vec<String>,
    cache_control: String,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_files: vec!["index.html".to_string()],
            cache_control: cache::cache_control(DEFAULT_MAX_AGE, true),
        }
    }

    #[must_use]
    pub fn with_index_files(mut self, index_files: Vec<String>) -> Self {
        self.index_files = index_files;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, max_age: u64, immutable: bool) -> Self {
        self.cache_control = cache::cache_control(max_age, immutable);
        self
    }

    /// Map a request path to a file below the root
    async fn locate(&self, request_path: &str) -> Option<PathBuf> {
        let relative = Path::new(request_path.trim_start_matches('/'));
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }

        let root = match fs::canonicalize(&self.root).await {
            Ok(root) => root,
            Err(e) => {
                logger::log_warning(&format!(
                    "Static directory not accessible '{}': {e}",
                    self.root.display()
                ));
                return None;
            }
        };

        let mut candidate = root.join(relative);
        let is_dir = fs::metadata(&candidate)
            .await
            .is_ok_and(|meta| meta.is_dir());
        if is_dir || request_path.ends_with('/') {
            for index in &self.index_files {
                let index_path = candidate.join(index);
                if fs::metadata(&index_path)
                    .await
                    .is_ok_and(|meta| meta.is_file())
                {
                    candidate = index_path;
                    break;
                }
            }
        }

        // Missing files are the normal miss, not worth a log line
        let resolved = fs::canonicalize(&candidate).await.ok()?;
        if !resolved.starts_with(&root) {
            logger::log_warning(&format!(
                "Path escapes static directory: {request_path} -> {}",
                resolved.display()
            ));
            return None;
        }

        let meta = fs::metadata(&resolved).await.ok()?;
        meta.is_file().then_some(resolved)
    }
}

#[async_trait]
impl AssetStage for StaticDir {
    async fn serve(&self, req: &Parts) -> Outcome {
        let is_head = req.method == Method::HEAD;
        if req.method != Method::GET && !is_head {
            return Outcome::Continue;
        }

        let Some(file) = self.locate(req.uri.path()).await else {
            return Outcome::Continue;
        };

        let data = match fs::read(&file).await {
            Ok(data) => data,
            Err(e) => {
                logger::log_error(&format!("Failed to read file '{}': {e}", file.display()));
                return Outcome::Continue;
            }
        };

        let etag = cache::entity_tag(&data);
        if cache::not_modified(req.headers.get(IF_NONE_MATCH), &etag) {
            return Outcome::Terminal(http::build_304_response(&etag, &self.cache_control));
        }

        Outcome::Terminal(http::build_asset_response(
            Bytes::from(data),
            mime::content_type_for(&file),
            &etag,
            &self.cache_control,
            is_head,
        ))
    }
}
