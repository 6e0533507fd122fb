//! HTTP cache validation module
//!
//! Entity tags for static files, `If-None-Match` evaluation and the
//! `Cache-Control` value for long-lived assets.

use hyper::header::HeaderValue;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Weak entity tag derived from file size and content, e.g. `W/"1a-9f3c..."`
pub fn entity_tag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("W/\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// Whether the client's `If-None-Match` covers `etag` (weak comparison)
pub fn not_modified(if_none_match: Option<&HeaderValue>, etag: &str) -> bool {
    let Some(header) = if_none_match.and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let ours = strip_weak(etag);
    header
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || strip_weak(candidate) == ours)
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// `Cache-Control` value for served assets
pub fn cache_control(max_age: u64, immutable: bool) -> String {
    if immutable {
        format!("public, max-age={max_age}, immutable")
    } else {
        format!("public, max-age={max_age}")
    }
}
