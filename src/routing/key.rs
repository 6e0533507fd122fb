//! Route key decomposition
//!
//! `/api/<version>/<subpath...>` becomes `(version, subpath)`. The subpath is
//! every segment after the version joined with `/`, without normalization, so
//! `/api/v1/ping/` has subpath `ping/` and `/api/v1` has the empty subpath.

/// Top-level path segment that marks an API request
pub const API_NAMESPACE: &str = "api";

/// `(version, subpath)` pair used to look up an API handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteKey<'a> {
    pub version: &'a str,
    pub subpath: &'a str,
}

impl<'a> RouteKey<'a> {
    /// Decompose a URL pathname
    ///
    /// Returns `None` when the first segment is not [`API_NAMESPACE`] or there
    /// is no version segment at all.
    pub fn parse(pathname: &'a str) -> Option<Self> {
        let trimmed = pathname.strip_prefix('/').unwrap_or(pathname);
        let mut segments = trimmed.splitn(3, '/');

        if segments.next()? != API_NAMESPACE {
            return None;
        }
        let version = segments.next()?;
        let subpath = segments.next().unwrap_or("");

        Some(Self { version, subpath })
    }
}
