use hyper::Uri;
use url::Url;

/// Resolve a request target (`path?query`) against the server origin
///
/// Dot segments and percent-encoding are normalized by the URL parser; empty
/// and trailing path segments are kept as sent.
pub fn resolve_target(origin: &Url, uri: &Uri) -> Result<Url, url::ParseError> {
    let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
    origin.join(target)
}
