/// Default base URL for chat service requests.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8787/api";
/// Default path of the token-streaming endpoint.
pub const DEFAULT_STREAM_PATH: &str = "/chat/stream";
/// Default path of the single-response endpoint.
pub const DEFAULT_COMPLETE_PATH: &str = "/chat";

/// Join a base URL and an endpoint path into a request URL.
///
/// Normalization rules:
/// 1) a blank base falls back to [`DEFAULT_BASE_URL`]
/// 2) slashes between base and path collapse to exactly one
/// 3) a base that already ends with the path is kept unchanged
pub fn join_endpoint(base: &str, path: &str) -> String {
    let base = if base.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        base.trim()
    };

    let trimmed = base.trim_end_matches('/');
    let path = path.trim().trim_matches('/');
    if path.is_empty() {
        return trimmed.to_string();
    }
    if trimmed.ends_with(&format!("/{path}")) {
        return trimmed.to_string();
    }
    format!("{trimmed}/{path}")
}
