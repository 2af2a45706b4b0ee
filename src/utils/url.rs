//! URL utilities for consistent endpoint construction
//!
//! Backend paths are written relative (`/user/{id}/chat-type`) and resolved
//! against a configured base URL. The analysis endpoint is configured as an
//! absolute URL and must pass through untouched.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use chatlens::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:3000/api/"), "http://localhost:3000/api");
/// assert_eq!(normalize_base_url("http://localhost:3000///"), "http://localhost:3000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// True when `path` already names a full `http://` or `https://` URL.
pub fn is_absolute_url(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve an endpoint path against a base URL
///
/// Absolute URLs are returned as-is; relative paths are joined with exactly
/// one slash between base and path.
///
/// # Examples
///
/// ```
/// use chatlens::utils::url::resolve_endpoint;
///
/// assert_eq!(
///     resolve_endpoint("http://localhost:3000/", "/channel"),
///     "http://localhost:3000/channel"
/// );
/// assert_eq!(
///     resolve_endpoint("http://localhost:3000", "https://analysis.example.com/run"),
///     "https://analysis.example.com/run"
/// );
/// ```
pub fn resolve_endpoint(base_url: &str, path: &str) -> String {
    if is_absolute_url(path) {
        return path.trim().to_string();
    }
    let base = normalize_base_url(base_url);
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() {
        return base;
    }
    format!("{base}/{path}")
}

/// Percent-encode a single path segment such as a user id.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
