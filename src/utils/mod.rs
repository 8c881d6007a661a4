use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use url::Url;

// https://developer.android.com/guide/topics/manifest/manifest-element#package
static PACKAGE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)+$").expect("package name regex is valid")
});

/// Get current Unix timestamp in milliseconds
pub fn get_timestamp() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Check a raw identifier against the reverse-DNS package pattern.
/// The whole string must match; surrounding whitespace is not trimmed.
pub fn is_valid_package_name(raw: &str) -> bool {
    PACKAGE_NAME_RE.is_match(raw)
}

/// Build the Engine.IO websocket endpoint for a server base URL.
pub fn socket_url(server_url: &str, socket_path: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(server_url)?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    // Non-special schemes cannot switch to ws; connect_async rejects them later.
    let _ = url.set_scheme(scheme);
    url.set_path(socket_path);
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket")
        .append_pair("t", &get_timestamp().to_string());
    Ok(url)
}
