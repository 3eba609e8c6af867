//! Endpoint resolution for the backend's two transports.
//!
//! One base URL configures both the HTTP ingestion endpoint and the
//! websocket query endpoint. The base may carry either family of scheme;
//! resolution translates it to the transport being dialled while
//! preserving the secure variant, so `https://` becomes `wss://` and
//! `ws://` becomes `http://`.

use url::Url;

use crate::error::IndexError;

/// The transport an endpoint is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Request/response over HTTP.
    Http,
    /// Persistent bidirectional stream over WebSocket.
    WebSocket,
}

/// Resolve `path` against `base` for `transport`.
///
/// Any query string or fragment on the base is dropped, a base path is
/// kept as a prefix, and the join never produces a double slash. Schemes
/// outside the http/https/ws/wss families are rejected.
pub fn resolve(base: &str, path: &str, transport: Transport) -> Result<Url, IndexError> {
    let mut url = Url::parse(base.trim())
        .map_err(|e| IndexError::Config(format!("invalid base URL `{base}`: {e}")))?;

    let scheme = match (url.scheme(), transport) {
        ("http" | "ws", Transport::Http) => "http",
        ("https" | "wss", Transport::Http) => "https",
        ("http" | "ws", Transport::WebSocket) => "ws",
        ("https" | "wss", Transport::WebSocket) => "wss",
        (other, _) => {
            return Err(IndexError::Config(format!(
                "unsupported URL scheme `{other}`"
            )))
        }
    };
    if url.set_scheme(scheme).is_err() {
        return Err(IndexError::Config(format!(
            "cannot apply scheme `{scheme}` to `{base}`"
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(IndexError::Config("base URL must include a host".into()));
    }
    url.set_query(None);
    url.set_fragment(None);

    let rel = path.trim();
    let rel = if rel.is_empty() {
        "/".to_owned()
    } else if rel.starts_with('/') {
        rel.to_owned()
    } else {
        format!("/{rel}")
    };
    let joined = match url.path() {
        "" | "/" => rel,
        base_path => format!("{}{}", base_path.trim_end_matches('/'), rel),
    };
    url.set_path(&joined);

    Ok(url)
}
