//! Key derivation for rate limiting.

use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, Method};
use std::net::SocketAddr;
use std::sync::Arc;

/// Request data a key function may derive identity from.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub client_addr: String,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn from_request(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            client_addr: remote_addr(request),
            headers: request.headers().clone(),
        }
    }
}

/// Derives the string identity a request is accounted under. Must be
/// deterministic and infallible.
pub type KeyFn = Arc<dyn Fn(&RequestInfo) -> String + Send + Sync>;

/// The built-in key function: `method:path:ip`.
///
/// The ip prefers the first `x-forwarded-for` entry so deployments behind
/// a reverse proxy key on the originating client rather than the proxy.
/// That header is spoofable; deployments that cannot trust their proxy
/// hops should supply a custom key function instead.
pub fn default_key_fn() -> KeyFn {
    Arc::new(|info: &RequestInfo| {
        let ip = forwarded_for(&info.headers).unwrap_or_else(|| info.client_addr.clone());
        format!("{}:{}:{}", info.method, info.path, ip)
    })
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

fn remote_addr(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        addr.ip().to_string()
    } else {
        "unknown".to_string()
    }
}
