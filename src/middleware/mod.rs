//! Request middleware

pub mod auth;
pub mod rate_limit;

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Resolve the client address for rate limiting and feature
/// extraction: first X-Forwarded-For entry, then the transport peer
/// address, then the literal "unknown".
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
