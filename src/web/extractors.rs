//! Request extractors

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use uuid::Uuid;

/// Placeholder when neither proxy headers nor the peer address are available
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// Id minted by the request logging middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Who fetched the resource
#[derive(Debug, Clone)]
pub struct ClientContext {
    /// First `X-Forwarded-For` entry, else `X-Real-IP`, else the peer address
    pub client_ip: String,
    /// Empty when the header is absent
    pub user_agent: String,
    pub request_id: String,
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let client_ip = forwarded_ip(&parts.headers)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| UNKNOWN_CLIENT_IP.to_string());

        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|RequestId(id)| id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Self {
            client_ip,
            user_agent,
            request_id,
        })
    }
}

/// Client address reported by a reverse proxy, if any
///
/// An empty or unreadable `X-Forwarded-For` falls through to `X-Real-IP`.
pub fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    header_ip(headers, "x-forwarded-for").or_else(|| header_ip(headers, "x-real-ip"))
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
