//! Opt-in rate limiting stage for the proxy route.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::ratelimit::SlidingWindowLimiter;
use crate::web::handlers::ErrorBody;

/// Reject callers that exceeded their request budget with 429.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<SlidingWindowLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = caller_key(&request, limiter.trust_forwarded());

    if let Err(e) = limiter.check(&key) {
        warn!(caller = %key, path = %request.uri().path(), error = %e, "proxy_rate_limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody::new("rate_limit_exceeded", "Rate limit exceeded")),
        )
            .into_response();
    }

    next.run(request).await
}

/// Identify the caller by peer address.
///
/// The `X-Forwarded-For` header is client-controlled, so its first hop is
/// only used when `trust_forwarded` is set.
pub fn caller_key(request: &Request, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => "anonymous".to_string(),
    }
}
