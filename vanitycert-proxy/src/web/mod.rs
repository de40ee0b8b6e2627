//! Web server module.
//!
//! This module provides:
//! - The credential-injecting proxy to the VanityCert API
//! - The signed webhook receiver
//! - A health check
//!
//! Configuration reaches every handler through [`AppState`].

pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod signature;
pub mod webhook;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, AppState, ErrorBody, HealthResponse};
pub use proxy::{vanitycert_proxy, ProxyError};
pub use signature::{sign_payload, verify_signature};
pub use webhook::{vanitycert_webhook, WebhookError, WebhookResponse};

/// Proxy route; everything after the prefix is forwarded upstream.
pub const PROXY_ROUTE: &str = "/api/vanitycert-proxy/*path";

/// Webhook route registered with VanityCert.
pub const WEBHOOK_ROUTE: &str = "/webhooks/vanitycert";

/// Build the application router.
///
/// The rate limit stage is attached to the proxy route only, and only when
/// the state carries a limiter.
pub fn router(state: AppState) -> Router {
    let mut proxy_routes: Router<AppState> = Router::new().route(
        PROXY_ROUTE,
        get(vanitycert_proxy)
            .post(vanitycert_proxy)
            .put(vanitycert_proxy)
            .delete(vanitycert_proxy),
    );

    if let Some(limiter) = state.rate_limiter.clone() {
        proxy_routes =
            proxy_routes.route_layer(from_fn_with_state(limiter, middleware::enforce_rate_limit));
    }

    Router::new()
        .route("/health", get(health))
        .route(WEBHOOK_ROUTE, post(vanitycert_webhook))
        .merge(proxy_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
