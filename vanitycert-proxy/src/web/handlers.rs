//! Shared state, health check and the fixed error bodies of the web layer.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Json;
use reqwest::Client;
use serde::Serialize;

use crate::events::{LoggingHandler, WebhookHandler};
use crate::ratelimit::SlidingWindowLimiter;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Pooled client for all upstream calls
    pub client: Client,
    pub handler: Arc<dyn WebhookHandler>,
    /// Present only when a proxy rate limit is configured
    pub rate_limiter: Option<Arc<SlidingWindowLimiter>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let rate_limiter = config
            .rate_limit
            .map(|settings| Arc::new(SlidingWindowLimiter::from_settings(settings)));

        Ok(Self {
            config: Arc::new(config),
            client,
            handler: Arc::new(LoggingHandler),
            rate_limiter,
        })
    }

    /// Replace the webhook side-effect handler.
    pub fn with_handler(mut self, handler: Arc<dyn WebhookHandler>) -> Self {
        self.handler = handler;
        self
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Error Bodies
// =============================================================================

/// `{"error": {"code": ..., "message": ...}}` body used by the proxy route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: &'static str,
}

impl ErrorBody {
    pub fn new(code: &'static str, message: &'static str) -> Self {
        Self {
            error: ErrorDetail { code, message },
        }
    }
}
