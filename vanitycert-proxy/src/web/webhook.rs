//! VanityCert webhook endpoint.
//!
//! This endpoint:
//! 1. Verifies the HMAC signature over the raw body (if a secret is configured)
//! 2. Parses the event envelope
//! 3. Dispatches it to the configured [`WebhookHandler`](crate::events::WebhookHandler)
//! 4. Returns 200 OK

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::events::{dispatch_event, EventParseError, WebhookEvent};
use crate::web::handlers::AppState;
use crate::web::signature::{verify_signature, SIGNATURE_HEADER};

/// Webhook acknowledgement.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// `{"error": "..."}` body for rejected webhooks.
#[derive(Serialize)]
pub struct WebhookErrorBody {
    pub error: &'static str,
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("failed to read webhook body: {0}")]
    ReadBody(#[from] BytesRejection),

    #[error("failed to parse webhook event: {0}")]
    Parse(#[from] EventParseError),

    #[error("webhook handler failed: {0:#}")]
    Handler(#[from] anyhow::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebhookError::InvalidSignature => (StatusCode::UNAUTHORIZED, "Invalid signature"),
            _ => {
                error!(error = %self, "webhook_processing_failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Webhook processing failed")
            }
        };

        (status, Json(WebhookErrorBody { error: message })).into_response()
    }
}

/// VanityCert webhook endpoint.
pub async fn vanitycert_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let payload = body?;

    // Blank secrets are filtered out when the config is loaded.
    match state.config.webhook_secret.as_deref() {
        Some(secret) => {
            let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

            if !verify_signature(secret, &payload, signature) {
                warn!(
                    has_signature = signature.is_some(),
                    body_length = payload.len(),
                    "webhook_signature_invalid"
                );
                return Err(WebhookError::InvalidSignature);
            }
        }
        None => warn!("webhook_signature_not_configured"),
    }

    let event = WebhookEvent::from_slice(&payload)?;

    info!(
        event = ?event.event,
        domain_url = ?event.domain_url,
        "webhook_received"
    );

    let kind = dispatch_event(state.handler.as_ref(), &event)?;

    info!(kind = ?kind, "webhook_processed");

    Ok(Json(WebhookResponse { status: "ok" }))
}
