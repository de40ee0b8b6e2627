//! VanityCert webhook events and their dispatch.
//!
//! ## Processing Flow
//!
//! ```text
//! raw body → WebhookEvent → dispatch_event() → WebhookHandler hook
//! ```
//!
//! Dispatch is synchronous. A 200 from the receiver only means the event was
//! parsed and routed, not that any downstream side effect completed.

use anyhow::Result;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, info, warn};

/// Event tag sent when a certificate has been issued.
pub const CERTIFICATE_ISSUED: &str = "certificate.issued";

/// Event tag sent when domain validation failed.
pub const CERTIFICATE_VALIDATION_FAILED: &str = "certificate.validation_failed";

/// Event tag sent when an automatic renewal failed.
pub const CERTIFICATE_RENEWAL_FAILED: &str = "certificate.renewal_failed";

/// Errors raised while reading a webhook body.
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
}

/// Webhook envelope posted by VanityCert.
///
/// The body must be a JSON object. The known fields are looked up loosely:
/// a missing or non-string value reads as `None`.
#[derive(Debug, Clone, Default)]
pub struct WebhookEvent {
    /// Event type tag, e.g. `certificate.issued`
    pub event: Option<String>,

    /// Domain the event refers to
    pub domain_url: Option<String>,

    /// Failure reason for `*_failed` events
    pub reason: Option<String>,

    /// The full envelope, including event-specific fields
    pub data: Map<String, Value>,
}

/// Recognised event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CertificateIssued,
    ValidationFailed,
    RenewalFailed,
    Unhandled,
}

impl WebhookEvent {
    /// Parse a raw webhook body.
    pub fn from_slice(payload: &[u8]) -> Result<Self, EventParseError> {
        let data = match serde_json::from_slice::<Value>(payload)? {
            Value::Object(map) => map,
            other => return Err(EventParseError::NotAnObject(json_type(&other))),
        };

        let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            event: text("event"),
            domain_url: text("domain_url"),
            reason: text("reason"),
            data,
        })
    }

    pub fn kind(&self) -> EventKind {
        match self.event.as_deref() {
            Some(CERTIFICATE_ISSUED) => EventKind::CertificateIssued,
            Some(CERTIFICATE_VALIDATION_FAILED) => EventKind::ValidationFailed,
            Some(CERTIFICATE_RENEWAL_FAILED) => EventKind::RenewalFailed,
            _ => EventKind::Unhandled,
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Side effects triggered by webhook events.
///
/// All hooks default to doing nothing. Implement the ones you need to update
/// a database, email the domain owner or page the operations team.
pub trait WebhookHandler: Send + Sync {
    /// Mark the domain's certificate as active and notify its owner.
    fn certificate_issued(&self, _event: &WebhookEvent) -> Result<()> {
        Ok(())
    }

    /// Tell the domain owner their DNS configuration needs attention.
    fn validation_failed(&self, _event: &WebhookEvent) -> Result<()> {
        Ok(())
    }

    /// Alert operations that a renewal did not go through.
    fn renewal_failed(&self, _event: &WebhookEvent) -> Result<()> {
        Ok(())
    }
}

/// Handler that only logs; used when no side effects are wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl WebhookHandler for LoggingHandler {}

/// Route an event to the matching handler hook.
pub fn dispatch_event(handler: &dyn WebhookHandler, event: &WebhookEvent) -> Result<EventKind> {
    let domain_url = event.domain_url.as_deref().unwrap_or_default();
    let reason = event.reason.as_deref().unwrap_or_default();

    let kind = event.kind();
    match kind {
        EventKind::CertificateIssued => {
            info!(domain_url = %domain_url, "certificate_issued");
            handler.certificate_issued(event)?;
        }
        EventKind::ValidationFailed => {
            warn!(domain_url = %domain_url, reason = %reason, "certificate_validation_failed");
            handler.validation_failed(event)?;
        }
        EventKind::RenewalFailed => {
            error!(domain_url = %domain_url, reason = %reason, "certificate_renewal_failed");
            handler.renewal_failed(event)?;
        }
        EventKind::Unhandled => {
            info!(event = ?event.event, "webhook_event_unhandled");
        }
    }

    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
    }

    impl WebhookHandler for Recorder {
        fn certificate_issued(&self, _event: &WebhookEvent) -> Result<()> {
            self.calls.lock().unwrap().push("issued");
            Ok(())
        }

        fn validation_failed(&self, event: &WebhookEvent) -> Result<()> {
            assert_eq!(event.reason.as_deref(), Some("CNAME missing"));
            self.calls.lock().unwrap().push("validation_failed");
            Ok(())
        }

        fn renewal_failed(&self, _event: &WebhookEvent) -> Result<()> {
            anyhow::bail!("alerting unavailable")
        }
    }

    fn parse(json: &str) -> WebhookEvent {
        WebhookEvent::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let event = parse(
            r#"{"event":"certificate.issued","domain_url":"x.com","certificate_id":42}"#,
        );
        assert_eq!(event.event.as_deref(), Some("certificate.issued"));
        assert_eq!(event.domain_url.as_deref(), Some("x.com"));
        assert!(event.reason.is_none());
        assert_eq!(event.data["certificate_id"], 42);
    }

    #[test]
    fn test_parse_non_string_fields_read_as_none() {
        let event = parse(r#"{"event":5,"domain_url":123,"reason":{"code":"dns"}}"#);
        assert!(event.event.is_none());
        assert!(event.domain_url.is_none());
        assert!(event.reason.is_none());
        assert_eq!(event.kind(), EventKind::Unhandled);
        assert_eq!(event.data["reason"]["code"], "dns");
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        for body in [r#"[]"#, r#"["certificate.issued","x.com"]"#, "null", "\"x\"", "7"] {
            assert!(
                matches!(
                    WebhookEvent::from_slice(body.as_bytes()),
                    Err(EventParseError::NotAnObject(_))
                ),
                "{body}"
            );
        }
        assert!(matches!(
            WebhookEvent::from_slice(b"{not json"),
            Err(EventParseError::Json(_))
        ));
    }

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(parse(r#"{"event":"certificate.issued"}"#).kind(), EventKind::CertificateIssued);
        assert_eq!(
            parse(r#"{"event":"certificate.validation_failed"}"#).kind(),
            EventKind::ValidationFailed
        );
        assert_eq!(
            parse(r#"{"event":"certificate.renewal_failed"}"#).kind(),
            EventKind::RenewalFailed
        );
        assert_eq!(parse(r#"{"event":"unknown.tag"}"#).kind(), EventKind::Unhandled);
        assert_eq!(parse("{}").kind(), EventKind::Unhandled);
    }

    #[test]
    fn test_dispatch_routes_to_hook() {
        let recorder = Recorder::default();

        let kind = dispatch_event(
            &recorder,
            &parse(r#"{"event":"certificate.issued","domain_url":"x.com"}"#),
        )
        .unwrap();
        assert_eq!(kind, EventKind::CertificateIssued);

        dispatch_event(
            &recorder,
            &parse(r#"{"event":"certificate.validation_failed","domain_url":"x.com","reason":"CNAME missing"}"#),
        )
        .unwrap();

        dispatch_event(&recorder, &parse(r#"{"event":"unknown.tag"}"#)).unwrap();

        assert_eq!(*recorder.calls.lock().unwrap(), vec!["issued", "validation_failed"]);
    }

    #[test]
    fn test_dispatch_propagates_hook_error() {
        let result = dispatch_event(
            &Recorder::default(),
            &parse(r#"{"event":"certificate.renewal_failed","reason":"rate limited"}"#),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_handler_accepts_everything() {
        for tag in [
            CERTIFICATE_ISSUED,
            CERTIFICATE_VALIDATION_FAILED,
            CERTIFICATE_RENEWAL_FAILED,
            "domain.deleted",
        ] {
            let event = WebhookEvent {
                event: Some(tag.to_string()),
                ..Default::default()
            };
            assert!(dispatch_event(&LoggingHandler, &event).is_ok());
        }
    }
}
