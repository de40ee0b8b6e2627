//! VanityCert widget backend proxy.
//!
//! The browser widget never sees the VanityCert API key. Instead it calls this
//! server, which forwards requests upstream with the credentials attached, and
//! receives VanityCert's signed webhook notifications.
//!
//! ## Architecture
//!
//! ```text
//! Widget → /api/vanitycert-proxy/* → VanityCert API
//! VanityCert → /webhooks/vanitycert → signature check → event dispatch
//! ```

pub mod config;
pub mod events;
pub mod ratelimit;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, RateLimitSettings};
pub use events::{
    dispatch_event, EventKind, EventParseError, LoggingHandler, WebhookEvent, WebhookHandler,
};
pub use ratelimit::{RateLimitExceeded, SlidingWindowLimiter};
pub use web::{router, AppState};
