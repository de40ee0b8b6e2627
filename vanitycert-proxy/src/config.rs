//! Configuration module for environment variable parsing.
//!
//! Configuration is read once at startup and handed to the web layer through
//! [`crate::web::AppState`]. Missing credentials are a hard failure: the
//! server must never start without them.

use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Default VanityCert API base URL.
pub const DEFAULT_API_URL: &str = "https://app.vanitycert.com/api";

/// Default port for the web server.
pub const DEFAULT_PORT: u16 = 5000;

/// Timeout applied to every upstream request.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Default rate limit window when only the request budget is configured.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} is not a valid absolute URL: {value}")]
    InvalidUrl { name: &'static str, value: String },
}

/// Per-caller request budget for the proxy route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Maximum requests allowed inside one window
    pub max_requests: usize,

    /// Length of the sliding window
    pub window: Duration,

    /// Key callers by the first `X-Forwarded-For` hop instead of the peer
    /// address. Only safe behind a reverse proxy that overwrites the header.
    pub trust_forwarded: bool,
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the VanityCert API, without trailing path
    pub api_url: String,

    /// Public key identifier sent as `X-API-KEY-ID`
    pub api_key_id: String,

    /// Secret key sent as `X-API-KEY`. Never logged.
    pub api_key: String,

    /// Shared secret for webhook HMAC verification. `None` disables verification.
    pub webhook_secret: Option<String>,

    /// Port for the web server to listen on
    pub port: u16,

    /// Upstream request timeout
    pub request_timeout: Duration,

    /// Optional rate limit for the proxy route
    pub rate_limit: Option<RateLimitSettings>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("VANITYCERT_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if Url::parse(&api_url).is_err() {
            return Err(ConfigError::InvalidUrl {
                name: "VANITYCERT_API_URL",
                value: api_url,
            });
        }

        let api_key_id = required(&lookup, "VANITYCERT_API_KEY_ID")?;
        let api_key = required(&lookup, "VANITYCERT_API_KEY")?;

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);

        let rate_limit = lookup("RATE_LIMIT_MAX_REQUESTS")
            .and_then(|raw| match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    warn!(env_var = "RATE_LIMIT_MAX_REQUESTS", value = %raw, "Invalid rate limit, disabling");
                    None
                }
            })
            .map(|max_requests| {
                let window_secs = match parse_or(
                    &lookup,
                    "RATE_LIMIT_WINDOW_SECS",
                    DEFAULT_RATE_LIMIT_WINDOW_SECS,
                ) {
                    0 => {
                        warn!(env_var = "RATE_LIMIT_WINDOW_SECS", "Zero rate limit window, using default");
                        DEFAULT_RATE_LIMIT_WINDOW_SECS
                    }
                    secs => secs,
                };

                RateLimitSettings {
                    max_requests,
                    window: Duration::from_secs(window_secs),
                    trust_forwarded: parse_flag(&lookup, "RATE_LIMIT_TRUST_FORWARDED"),
                }
            });

        Ok(Config {
            api_url,
            api_key_id,
            api_key,
            webhook_secret: lookup("VANITYCERT_WEBHOOK_SECRET").filter(|v| !v.trim().is_empty()),
            port,
            request_timeout: UPSTREAM_TIMEOUT,
            rate_limit,
        })
    }
}

// Secrets stay out of logs even when the whole config is printed with `?`.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("api_key_id", &self.api_key_id)
            .field("api_key", &"<redacted>")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

/// Read a variable that must be present and non-empty.
fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Parse a numeric variable, falling back to `default` when absent or invalid.
fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }),
    }
}

/// Parse a boolean flag such as `true`, `1` or `yes`. Absent means `false`.
fn parse_flag<F>(lookup: &F, name: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => false,
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "" | "0" | "false" | "no" | "off" => false,
            _ => {
                warn!(env_var = name, value = %raw, "Invalid flag, using false");
                false
            }
        },
    }
}
