//! Credential-injecting proxy to the VanityCert API.
//!
//! The widget calls `/api/vanitycert-proxy/<path>` on this server; the request
//! is re-issued to `<api_url>/<path>` with the private API key attached, and the
//! upstream status and JSON body are relayed back untouched.

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderMap, HeaderValue, Method, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::de::IgnoredAny;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::web::handlers::{AppState, ErrorBody};

/// Route prefix stripped from inbound paths before forwarding.
pub const PROXY_PREFIX: &str = "/api/vanitycert-proxy/";

/// Header carrying the public key identifier.
pub const API_KEY_ID_HEADER: &str = "X-API-KEY-ID";

/// Header carrying the secret key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Errors the proxy handler can produce.
///
/// Each variant maps to one fixed 500 body; the detail is only logged.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned a non-JSON body: {0}")]
    UpstreamBody(serde_json::Error),

    #[error("failed to read request body: {0}")]
    ReadBody(#[from] BytesRejection),

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match &self {
            ProxyError::Upstream(_) | ProxyError::UpstreamBody(_) => {
                error!(error = %self, "vanitycert_proxy_error");
                ErrorBody::new("proxy_error", "Failed to connect to VanityCert API")
            }
            ProxyError::ReadBody(_) | ProxyError::InvalidJson(_) => {
                error!(error = %self, "vanitycert_proxy_unexpected_error");
                ErrorBody::new("internal_error", "Internal server error")
            }
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Proxy endpoint for GET, POST, PUT and DELETE.
pub async fn vanitycert_proxy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ProxyError> {
    let body = body?;
    let url = upstream_url(&state.config.api_url, &uri);

    // A literal `null` carries no payload and is forwarded like an empty body.
    let json_body: Option<Value> = if is_json(&headers) && !body.is_empty() {
        match serde_json::from_slice(&body).map_err(ProxyError::InvalidJson)? {
            Value::Null => None,
            value => Some(value),
        }
    } else {
        None
    };

    let mut request = state
        .client
        .request(method.clone(), &url)
        .header(API_KEY_ID_HEADER, &state.config.api_key_id)
        .header(API_KEY_HEADER, &state.config.api_key)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json");

    if let Some(json) = &json_body {
        request = request.json(json);
    }

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    info!(
        method = %method,
        path = %uri.path(),
        status = status.as_u16(),
        has_body = json_body.is_some(),
        response_length = bytes.len(),
        "vanitycert_proxy_forwarded"
    );

    if bytes.is_empty() {
        return Ok(status.into_response());
    }

    // Relay the exact upstream bytes once they are known to be JSON.
    serde_json::from_slice::<IgnoredAny>(&bytes).map_err(ProxyError::UpstreamBody)?;

    Ok((
        status,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        Body::from(bytes),
    )
        .into_response())
}

/// Build the upstream URL from the configured base and the inbound URI.
///
/// The sub-path is taken verbatim, still percent-encoded.
pub fn upstream_url(base: &str, uri: &Uri) -> String {
    let path = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or_default();

    match uri.query() {
        Some(query) if !query.is_empty() => format!("{}/{}?{}", base, path, query),
        _ => format!("{}/{}", base, path),
    }
}

/// Whether the request declares a JSON content type.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json"
                || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_upstream_url_appends_path() {
        let uri: Uri = "/api/vanitycert-proxy/domains/42".parse().unwrap();
        assert_eq!(
            upstream_url("https://app.vanitycert.com/api", &uri),
            "https://app.vanitycert.com/api/domains/42"
        );
    }

    #[test]
    fn test_upstream_url_keeps_query_and_encoding() {
        let uri: Uri = "/api/vanitycert-proxy/domains/a%2Fb?page=2&per_page=10"
            .parse()
            .unwrap();
        assert_eq!(
            upstream_url("http://upstream", &uri),
            "http://upstream/domains/a%2Fb?page=2&per_page=10"
        );
    }

    #[test]
    fn test_is_json() {
        assert!(is_json(&headers_with("application/json")));
        assert!(is_json(&headers_with("application/json; charset=utf-8")));
        assert!(is_json(&headers_with("application/vnd.api+json")));
        assert!(!is_json(&headers_with("text/plain")));
        assert!(!is_json(&headers_with("application/x-www-form-urlencoded")));
        assert!(!is_json(&HeaderMap::new()));
    }

    #[test]
    fn test_error_status_codes() {
        let err = ProxyError::InvalidJson(serde_json::from_str::<Value>("{").unwrap_err());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ProxyError::UpstreamBody(serde_json::from_str::<Value>("<html>").unwrap_err());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
