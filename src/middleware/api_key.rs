//! API-key gate for the MCP endpoints.
//!
//! Intercepts a request before it reaches the transport handlers and
//! substitutes an authentication-failure response when the configured key
//! is missing or wrong. The health endpoint is routed outside this layer
//! and stays reachable without a key.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::config::ApiKeyHeader;
use crate::AppState;

#[derive(Debug, PartialEq, Eq)]
pub enum ApiKeyError {
    /// The gate is enabled but no key was configured server-side.
    NotConfigured,
    /// No key was presented in the expected header.
    Missing { header: &'static str },
    /// A key was presented but does not match.
    Invalid,
}

impl IntoResponse for ApiKeyError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiKeyError::NotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Server configuration error: API key not configured",
                }),
            ),
            ApiKeyError::Missing { header } => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "API key required",
                    "message": format!("Please provide an API key in the {header} header"),
                }),
            ),
            ApiKeyError::Invalid => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "Invalid API key",
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// axum middleware enforcing the key on everything behind it.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_api_key {
        return next.run(request).await;
    }

    let Some(expected) = state.config.api_key.as_deref() else {
        tracing::error!("API_KEY environment variable is not set");
        return ApiKeyError::NotConfigured.into_response();
    };

    let header = state.config.api_key_header;
    let Some(provided) = extract_api_key(request.headers(), header) else {
        return ApiKeyError::Missing {
            header: header.name(),
        }
        .into_response();
    };

    if provided != expected {
        return ApiKeyError::Invalid.into_response();
    }

    next.run(request).await
}

/// Read the presented key. In `Authorization` mode a `Bearer ` prefix is
/// accepted but not required.
fn extract_api_key(headers: &HeaderMap, header: ApiKeyHeader) -> Option<String> {
    let raw = headers.get(header.name())?.to_str().ok()?;
    let key = match header {
        ApiKeyHeader::Authorization => raw.strip_prefix("Bearer ").unwrap_or(raw),
        ApiKeyHeader::XApiKey => raw,
    };
    (!key.is_empty()).then(|| key.to_string())
}
