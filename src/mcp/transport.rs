//! HTTP boundary: maps requests to dispatcher calls and picks delivery paths.
//!
//! Every dispatched envelope goes back as the synchronous HTTP response;
//! when the poster named an open session, the same envelope is also pushed
//! down that session's stream. The stream is an additional delivery path,
//! never a replacement.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::middleware as axum_middleware;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::mcp::protocol::{self, DecodeError, METHOD_NOT_FOUND};
use crate::mcp::service::Dispatch;
use crate::mcp::session::StreamSession;
use crate::middleware::api_key::require_api_key;
use crate::AppState;

/// Build the full application router.
///
/// `/` (health/identity) sits outside the API-key gate; the MCP endpoints
/// sit behind it. CORS is permissive on everything, and preflight OPTIONS
/// requests are answered by the CORS layer before they reach any handler.
pub fn app(state: AppState) -> Router {
    let gated = Router::new()
        .route("/sse", get(sse_handler).post(fallback_message_handler))
        .route("/sse/message", axum::routing::post(message_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/", get(health_handler))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
}

/// GET `/` - static server metadata, no API key required.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": state.config.server_name,
        "version": state.config.server_version,
        "status": "running",
        "endpoints": { "sse": "/sse" },
    }))
}

/// GET `/sse` - open a stream session.
///
/// The response is an indefinitely long event stream whose first frame is
/// the `endpoint` handshake. Keep-alive pings are emitted by the session's
/// own timer, so no transport-level keep-alive is layered on top.
pub async fn sse_handler(
    State(state): State<AppState>,
) -> (
    [(HeaderName, &'static str); 1],
    Sse<impl Stream<Item = Result<Event, Infallible>>>,
) {
    let (session, rx) = state.sessions.create().await;
    tracing::info!(session_id = %session.id(), "SSE stream opened");

    let stream = ReceiverStream::new(rx).map(super::session::Frame::into_event);
    ([(header::CACHE_CONTROL, "no-cache")], Sse::new(stream))
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// POST `/sse/message?sessionId=...` - submit one protocol message.
///
/// An unknown or absent session id is tolerated: the message is still
/// dispatched, just not pushed to any stream.
pub async fn message_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let session = match &query.session_id {
        Some(id) => state.sessions.lookup(id).await,
        None => None,
    };
    tracing::debug!(
        session_id = ?query.session_id,
        resolved = session.is_some(),
        "message received"
    );
    handle_message(&state, session, &body).await
}

/// POST `/sse` - stateless fallback for clients that skip the handshake.
/// Same dispatch contract, result delivered synchronously only.
pub async fn fallback_message_handler(State(state): State<AppState>, body: Bytes) -> Response {
    tracing::debug!("message received on stream-open path, no session association");
    handle_message(&state, None, &body).await
}

/// Decode, dispatch, and deliver over both paths.
async fn handle_message(
    state: &AppState,
    session: Option<std::sync::Arc<StreamSession>>,
    body: &[u8],
) -> Response {
    let inbound = match protocol::decode(body) {
        Ok(inbound) => inbound,
        Err(DecodeError::Parse(error)) => {
            tracing::warn!(%error, "rejected unparseable message body");
            return (StatusCode::BAD_REQUEST, Json(protocol::parse_error_envelope()))
                .into_response();
        }
        Err(DecodeError::MissingMethod { id }) => {
            let id = id.unwrap_or(serde_json::Value::Null);
            let envelope = protocol::error_envelope(&id, METHOD_NOT_FOUND, "Method not found");
            return respond(state, session, envelope).await;
        }
    };

    match state.service.dispatch(inbound).await {
        Dispatch::Reply(envelope) => respond(state, session, envelope).await,
        Dispatch::NoContent => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Push the envelope to the open stream (if any), then return it as the
/// synchronous body. Stream write failures are resolved inside `deliver`
/// and never affect the HTTP response.
async fn respond(
    state: &AppState,
    session: Option<std::sync::Arc<StreamSession>>,
    envelope: serde_json::Value,
) -> Response {
    if let Some(session) = session {
        state.sessions.deliver(session.id(), &envelope).await;
    }
    (StatusCode::OK, Json(envelope)).into_response()
}
