//! Stream sessions and the process-wide session store.
//!
//! A [`StreamSession`] owns one open SSE connection: it enqueues the
//! handshake frame, keeps the connection alive with periodic pings, and
//! tears itself down on the first write failure. The per-session mpsc
//! channel is the single-writer ordered sink, so frames are delivered in
//! the order they were generated without any cross-session coupling.
//!
//! The [`SessionStore`] maps session ids to live sessions. It is injected
//! through `AppState` rather than living in module state, and an entry is
//! removed synchronously on any write failure so stale entries never
//! outlive one failed write attempt.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::sse::Event;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Path message POSTs are addressed to, advertised by the handshake frame.
pub const MESSAGE_PATH: &str = "/sse/message";

/// Per-session channel capacity. Pings and responses are small and drained
/// by the HTTP writer, so a shallow buffer suffices.
const CHANNEL_CAPACITY: usize = 32;

/// One framed text event on a session's sink.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Handshake: tells the client where to POST further messages.
    Endpoint { address: String },
    /// Keep-alive comment frame; defeats idle timeouts in intermediaries.
    Ping,
    /// A serialized response envelope.
    Message(String),
}

impl Frame {
    pub fn into_event(self) -> Result<Event, Infallible> {
        Ok(match self {
            Frame::Endpoint { address } => Event::default().event("endpoint").data(address),
            Frame::Ping => Event::default().comment("ping"),
            Frame::Message(body) => Event::default().data(body),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Closing,
    Closed,
}

/// One open SSE connection: id, outbound sink and keep-alive lifecycle.
pub struct StreamSession {
    id: String,
    tx: mpsc::Sender<Frame>,
    state: Mutex<SessionState>,
    keep_alive: CancellationToken,
}

impl StreamSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Write one frame to the sink.
    ///
    /// A closed session swallows the frame: the response was already
    /// delivered synchronously to the poster, so nothing is lost. A write
    /// failure means the consumer is gone and reports `Err` so the caller
    /// can remove the store entry.
    pub async fn send(&self, frame: Frame) -> Result<(), SendFailed> {
        if *self.state.lock().unwrap_or_else(|e| e.into_inner()) != SessionState::Open {
            return Ok(());
        }
        self.tx.send(frame).await.map_err(|_| SendFailed)
    }

    /// Transition `OPEN -> CLOSING -> CLOSED`, cancelling the keep-alive
    /// timer exactly once. Every failure path funnels through here; a
    /// second call is a no-op.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != SessionState::Open {
            return false;
        }
        *state = SessionState::Closing;
        self.keep_alive.cancel();
        *state = SessionState::Closed;
        true
    }

    pub fn is_closed(&self) -> bool {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) == SessionState::Closed
    }
}

/// Marker error: the session's consumer went away mid-write.
#[derive(Debug)]
pub struct SendFailed;

/// Process-wide table of live stream sessions.
///
/// Cheap to clone; all clones share one map. Each single-key operation is
/// atomic under the inner lock; no multi-key transactions are offered.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Arc<StreamSession>>>>,
    keep_alive_interval: Duration,
}

impl SessionStore {
    pub fn new(keep_alive_interval: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            keep_alive_interval,
        }
    }

    /// Open a new session.
    ///
    /// Generates a fresh collision-free id, registers the session, enqueues
    /// the handshake frame and starts the keep-alive task. The returned
    /// receiver is the transport's half of the sink.
    pub async fn create(&self) -> (Arc<StreamSession>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let session = {
            let mut sessions = self.inner.write().await;

            // 128-bit random ids make collisions negligible, but a fresh id
            // is drawn anyway if one ever occurs.
            let mut id = new_session_id();
            while sessions.contains_key(&id) {
                id = new_session_id();
            }

            let session = Arc::new(StreamSession {
                id: id.clone(),
                tx,
                state: Mutex::new(SessionState::Open),
                keep_alive: CancellationToken::new(),
            });
            sessions.insert(id, Arc::clone(&session));
            session
        };

        // The channel was just created with a free buffer, so the handshake
        // cannot fail and is guaranteed to be the first frame delivered.
        let address = format!("{}?sessionId={}", MESSAGE_PATH, session.id);
        let _ = session.send(Frame::Endpoint { address }).await;

        self.spawn_keep_alive(Arc::clone(&session));

        tracing::debug!(session_id = %session.id, "created SSE session");
        (session, rx)
    }

    /// Pure read; absence means "no stream available, respond
    /// synchronously only" and is not an error.
    pub async fn lookup(&self, id: &str) -> Option<Arc<StreamSession>> {
        self.inner.read().await.get(id).map(Arc::clone)
    }

    /// Idempotent teardown: removes the entry and closes the session.
    /// Removing an absent id is a no-op.
    pub async fn remove(&self, id: &str) {
        let removed = self.inner.write().await.remove(id);
        if let Some(session) = removed {
            session.close();
            tracing::info!(session_id = %id, "removed SSE session");
        }
    }

    /// Push an envelope down a session's sink, if one is open under `id`.
    ///
    /// A write failure tears the session down on the spot; it is never
    /// surfaced to the caller because the synchronous response path must
    /// still succeed.
    pub async fn deliver(&self, id: &str, envelope: &serde_json::Value) {
        let Some(session) = self.lookup(id).await else {
            return;
        };
        if session.send(Frame::Message(envelope.to_string())).await.is_err() {
            tracing::warn!(session_id = %id, "SSE write failed, tearing down session");
            self.remove(id).await;
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Periodic ping loop. A failed ping is the only garbage-collection
    /// path absent an explicit disconnect, so the loop removes the store
    /// entry itself before exiting.
    fn spawn_keep_alive(&self, session: Arc<StreamSession>) {
        let store = self.clone();
        let cancelled = session.keep_alive.clone();
        let period = self.keep_alive_interval;

        tokio::spawn(async move {
            // First ping fires one full interval after open.
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if session.send(Frame::Ping).await.is_err() {
                            tracing::debug!(session_id = %session.id, "keep-alive write failed");
                            store.remove(&session.id).await;
                            break;
                        }
                    }
                }
            }
        });
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}
