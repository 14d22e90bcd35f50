//! HTTP API: JSON read/write endpoint and the server-sent event stream.
//!
//! # Routes
//!
//! | Method    | Path            | Behaviour                                     |
//! |-----------|-----------------|-----------------------------------------------|
//! | `GET`     | `/api/settings` | Current normalized document                   |
//! | `POST`    | `/api/settings` | Replace the document; echoes the stored value |
//! | `GET`     | `/api/stream`   | SSE: current snapshot, then every commit      |
//! | `OPTIONS` | any             | CORS pre-flight, `204 No Content`             |
//!
//! Every response carries permissive CORS headers so that a display page
//! served from any origin can read the API.
//!
//! # Errors
//!
//! A body that is not a JSON object is answered with
//! `400 {"error":"Invalid JSON"}`.  A document that cannot be persisted is
//! answered with `500 {"error":"..."}`.  In both cases nothing changes.
//!
//! # Stream framing
//!
//! ```text
//! id: 3
//! data: {"goalAmount":5000.0,"raisedAmount":1200.0,...}
//!
//! : (keep-alive comment, every keepalive interval)
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use board_core::Settings;
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::application::{RegistrationHandle, Snapshot, Subscription, SyncService};

/// Shared state of every HTTP handler.
#[derive(Clone)]
struct HttpState {
    service: Arc<SyncService>,
    keepalive: Duration,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Builds the router for the settings API.
///
/// `keepalive` is the interval between SSE comment lines on an otherwise idle
/// stream.
pub fn router(service: Arc<SyncService>, keepalive: Duration) -> Router {
    Router::new()
        .route("/api/settings", get(get_settings).post(post_settings))
        .route("/api/stream", get(stream_settings))
        .layer(middleware::from_fn(cors))
        .with_state(HttpState { service, keepalive })
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn get_settings(State(state): State<HttpState>) -> Json<Settings> {
    let snapshot = state.service.current().await;
    Json(snapshot.settings.as_ref().clone())
}

// Raw bytes, so that a body which is not even UTF-8 still gets the JSON
// error contract instead of axum's plain-text rejection.
async fn post_settings(State(state): State<HttpState>, body: Bytes) -> Response {
    match state.service.replace_json(&body).await {
        Ok(snapshot) => Json(snapshot.settings.as_ref().clone()).into_response(),
        Err(e) if e.is_client_error() => {
            warn!("rejected settings update: {e}");
            error_response(StatusCode::BAD_REQUEST, "Invalid JSON")
        }
        Err(e) => {
            let detail = match std::error::Error::source(&e) {
                Some(source) => format!("{e}: {source}"),
                None => e.to_string(),
            };
            error!("settings update failed: {detail}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &detail)
        }
    }
}

async fn stream_settings(
    State(state): State<HttpState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        handle,
        initial,
        updates,
    } = state.service.subscribe().await;
    info!("SSE subscriber {handle} connected at revision {}", initial.revision);

    // Owned by the stream below: when hyper drops the response body, the
    // guard drops with it and the registration is released.
    let registration = RegistrationGuard {
        service: Arc::clone(&state.service),
        handle,
    };

    // Initial snapshot first, then the queue, so revisions never go backwards.
    let events = stream::once(futures_util::future::ready(initial))
        .chain(ReceiverStream::new(updates))
        .map(move |snapshot| {
            // Captured only to tie the guard's lifetime to the stream.
            let _registration = &registration;
            Ok(snapshot_event(&snapshot))
        });

    Sse::new(events).keep_alive(KeepAlive::new().interval(state.keepalive))
}

fn snapshot_event(snapshot: &Snapshot) -> Event {
    let event = Event::default().id(snapshot.revision.to_string());
    match serde_json::to_string(snapshot.settings.as_ref()) {
        Ok(json) => event.data(json),
        Err(e) => {
            error!("could not encode revision {}: {e}", snapshot.revision);
            event.comment("encoding failed")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Releases an SSE registration when its response stream is dropped, which
/// happens as soon as the client disconnects.
struct RegistrationGuard {
    service: Arc<SyncService>,
    handle: RegistrationHandle,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let service = Arc::clone(&self.service);
        let handle = self.handle;
        debug!("SSE subscriber {handle} disconnected");
        // Drop cannot await; hand the deregistration to the runtime.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move { service.unsubscribe(handle).await });
        }
    }
}

// ── CORS ──────────────────────────────────────────────────────────────────────

async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

// ── Tests ─────────────────────────────────────────────────────────────────────
