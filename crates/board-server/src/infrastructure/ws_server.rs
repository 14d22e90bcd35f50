//! WebSocket push feed: accept loop and per-viewer session tasks.
//!
//! This module is responsible for:
//!
//! 1. Accepting TCP connections on the push-feed listener.
//! 2. Upgrading each connection to a WebSocket session.
//! 3. Registering the session with the [`SyncService`] and sending the
//!    snapshot current at registration time.
//! 4. Forwarding every later commit as a [`ServerFrame::Settings`] frame.
//! 5. Answering [`ClientFrame::Resync`] and [`ClientFrame::Ping`] frames.
//! 6. Probing idle viewers with WebSocket pings so that dead connections are
//!    detected and their registration released.
//! 7. Stopping when the `running` flag is cleared.
//!
//! # Session loop
//!
//! ```text
//! select! {
//!   commit from the registry queue  → Settings frame   (bounded by send_timeout)
//!   text frame from the viewer      → Settings / Pong / Error frame
//!   keepalive tick                  → WebSocket Ping
//! }
//! ```
//!
//! A viewer whose queue is dropped by the registry (too slow) sees its
//! session closed; it reconnects and starts again from a fresh snapshot.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use board_core::{decode_frame, encode_frame, ClientFrame, ServerFrame};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::application::{Subscription, SyncService};
use crate::domain::ServerConfig;

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the push-feed listener on `config.ws_bind_addr`.
///
/// # Errors
///
/// Returns an error if the address is in use or cannot be bound.
pub async fn bind_ws_listener(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind WebSocket listener on {}",
                config.ws_bind_addr
            )
        })?;
    info!("WebSocket push feed listening on {}", config.ws_bind_addr);
    Ok(listener)
}

/// Runs the accept loop until `running` is set to `false`.
///
/// Each accepted connection is handed to its own task so that one slow
/// viewer never delays another.
pub async fn run_ws_server(
    listener: TcpListener,
    service: Arc<SyncService>,
    config: Arc<ServerConfig>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping WebSocket accept loop");
            break;
        }

        // Short timeout so the flag is re-checked while nobody connects.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new viewer connection from {peer_addr}");
                // Each session task gets its own handle on the shared service.
                let service = Arc::clone(&service);
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    handle_viewer_session(stream, peer_addr, service, config).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_viewer_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    service: Arc<SyncService>,
    config: Arc<ServerConfig>,
) {
    match run_session(raw_stream, peer_addr, service, config).await {
        Ok(()) => info!("viewer {peer_addr} closed normally"),
        Err(e) => warn!("viewer {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the lifecycle of one viewer session.  The registration is released
/// however the session ends.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    service: Arc<SyncService>,
    config: Arc<ServerConfig>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    // Register only after the handshake, so failed upgrades never occupy a
    // registry slot.
    let subscription = service.subscribe().await;
    let handle = subscription.handle;
    info!(
        "viewer {peer_addr} subscribed as {handle} at revision {}",
        subscription.initial.revision
    );

    let result = pump(ws_stream, peer_addr, subscription, &service, &config).await;
    // Runs on every exit path of `pump`, errors included.
    service.unsubscribe(handle).await;
    result
}

async fn pump(
    ws_stream: tokio_tungstenite::WebSocketStream<TcpStream>,
    peer_addr: SocketAddr,
    subscription: Subscription,
    service: &SyncService,
    config: &ServerConfig,
) -> anyhow::Result<()> {
    // Split so that reads and writes can be awaited in the same select!.
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let Subscription {
        initial,
        mut updates,
        ..
    } = subscription;

    // The initial snapshot goes out before any queued update, so the viewer
    // always sees revisions in increasing order.
    send_frame(&mut ws_tx, &initial.to_frame(), config.send_timeout)
        .await
        .with_context(|| format!("viewer {peer_addr}: initial snapshot"))?;

    let mut keepalive = interval(config.keepalive_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    keepalive.tick().await;

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(snapshot) => {
                    debug!("viewer {peer_addr}: pushing revision {}", snapshot.revision);
                    send_frame(&mut ws_tx, &snapshot.to_frame(), config.send_timeout)
                        .await
                        .with_context(|| format!("viewer {peer_addr}: revision {}", snapshot.revision))?;
                }
                // The registry dropped this viewer (too slow) or is shutting down.
                None => {
                    debug!("viewer {peer_addr}: delivery queue closed");
                    let _ = ws_tx.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
            },

            incoming = ws_rx.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    let reply = reply_to(&text, service, peer_addr).await;
                    send_frame(&mut ws_tx, &reply, config.send_timeout).await?;
                }
                Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                Some(Ok(WsMessage::Binary(_))) => {
                    warn!("viewer {peer_addr}: ignoring binary frame");
                }
                // Ping/Pong are handled by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(WsError::ConnectionClosed)) => return Ok(()),
                Some(Err(e)) => return Err(e).context(format!("viewer {peer_addr}: receive")),
            },

            // A ping that cannot be sent within send_timeout ends the session.
            _ = keepalive.tick() => {
                send_message(&mut ws_tx, WsMessage::Ping(Vec::new()), config.send_timeout)
                    .await
                    .with_context(|| format!("viewer {peer_addr}: keepalive"))?;
            }
        }
    }
}

/// Builds the answer to one text frame from a viewer.
async fn reply_to(text: &str, service: &SyncService, peer_addr: SocketAddr) -> ServerFrame {
    match decode_frame::<ClientFrame>(text) {
        Ok(ClientFrame::Resync) => {
            let snapshot = service.current().await;
            debug!("viewer {peer_addr}: resync at revision {}", snapshot.revision);
            snapshot.to_frame()
        }
        Ok(ClientFrame::Ping { token }) => ServerFrame::Pong { token },
        Err(e) => {
            warn!("viewer {peer_addr}: {e}");
            ServerFrame::Error {
                message: e.to_string(),
            }
        }
    }
}

async fn send_frame<S>(sink: &mut S, frame: &ServerFrame, limit: Duration) -> anyhow::Result<()>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let text = encode_frame(frame)?;
    send_message(sink, WsMessage::Text(text), limit).await
}

async fn send_message<S>(sink: &mut S, message: WsMessage, limit: Duration) -> anyhow::Result<()>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    timeout(limit, sink.send(message))
        .await
        .context("send timed out")?
        .context("send failed")?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
