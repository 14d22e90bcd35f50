//! WebSocket feed client with reconnect and periodic re-sync.
//!
//! [`FeedClient::run`] drives the [`FeedState`] machine until the `running`
//! flag is cleared:
//!
//! ```text
//! loop {
//!   Connecting   connect (bounded by response_timeout)
//!                wait for the first Settings frame (same bound)
//!   Subscribed   publish every newer document
//!                every resync_interval: send Resync, expect a snapshot
//!                within response_timeout
//!   Disconnected on any error: wait backoff.next_delay(), then loop
//! }
//! ```
//!
//! Consumers observe the client through two `tokio::sync::watch` channels:
//! the latest document (initially the default document) and the current
//! connection state.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use board_core::{encode_frame, ClientFrame, ProtocolError, Settings};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{interval, interval_at, sleep, sleep_until, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, info, warn};

use crate::application::{FrameOutcome, RevisionTracker};
use crate::domain::{Backoff, FeedConfig, FeedEvent, FeedState};

/// How often blocking waits re-check the `running` flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Why a feed connection ended.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The WebSocket handshake failed.
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: WsError,
    },

    /// The server did not answer in time.
    #[error("no {0} within the response timeout")]
    Timeout(&'static str),

    /// The established connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] WsError),

    /// An outgoing frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server closed the connection.
    #[error("feed closed by server")]
    Closed,
}

/// Keeps a local copy of the settings document in sync with the server.
pub struct FeedClient {
    config: FeedConfig,
    settings_tx: watch::Sender<Settings>,
    state_tx: watch::Sender<FeedState>,
}

impl FeedClient {
    pub fn new(config: FeedConfig) -> Self {
        let (settings_tx, _) = watch::channel(Settings::default());
        let (state_tx, _) = watch::channel(FeedState::Disconnected);
        Self {
            config,
            settings_tx,
            state_tx,
        }
    }

    /// Latest document received from the server.
    pub fn settings(&self) -> watch::Receiver<Settings> {
        self.settings_tx.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> watch::Receiver<FeedState> {
        self.state_tx.subscribe()
    }

    fn transition(&self, event: FeedEvent) {
        self.state_tx.send_if_modified(|state| {
            let next = state.on(event);
            if next == *state {
                return false;
            }
            debug!("feed state {state} -> {next}");
            *state = next;
            true
        });
    }

    /// Runs the reconnect loop until `running` is set to `false`.
    pub async fn run(&self, running: Arc<AtomicBool>) {
        let mut backoff = Backoff::new(self.config.initial_backoff, self.config.max_backoff);
        let mut tracker = RevisionTracker::new();

        while running.load(Ordering::Relaxed) {
            self.transition(FeedEvent::ConnectStarted);
            match self.session(&running, &mut backoff, &mut tracker).await {
                Ok(()) => debug!("feed session for {} ended", self.config.url),
                Err(e) => warn!("feed connection to {} lost: {e}", self.config.url),
            }
            if let Some(revision) = tracker.last_revision() {
                debug!("last revision seen from {}: {revision}", self.config.url);
            }
            self.transition(FeedEvent::Failed);

            if !running.load(Ordering::Relaxed) {
                break;
            }
            let delay = backoff.next_delay();
            info!("reconnecting to {} in {delay:?}", self.config.url);
            sleep_while_running(delay, &running).await;
        }

        info!("feed client for {} stopped", self.config.url);
    }

    /// One connection, from handshake to failure or shutdown.
    async fn session(
        &self,
        running: &AtomicBool,
        backoff: &mut Backoff,
        tracker: &mut RevisionTracker,
    ) -> Result<(), FeedError> {
        let url = self.config.url.as_str();
        let (ws, _) = timeout(self.config.response_timeout, connect_async(url))
            .await
            .map_err(|_| FeedError::Timeout("handshake"))?
            .map_err(|source| FeedError::Connect {
                url: url.to_string(),
                source,
            })?;
        debug!("connected to {url}; waiting for the first snapshot");

        let (mut ws_tx, mut ws_rx) = ws.split();
        // Revisions restart with the server; accept whatever it sends first.
        tracker.reset();
        let mut subscribed = false;

        // Pending reply deadline: the first snapshot, then each re-sync.
        let mut reply_deadline = Some(Instant::now() + self.config.response_timeout);
        let mut resync = interval_at(
            Instant::now() + self.config.resync_interval,
            self.config.resync_interval,
        );
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_poll = interval(SHUTDOWN_POLL);

        loop {
            let deadline = reply_deadline;
            let reply_overdue = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let outcome = tracker.classify(&text);
                        if outcome.is_snapshot() {
                            reply_deadline = None;
                            if !subscribed {
                                subscribed = true;
                                backoff.reset();
                                self.transition(FeedEvent::Subscribed);
                                info!("subscribed to {url}");
                            }
                        }
                        self.apply(outcome);
                    }
                    Some(Ok(Message::Close(_))) | None => return Err(FeedError::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },

                _ = resync.tick() => {
                    debug!("requesting re-sync from {url}");
                    ws_tx.send(Message::Text(encode_frame(&ClientFrame::Resync)?)).await?;
                    if reply_deadline.is_none() {
                        reply_deadline = Some(Instant::now() + self.config.response_timeout);
                    }
                }

                _ = reply_overdue => {
                    return Err(FeedError::Timeout(if subscribed { "re-sync reply" } else { "initial snapshot" }));
                }

                _ = shutdown_poll.tick() => {
                    if !running.load(Ordering::Relaxed) {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Publishes or logs one classified frame.
    fn apply(&self, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Update { revision, settings } => {
                debug!("revision {revision} received");
                self.settings_tx.send_replace(settings);
            }
            FrameOutcome::Stale { revision } => {
                debug!("revision {revision} already shown");
            }
            FrameOutcome::Pong { token } => debug!("pong {token}"),
            FrameOutcome::ServerError(message) => warn!("server reported: {message}"),
            FrameOutcome::Malformed(reason) => warn!("ignoring malformed frame: {reason}"),
        }
    }
}

/// Sleeps for `delay`, returning early once `running` is cleared.
async fn sleep_while_running(delay: Duration, running: &AtomicBool) {
    let until = Instant::now() + delay;
    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= until {
            return;
        }
        sleep((until - now).min(SHUTDOWN_POLL)).await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
