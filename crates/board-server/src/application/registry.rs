//! Registry of push subscribers.
//!
//! Every connected push consumer (an SSE stream or a WebSocket viewer) owns
//! one bounded delivery queue.  The registry holds the sending half of each
//! queue; the connection task holds the receiving half.
//!
//! # Isolation
//!
//! Broadcasting never waits on a consumer.  [`SubscriberRegistry::broadcast`]
//! uses `try_send`, so a stalled viewer can neither block the committer nor
//! delay delivery to anyone else:
//!
//! ```text
//! broadcast(snapshot)
//!   ├── queue accepts     → delivered
//!   ├── queue full        → subscriber removed (too slow, it must reconnect)
//!   └── receiver dropped  → subscriber removed (connection already gone)
//! ```
//!
//! Removing a slow subscriber drops its sender, so the connection task sees
//! its queue end after draining what was already buffered and closes.  The
//! viewer reconnects and receives a fresh snapshot; nothing is silently lost.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use board_core::{ServerFrame, Settings};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// A committed settings document together with its commit number.
///
/// The document is shared behind an [`Arc`] so that fanning one commit out to
/// many subscribers does not copy it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Commit counter; 0 for the document loaded at startup.
    pub revision: u64,
    /// The normalized document.
    pub settings: Arc<Settings>,
}

impl Snapshot {
    pub fn new(revision: u64, settings: Settings) -> Self {
        Self {
            revision,
            settings: Arc::new(settings),
        }
    }

    /// Builds the push-feed frame carrying this snapshot.
    pub fn to_frame(&self) -> ServerFrame {
        ServerFrame::Settings {
            revision: self.revision,
            settings: self.settings.as_ref().clone(),
        }
    }
}

// ── Handles ───────────────────────────────────────────────────────────────────

/// Identifies one registration.  Returned by
/// [`SubscriberRegistry::register`] and accepted by
/// [`SubscriberRegistry::deregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle(Uuid);

impl RegistrationHandle {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one [`SubscriberRegistry::broadcast`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers whose queue accepted the snapshot.
    pub delivered: usize,
    /// Subscribers removed during this broadcast (full or closed queue).
    pub dropped: usize,
}

// ── SubscriberRegistry ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Inner {
    subscribers: HashMap<Uuid, mpsc::Sender<Snapshot>>,
    closed: bool,
}

/// The set of currently connected push consumers.
///
/// All methods take `&self`; the registry is shared between the sync service
/// and every connection task.
#[derive(Debug)]
pub struct SubscriberRegistry {
    inner: Mutex<Inner>,
    queue_capacity: usize,
}

impl SubscriberRegistry {
    /// Creates an empty registry whose delivery queues hold `queue_capacity`
    /// snapshots each (at least one).
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Adds a subscriber and returns its handle and delivery queue.
    ///
    /// After [`close`](Self::close) the returned queue is already finished.
    pub async fn register(&self) -> (RegistrationHandle, mpsc::Receiver<Snapshot>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();

        let mut inner = self.inner.lock().await;
        if inner.closed {
            debug!("registry closed; subscriber {id} receives an ended queue");
        } else {
            inner.subscribers.insert(id, tx);
            debug!("subscriber {id} registered ({} total)", inner.subscribers.len());
        }

        (RegistrationHandle(id), rx)
    }

    /// Removes a subscriber.  Returns `false` if it was already gone;
    /// calling this twice is harmless.
    pub async fn deregister(&self, handle: RegistrationHandle) -> bool {
        let mut inner = self.inner.lock().await;
        let removed = inner.subscribers.remove(&handle.0).is_some();
        if removed {
            debug!(
                "subscriber {handle} deregistered ({} remaining)",
                inner.subscribers.len()
            );
        }
        removed
    }

    /// Offers `snapshot` to every subscriber without waiting on any of them.
    ///
    /// Subscribers whose queue is full or whose receiver is gone are removed.
    pub async fn broadcast(&self, snapshot: &Snapshot) -> BroadcastReport {
        let mut inner = self.inner.lock().await;
        let mut report = BroadcastReport::default();

        inner.subscribers.retain(|id, queue| match queue.try_send(snapshot.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "subscriber {id} is not keeping up; dropping it at revision {}",
                    snapshot.revision
                );
                report.dropped += 1;
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("subscriber {id} went away; removing it");
                report.dropped += 1;
                false
            }
        });

        report
    }

    /// Drops every subscriber and refuses new ones.  Each connection task
    /// sees its queue end and shuts down.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        let count = inner.subscribers.len();
        inner.subscribers.clear();
        debug!("registry closed; released {count} subscriber(s)");
    }

    /// Number of registered subscribers.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.subscribers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
