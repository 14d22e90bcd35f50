//! The settings synchronization service.
//!
//! [`SyncService`] owns the authoritative in-memory copy of the settings
//! document and the registry of push subscribers.  Every transport (the JSON
//! API, the SSE stream, the WebSocket feed) goes through it.
//!
//! # Commit protocol
//!
//! ```text
//! replace(candidate)
//!   1. reject non-objects                        (nothing changes)
//!   2. normalize                                 (pure)
//!   3. take the commit lock                      (one writer at a time)
//!   4. persist through the DocumentStore         (failure → nothing changes)
//!   5. take the snapshot write lock
//!        swap in the new snapshot, revision + 1
//!        broadcast to every subscriber           (try_send, never waits)
//!   6. release both locks, return the snapshot
//! ```
//!
//! Steps 3 to 6 run on a spawned task.  Dropping the caller of
//! [`SyncService::replace`] (an HTTP client hanging up mid-request) therefore
//! never leaves a document persisted but not current or not broadcast.
//!
//! Because the broadcast happens while the snapshot write lock is held, and
//! [`SyncService::subscribe`] registers while holding the read lock, a
//! subscriber either receives the pre-commit snapshot as its initial value
//! *and* the commit as an update, or receives the post-commit snapshot as its
//! initial value.  It can never miss a commit that raced its registration.

use std::sync::Arc;

use board_core::{normalize, Settings};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::application::document_store::{DocumentStore, StoreError};
use crate::application::registry::{RegistrationHandle, Snapshot, SubscriberRegistry};

/// Errors returned by [`SyncService::replace`].
///
/// Every variant belongs to the same "invalid or unpersistable" class: the
/// write was refused and neither the in-memory document nor the persisted
/// one changed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request body is not JSON at all.
    #[error("invalid settings document: {0}")]
    Malformed(String),

    /// The body is JSON, but not a JSON object.
    #[error("invalid settings document: expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The document was valid but could not be persisted.
    #[error("settings document could not be persisted")]
    Unpersistable(#[source] StoreError),

    /// The commit task panicked or the runtime is shutting down.
    #[error("settings commit did not complete")]
    Interrupted(#[source] JoinError),
}

impl SyncError {
    /// `true` when the caller sent something unusable, `false` when the
    /// server failed to store a valid document.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::NotAnObject(_))
    }
}

/// A new registration: the snapshot current at registration time plus the
/// queue every later commit is delivered through.
#[derive(Debug)]
pub struct Subscription {
    pub handle: RegistrationHandle,
    pub initial: Snapshot,
    pub updates: mpsc::Receiver<Snapshot>,
}

/// Owns the live settings document.
pub struct SyncService {
    shared: Arc<Shared>,
}

/// State a commit task needs after its caller may be gone.
struct Shared {
    store: Arc<dyn DocumentStore>,
    registry: SubscriberRegistry,
    current: RwLock<Snapshot>,
    commit: Mutex<()>,
}

impl SyncService {
    /// Loads the persisted document (seeding it on first run) and makes it
    /// current at revision 0.
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] from [`DocumentStore::load`].  The server must not
    /// start on a document it could not read.
    pub async fn start(
        store: Arc<dyn DocumentStore>,
        registry: SubscriberRegistry,
    ) -> Result<Self, StoreError> {
        let document = store.load().await?;
        let settings = normalize(&document);
        info!(
            "settings loaded: goal {} {}, {} slide(s)",
            settings.goal_amount,
            settings.currency,
            settings.slides.len()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                store,
                registry,
                current: RwLock::new(Snapshot::new(0, settings)),
                commit: Mutex::new(()),
            }),
        })
    }

    /// Returns the latest committed snapshot.  Never blocks on storage.
    pub async fn current(&self) -> Snapshot {
        self.shared.current.read().await.clone()
    }

    /// Registers a push consumer.
    ///
    /// The returned [`Subscription::initial`] is the snapshot current at the
    /// moment of registration; [`Subscription::updates`] yields every commit
    /// after it, in commit order.
    pub async fn subscribe(&self) -> Subscription {
        let current = self.shared.current.read().await;
        let (handle, updates) = self.shared.registry.register().await;
        Subscription {
            handle,
            initial: current.clone(),
            updates,
        }
    }

    /// Releases a registration.  Safe to call more than once.
    pub async fn unsubscribe(&self, handle: RegistrationHandle) {
        self.shared.registry.deregister(handle).await;
    }

    /// Number of live push registrations.
    pub async fn subscriber_count(&self) -> usize {
        self.shared.registry.len().await
    }

    /// Parses a raw request body and commits it.  See [`replace`](Self::replace).
    ///
    /// # Errors
    ///
    /// [`SyncError::Malformed`] if `body` is not JSON (including bodies that
    /// are not UTF-8); otherwise as [`replace`](Self::replace).
    pub async fn replace_json(&self, body: &[u8]) -> Result<Snapshot, SyncError> {
        let candidate: Value =
            serde_json::from_slice(body).map_err(|e| SyncError::Malformed(e.to_string()))?;
        self.replace(candidate).await
    }

    /// Normalizes `candidate`, persists it, makes it current, and pushes it
    /// to every subscriber.  Returns the committed snapshot.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotAnObject`] for a non-object candidate and
    /// [`SyncError::Unpersistable`] when the store refuses the write.  In
    /// both cases nothing changes and nothing is broadcast.
    pub async fn replace(&self, candidate: Value) -> Result<Snapshot, SyncError> {
        if !candidate.is_object() {
            return Err(SyncError::NotAnObject(json_kind(&candidate)));
        }
        let settings = normalize(&candidate);

        // The task owns its own handle on the shared state, so it runs to
        // completion even if this future is dropped while awaiting it.
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.commit(settings).await })
            .await
            .map_err(SyncError::Interrupted)?
    }

    /// Ends every push registration and refuses new ones.  Used during
    /// shutdown so that long-lived streams finish.
    pub async fn close_subscriptions(&self) {
        debug!("closing all push subscriptions");
        self.shared.registry.close().await;
    }

    /// The document currently held in memory.
    pub async fn settings(&self) -> Arc<Settings> {
        self.shared.current.read().await.settings.clone()
    }
}

impl Shared {
    /// Persist, swap, broadcast.  Serialized by the commit lock.
    async fn commit(&self, settings: Settings) -> Result<Snapshot, SyncError> {
        let _commit = self.commit.lock().await;

        if let Err(e) = self.store.write(&settings).await {
            warn!("refusing settings update: {e}");
            return Err(SyncError::Unpersistable(e));
        }

        let mut current = self.current.write().await;
        let snapshot = Snapshot::new(current.revision + 1, settings);
        *current = snapshot.clone();

        let report = self.registry.broadcast(&snapshot).await;
        drop(current);

        info!(
            "settings committed at revision {} ({} delivered, {} dropped)",
            snapshot.revision, report.delivered, report.dropped
        );
        Ok(snapshot)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::document_store::MockDocumentStore;
    use serde_json::json;
    use std::path::PathBuf;

    fn store_with_document(document: Value) -> MockDocumentStore {
        let mut store = MockDocumentStore::new();
        store.expect_load().returning(move || Ok(document.clone()));
        store
    }

    fn io_failure() -> StoreError {
        StoreError::StorageUnavailable {
            path: PathBuf::from("settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        }
    }

    async fn service(store: MockDocumentStore) -> SyncService {
        SyncService::start(Arc::new(store), SubscriberRegistry::new(8))
            .await
            .expect("start")
    }

    #[tokio::test]
    async fn test_start_normalizes_loaded_document() {
        // Arrange
        let store = store_with_document(json!({ "goalAmount": 5000 }));

        // Act
        let service = service(store).await;

        // Assert
        let snapshot = service.current().await;
        assert_eq!(snapshot.revision, 0);
        assert_eq!(snapshot.settings.goal_amount, 5000.0);
        assert_eq!(snapshot.settings.slides, Settings::default().slides);
    }

    #[tokio::test]
    async fn test_start_fails_when_store_cannot_load() {
        let mut store = MockDocumentStore::new();
        store.expect_load().returning(|| Err(io_failure()));

        let result = SyncService::start(Arc::new(store), SubscriberRegistry::new(8)).await;

        assert!(matches!(result, Err(StoreError::StorageUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_replace_persists_then_broadcasts() {
        // Arrange
        let mut store = store_with_document(json!({}));
        store
            .expect_write()
            .withf(|s: &Settings| s.raised_amount == 1200.0)
            .times(1)
            .returning(|_| Ok(()));
        let service = service(store).await;
        let mut sub = service.subscribe().await;

        // Act
        let snapshot = service
            .replace(json!({ "raisedAmount": 1200 }))
            .await
            .expect("replace");

        // Assert
        assert_eq!(snapshot.revision, 1);
        assert_eq!(service.current().await, snapshot);
        let pushed = sub.updates.recv().await.expect("update");
        assert_eq!(pushed, snapshot);
    }

    #[tokio::test]
    async fn test_replace_store_failure_changes_nothing() {
        // Arrange
        let mut store = store_with_document(json!({ "goalAmount": 10 }));
        store.expect_write().returning(|_| Err(io_failure()));
        let service = service(store).await;
        let mut sub = service.subscribe().await;
        let before = service.current().await;

        // Act
        let result = service.replace(json!({ "goalAmount": 99 })).await;

        // Assert
        let err = result.expect_err("must refuse");
        assert!(matches!(err, SyncError::Unpersistable(_)));
        assert!(!err.is_client_error());
        assert_eq!(service.current().await, before);
        assert!(sub.updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_replace_rejects_non_object_without_writing() {
        // Arrange: no write expectation, so any write would panic the mock
        let store = store_with_document(json!({}));
        let service = service(store).await;

        // Act
        let result = service.replace(json!([1, 2, 3])).await;

        // Assert
        assert!(matches!(result, Err(SyncError::NotAnObject("an array"))));
        assert_eq!(service.current().await.revision, 0);
    }

    #[tokio::test]
    async fn test_replace_json_rejects_unparsable_body() {
        let store = store_with_document(json!({}));
        let service = service(store).await;

        let result = service.replace_json(b"not json").await;

        let err = result.expect_err("must reject");
        assert!(err.is_client_error());
        assert!(matches!(err, SyncError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_revisions_increase_per_commit() {
        let mut store = store_with_document(json!({}));
        store.expect_write().times(3).returning(|_| Ok(()));
        let service = service(store).await;

        for expected in 1..=3u64 {
            let snapshot = service
                .replace(json!({ "goalAmount": expected }))
                .await
                .expect("replace");
            assert_eq!(snapshot.revision, expected);
        }
    }

    #[tokio::test]
    async fn test_subscription_initial_is_current_snapshot() {
        let mut store = store_with_document(json!({}));
        store.expect_write().returning(|_| Ok(()));
        let service = service(store).await;
        service.replace(json!({ "currency": "USD" })).await.expect("replace");

        let sub = service.subscribe().await;

        assert_eq!(sub.initial.revision, 1);
        assert_eq!(sub.initial.settings.currency, "USD");
        assert_eq!(service.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let mut store = store_with_document(json!({}));
        store.expect_write().returning(|_| Ok(()));
        let service = service(store).await;
        let sub = service.subscribe().await;

        service.unsubscribe(sub.handle).await;
        service.unsubscribe(sub.handle).await;

        assert_eq!(service.subscriber_count().await, 0);
        let mut updates = sub.updates;
        service.replace(json!({})).await.expect("replace");
        assert!(updates.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_subscriptions_ends_update_queues() {
        let store = store_with_document(json!({}));
        let service = service(store).await;
        let mut sub = service.subscribe().await;

        service.close_subscriptions().await;

        assert!(sub.updates.recv().await.is_none());
    }
}
