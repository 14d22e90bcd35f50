//! The persistence port used by [`SyncService`](super::SyncService).
//!
//! The service never touches the file system itself.  It talks to a
//! [`DocumentStore`], which production code backs with
//! `infrastructure::storage::FileDocumentStore` and unit tests replace with a
//! `mockall` mock to inject failures.

use std::path::PathBuf;

use async_trait::async_trait;
use board_core::Settings;
use serde_json::Value;
use thiserror::Error;

/// Errors reported by a [`DocumentStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The persisted (or bundled default) document could not be read or
    /// written.  Fatal during startup; rejects the write afterwards.
    #[error("storage unavailable at {path}: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored bytes are not valid JSON.  Never silently replaced by
    /// defaults once the server is running.
    #[error("corrupt settings document at {path}: {source}")]
    CorruptDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable storage for the single settings document.
///
/// Implementations must make [`write`](DocumentStore::write) atomic with
/// respect to [`read`](DocumentStore::read) and [`load`](DocumentStore::load):
/// no reader may ever observe a half-written document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the persisted document, seeding it from the bundled default
    /// first if nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] if neither document can be read or
    /// the seed cannot be persisted; [`StoreError::CorruptDocument`] if a
    /// document exists but does not parse.
    async fn load(&self) -> Result<Value, StoreError>;

    /// Returns the persisted document as parsed JSON.
    ///
    /// # Errors
    ///
    /// [`StoreError::CorruptDocument`] if the stored bytes do not parse;
    /// [`StoreError::StorageUnavailable`] on I/O failure.
    async fn read(&self) -> Result<Value, StoreError>;

    /// Persists `settings` with stable, human-readable formatting.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] on I/O failure.  The previous
    /// document stays in place.
    async fn write(&self, settings: &Settings) -> Result<(), StoreError>;
}
