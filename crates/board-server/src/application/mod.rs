//! Application layer for board-server.
//!
//! The application layer orchestrates the business logic: it knows *what*
//! happens when an admin saves or a display connects, but delegates *how*
//! bytes reach the disk or the network to the infrastructure layer.
//!
//! # Sub-modules
//!
//! - **`document_store`** – The [`DocumentStore`] abstraction the service
//!   persists through, and its error type.
//!
//! - **`registry`** – [`SubscriberRegistry`]: the set of connected push
//!   consumers, each with its own bounded delivery queue.
//!
//! - **`sync_service`** – [`SyncService`]: owns the live document and the
//!   registry; serializes writes and fans them out in commit order.

pub mod document_store;
pub mod registry;
pub mod sync_service;

pub use document_store::{DocumentStore, StoreError};
pub use registry::{BroadcastReport, RegistrationHandle, Snapshot, SubscriberRegistry};
pub use sync_service::{Subscription, SyncError, SyncService};
