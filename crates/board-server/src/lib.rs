//! board-server library crate.
//!
//! This crate holds the single settings document of a status board, persists
//! it, and pushes every accepted change to all connected displays.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Admin (POST JSON)      Displays (GET / SSE / WebSocket)
//!         ↓                         ↑
//! [board-server]
//!   ├── domain/           ServerConfig
//!   ├── application/
//!   │     ├── document_store   DocumentStore trait + StoreError
//!   │     ├── registry         SubscriberRegistry (per-subscriber queues)
//!   │     └── sync_service     SyncService (read / subscribe / replace)
//!   └── infrastructure/
//!         ├── storage/    FileDocumentStore (atomic JSON file writes)
//!         ├── config_file TOML configuration file
//!         ├── http        axum router: /api/settings, /api/stream
//!         └── ws_server   WebSocket push feed (tokio-tungstenite)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `board-core`, and the `DocumentStore`
//!   abstraction; it never touches files or sockets directly.
//! - `infrastructure` depends on all other layers plus `tokio`, `axum`, and
//!   `tungstenite`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: the store abstraction, the registry, and the service.
pub mod application;

/// Infrastructure layer: file store, config file, HTTP API, WebSocket feed.
pub mod infrastructure;
