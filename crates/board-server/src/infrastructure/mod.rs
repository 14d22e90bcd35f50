//! Infrastructure layer for board-server.
//!
//! Adapters between the application layer and the outside world:
//!
//! - **`storage`** – [`FileDocumentStore`](storage::FileDocumentStore), the
//!   JSON file behind the `DocumentStore` port.
//! - **`config_file`** – Optional TOML configuration file.
//! - **`http`** – axum router for the JSON API and the SSE stream.
//! - **`ws_server`** – WebSocket push feed for `board-watch` and other
//!   native viewers.

pub mod config_file;
pub mod http;
pub mod storage;
pub mod ws_server;
