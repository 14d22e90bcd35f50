//! Feed client configuration.

use std::time::Duration;

/// Runtime configuration of a [`FeedClient`](crate::FeedClient).
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// WebSocket URL of the push feed, e.g. `ws://127.0.0.1:3334`.
    pub url: String,
    /// How often to ask for a fresh snapshot while subscribed.
    pub resync_interval: Duration,
    /// How long to wait for the connection, the first snapshot, or a
    /// re-sync reply before giving up on the connection.
    pub response_timeout: Duration,
    /// First reconnect delay.
    pub initial_backoff: Duration,
    /// Longest reconnect delay.
    pub max_backoff: Duration,
}

impl Default for FeedConfig {
    /// | Field            | Default               |
    /// |------------------|-----------------------|
    /// | url              | `ws://127.0.0.1:3334` |
    /// | resync_interval  | 30 seconds            |
    /// | response_timeout | 10 seconds            |
    /// | initial_backoff  | 1 second              |
    /// | max_backoff      | 30 seconds            |
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3334".to_string(),
            resync_interval: Duration::from_secs(30),
            response_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}
