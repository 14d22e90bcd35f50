//! Connection state of a feed client.

use std::fmt;

/// Where the client is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedState {
    /// No connection; waiting for the backoff delay to elapse.
    #[default]
    Disconnected,
    /// A connection attempt is in flight, or the socket is open but the first
    /// snapshot has not arrived yet.
    Connecting,
    /// The first snapshot arrived; updates are flowing.
    Subscribed,
}

/// Inputs to the [`FeedState`] machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEvent {
    ConnectStarted,
    Subscribed,
    Failed,
}

impl FeedState {
    /// Returns the state after `event`.
    ///
    /// `Failed` leads to `Disconnected` from anywhere.  Any other event that
    /// does not apply to the current state leaves it unchanged.
    pub fn on(self, event: FeedEvent) -> FeedState {
        match (self, event) {
            (_, FeedEvent::Failed) => FeedState::Disconnected,
            (FeedState::Disconnected, FeedEvent::ConnectStarted) => FeedState::Connecting,
            (FeedState::Connecting, FeedEvent::Subscribed) => FeedState::Subscribed,
            (state, _) => state,
        }
    }
}

impl fmt::Display for FeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedState::Disconnected => "disconnected",
            FeedState::Connecting => "connecting",
            FeedState::Subscribed => "subscribed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_disconnected() {
        assert_eq!(FeedState::default(), FeedState::Disconnected);
    }

    #[test]
    fn test_happy_path() {
        // Arrange
        let state = FeedState::Disconnected;

        // Act
        let connecting = state.on(FeedEvent::ConnectStarted);
        let subscribed = connecting.on(FeedEvent::Subscribed);

        // Assert
        assert_eq!(connecting, FeedState::Connecting);
        assert_eq!(subscribed, FeedState::Subscribed);
    }

    #[test]
    fn test_failure_from_any_state_disconnects() {
        for state in [
            FeedState::Disconnected,
            FeedState::Connecting,
            FeedState::Subscribed,
        ] {
            assert_eq!(state.on(FeedEvent::Failed), FeedState::Disconnected);
        }
    }

    #[test]
    fn test_subscribed_requires_connecting() {
        assert_eq!(
            FeedState::Disconnected.on(FeedEvent::Subscribed),
            FeedState::Disconnected
        );
    }

    #[test]
    fn test_connect_started_while_subscribed_is_ignored() {
        assert_eq!(
            FeedState::Subscribed.on(FeedEvent::ConnectStarted),
            FeedState::Subscribed
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(FeedState::Subscribed.to_string(), "subscribed");
    }
}
