//! Channel configuration.

use std::time::Duration;

/// Default board server endpoint.
const DEFAULT_URL: &str = "ws://127.0.0.1:3001/ws";

/// Configuration for the board event channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket endpoint of the board server.
    pub url: String,
    /// Handshake timeout per connection attempt.
    pub connect_timeout: Duration,
    /// Delay before the first reconnection attempt; doubles per attempt.
    pub reconnect_initial_delay: Duration,
    /// Upper bound on the reconnection delay.
    pub reconnect_max_delay: Duration,
    /// Consecutive failed attempts before the connection parks in error.
    pub reconnect_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect_initial_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(5),
            reconnect_attempts: 5,
        }
    }
}

impl ChannelConfig {
    /// Create a config from the environment.
    ///
    /// Uses the `BOARDSYNC_URL` environment variable if set, otherwise
    /// defaults to `ws://127.0.0.1:3001/ws`.
    pub fn from_env() -> Self {
        let url = std::env::var("BOARDSYNC_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::with_url(url)
    }

    /// Create a config with a custom endpoint URL.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}
