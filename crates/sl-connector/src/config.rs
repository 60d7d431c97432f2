//! Connector configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection state of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Connection in progress
    Connecting,
    /// Connected and ready
    Connected,
    /// Connection lost, waiting to reconnect
    Reconnecting,
    /// Connection error
    Error,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorConfig {
    /// Authority WebSocket URL (ws:// or wss://)
    pub url: String,

    /// Connection timeout in milliseconds
    pub timeout_ms: u32,

    /// Reconnect after the connection drops
    pub auto_reconnect: bool,

    /// Delay between reconnection attempts
    pub reconnect_delay: Duration,

    /// Capacity of the event and request queues
    pub queue_capacity: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3001".to_string(),
            timeout_ms: 5000,
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(2),
            queue_capacity: 256,
        }
    }
}

impl ConnectorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms as u64)
    }
}

/// Connector builder
pub struct ConnectorBuilder {
    config: ConnectorConfig,
}

impl ConnectorBuilder {
    /// Create builder with WebSocket URL
    pub fn websocket(url: &str) -> Self {
        Self {
            config: ConnectorConfig {
                url: url.to_string(),
                ..Default::default()
            },
        }
    }

    /// Set connection timeout
    pub fn timeout(mut self, timeout_ms: u32) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Enable/disable auto reconnect
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    /// Set reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    /// Set queue capacity (minimum 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity.max(1);
        self
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Build the configuration
    pub fn build(self) -> ConnectorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chaining() {
        let config = ConnectorBuilder::websocket("ws://test:1234")
            .timeout(10000)
            .auto_reconnect(false)
            .reconnect_delay(Duration::from_secs(5))
            .queue_capacity(0)
            .build();

        assert_eq!(config.url, "ws://test:1234");
        assert_eq!(config.timeout_ms, 10000);
        assert!(!config.auto_reconnect);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ConnectorBuilder::websocket("ws://localhost:8080");
        assert!(builder.config().auto_reconnect);
        assert_eq!(builder.config().timeout(), Duration::from_millis(5000));
    }
}
