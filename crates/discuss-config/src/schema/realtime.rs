//! Real-time connection settings.

use serde::{Deserialize, Serialize};

/// STOMP-over-WebSocket connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Base WebSocket URL of the gateway (overridable via `DISCUSS_WS_URL`).
    pub base_url: String,
    /// Path appended to `base_url` to reach the discuss broker.
    pub endpoint_suffix: String,
    /// Fixed delay between reconnect attempts (valid range: 100-300000).
    pub reconnect_delay_ms: u64,
    /// Expected server heartbeat interval; 0 disables (1000-600000 otherwise).
    pub heartbeat_incoming_ms: u64,
    /// Client heartbeat interval; 0 disables (1000-600000 otherwise).
    pub heartbeat_outgoing_ms: u64,
    /// Upper bound on a single connect + handshake attempt (1-120).
    pub connect_timeout_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            base_url: "ws://localhost:8080/ws".into(),
            endpoint_suffix: "/discuss".into(),
            reconnect_delay_ms: 5000,
            heartbeat_incoming_ms: 10_000,
            heartbeat_outgoing_ms: 10_000,
            connect_timeout_secs: 15,
        }
    }
}

impl RealtimeConfig {
    /// Full broker endpoint, e.g. `ws://localhost:8080/ws/discuss`.
    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint_suffix
        )
    }
}
