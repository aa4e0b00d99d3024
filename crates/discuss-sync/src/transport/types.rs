//! Configuration, state, and event/command enums for the STOMP transport.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use discuss_config::RealtimeConfig;

use crate::stomp::HeartBeat;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection parameters for one broker endpoint.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Full WebSocket URL, e.g. `ws://localhost:8080/ws/discuss`.
    pub endpoint: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Heart-beat intervals we offer in CONNECT.
    pub heartbeat: HeartBeat,
    /// Upper bound on socket open + STOMP handshake.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::from_realtime(&RealtimeConfig::default())
    }
}

impl TransportConfig {
    pub fn from_realtime(realtime: &RealtimeConfig) -> Self {
        Self {
            endpoint: realtime.endpoint(),
            reconnect_delay: Duration::from_millis(realtime.reconnect_delay_ms),
            heartbeat: HeartBeat::new(
                realtime.heartbeat_outgoing_ms,
                realtime.heartbeat_incoming_ms,
            ),
            connect_timeout: Duration::from_secs(realtime.connect_timeout_secs),
        }
    }

    /// Authority part of the endpoint, sent as the STOMP `host` header.
    pub fn host(&self) -> &str {
        let rest = self
            .endpoint
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.endpoint);
        rest.split(['/', '?']).next().unwrap_or(rest)
    }
}

/// Bearer credential. Kept out of `Debug` output.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for a missing or blank token.
    pub fn from_token(token: Option<&str>) -> Option<Self> {
        token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Self(t.to_string()))
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last attempt failed; a retry is scheduled.
    Errored,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Errored => "errored",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Subscription ids
// ---------------------------------------------------------------------------

static SUBSCRIPTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Client-chosen STOMP subscription id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn next() -> Self {
        Self(format!(
            "sub-{}",
            SUBSCRIPTION_COUNTER.fetch_add(1, Ordering::Relaxed)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubscriptionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Events emitted by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// STOMP handshake completed.
    Connected,
    /// An established connection was lost or closed.
    Disconnected,
    /// A MESSAGE frame.
    Message {
        subscription: Option<SubscriptionId>,
        destination: String,
        body: String,
    },
    /// The broker sent an ERROR frame.
    ProtocolError { message: String, body: String },
    /// Socket-level failure or timeout.
    Error(String),
}

/// Commands forwarded to the live socket.
#[derive(Debug, Clone)]
pub(crate) enum TransportCommand {
    Subscribe {
        id: SubscriptionId,
        destination: String,
    },
    Unsubscribe {
        id: SubscriptionId,
    },
    Send {
        destination: String,
        body: String,
    },
}
