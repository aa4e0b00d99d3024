//! STOMP-over-WebSocket transport.
//!
//! Owns one broker connection with a fixed reconnect delay, negotiated
//! heart-beats and bearer authentication, and exposes subscribe/publish
//! primitives plus an observable connection state.

mod client;
mod connection;
mod handler;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::StompClient;
pub use types::{ConnectionState, Credential, SubscriptionId, TransportConfig, TransportEvent};

use async_trait::async_trait;

/// The primitives the rest of the crate needs from a connection.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    async fn subscribe(&self, destination: &str) -> SubscriptionId;

    async fn unsubscribe(&self, id: &SubscriptionId);

    /// Fire-and-forget SEND.
    async fn publish(&self, destination: &str, body: String);
}
