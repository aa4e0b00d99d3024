//! Keeps the broker subscriptions in line with the active channel and the
//! connection state.
//!
//! At most one channel-scoped subscription exists at a time. Session-scoped
//! subscriptions (personal error and notification queues) are re-established
//! on every successful handshake.

use std::sync::Arc;

use discuss_common::normalize_id;
use tracing::{debug, info};

use crate::protocol::Destinations;
use crate::transport::{SubscriptionId, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Active {
    channel_id: String,
    id: SubscriptionId,
}

pub struct SubscriptionManager<T> {
    transport: Arc<T>,
    destinations: Destinations,
    active_channel: Option<String>,
    channel_sub: Option<Active>,
    session_subs: Vec<(String, SubscriptionId)>,
}

impl<T: Transport> SubscriptionManager<T> {
    pub fn new(transport: Arc<T>, destinations: Destinations) -> Self {
        Self {
            transport,
            destinations,
            active_channel: None,
            channel_sub: None,
            session_subs: Vec::new(),
        }
    }

    pub fn active_channel(&self) -> Option<&str> {
        self.active_channel.as_deref()
    }

    /// Channel id of the live channel subscription, if any.
    pub fn subscribed_channel(&self) -> Option<&str> {
        self.channel_sub.as_ref().map(|a| a.channel_id.as_str())
    }

    pub fn session_destinations(&self) -> Vec<&str> {
        self.session_subs.iter().map(|(d, _)| d.as_str()).collect()
    }

    /// Switch the active channel. Blank ids count as "no channel". While
    /// disconnected the switch is remembered and applied on reconnect.
    pub async fn set_active_channel(&mut self, channel_id: Option<&str>) {
        self.active_channel = channel_id.and_then(normalize_id);
        debug!(channel_id = ?self.active_channel, "Active channel set");
        self.reconcile().await;
    }

    pub async fn on_connection_change(&mut self, connected: bool) {
        if !connected {
            // The broker drops subscriptions with the socket.
            self.channel_sub = None;
            self.session_subs.clear();
            return;
        }
        if self.session_subs.is_empty() {
            for destination in [
                self.destinations.error_queue().to_string(),
                self.destinations.notification_queue().to_string(),
            ] {
                let id = self.transport.subscribe(&destination).await;
                debug!(destination = %destination, id = %id, "Session subscription established");
                self.session_subs.push((destination, id));
            }
        }
        self.reconcile().await;
    }

    /// Unsubscribe everything. Must run before the session goes away.
    pub async fn teardown(&mut self) {
        self.active_channel = None;
        if self.transport.is_connected() {
            if let Some(active) = self.channel_sub.take() {
                self.transport.unsubscribe(&active.id).await;
            }
            for (_, id) in self.session_subs.drain(..) {
                self.transport.unsubscribe(&id).await;
            }
        } else {
            self.channel_sub = None;
            self.session_subs.clear();
        }
    }

    async fn reconcile(&mut self) {
        if !self.transport.is_connected() {
            return;
        }
        let current = self.channel_sub.as_ref().map(|a| a.channel_id.as_str());
        if current == self.active_channel.as_deref() {
            return;
        }
        if let Some(previous) = self.channel_sub.take() {
            self.transport.unsubscribe(&previous.id).await;
            info!(channel_id = %previous.channel_id, "Left channel topic");
        }
        if let Some(channel_id) = self.active_channel.clone() {
            let topic = self.destinations.channel_topic(&channel_id);
            let id = self.transport.subscribe(&topic).await;
            info!(channel_id = %channel_id, topic = %topic, "Joined channel topic");
            self.channel_sub = Some(Active { channel_id, id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{Call, RecordingTransport};

    fn manager(transport: &Arc<RecordingTransport>) -> SubscriptionManager<RecordingTransport> {
        SubscriptionManager::new(Arc::clone(transport), Destinations::default())
    }

    fn channel_topics(transport: &RecordingTransport) -> Vec<String> {
        transport
            .active_destinations()
            .into_iter()
            .filter(|d| d.starts_with("/topic/"))
            .collect()
    }

    #[tokio::test]
    async fn switching_n_times_leaves_exactly_one_subscription() {
        let transport = Arc::new(RecordingTransport::connected());
        let mut subs = manager(&transport);
        for id in ["1", "2", "3", "4", "5"] {
            subs.set_active_channel(Some(id)).await;
        }
        assert_eq!(channel_topics(&transport), vec!["/topic/channels/5"]);
        let unsubscribed = transport
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Unsubscribe { .. }))
            .count();
        assert_eq!(unsubscribed, 4);
        assert_eq!(subs.subscribed_channel(), Some("5"));
    }

    #[tokio::test]
    async fn unsubscribe_precedes_subscribe() {
        let transport = Arc::new(RecordingTransport::connected());
        let mut subs = manager(&transport);
        subs.set_active_channel(Some("1")).await;
        transport.clear();
        subs.set_active_channel(Some("2")).await;
        let calls = transport.calls();
        assert!(matches!(calls[0], Call::Unsubscribe { .. }));
        assert!(matches!(&calls[1], Call::Subscribe { destination, .. } if destination == "/topic/channels/2"));
    }

    #[tokio::test]
    async fn same_channel_is_not_resubscribed() {
        let transport = Arc::new(RecordingTransport::connected());
        let mut subs = manager(&transport);
        subs.set_active_channel(Some("1")).await;
        subs.set_active_channel(Some(" 1 ")).await;
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn clearing_the_channel_unsubscribes() {
        let transport = Arc::new(RecordingTransport::connected());
        let mut subs = manager(&transport);
        subs.set_active_channel(Some("1")).await;
        subs.set_active_channel(None).await;
        assert!(channel_topics(&transport).is_empty());
        assert_eq!(subs.subscribed_channel(), None);
    }

    #[tokio::test]
    async fn defers_until_connected() {
        let transport = Arc::new(RecordingTransport::default());
        let mut subs = manager(&transport);
        subs.set_active_channel(Some("7")).await;
        assert!(transport.calls().is_empty());

        transport.set_connected(true);
        subs.on_connection_change(true).await;
        assert_eq!(
            transport.active_destinations(),
            vec![
                "/user/queue/errors",
                "/user/queue/notifications",
                "/topic/channels/7"
            ]
        );
    }

    #[tokio::test]
    async fn reconnect_resubscribes_everything() {
        let transport = Arc::new(RecordingTransport::connected());
        let mut subs = manager(&transport);
        subs.on_connection_change(true).await;
        subs.set_active_channel(Some("3")).await;

        transport.set_connected(false);
        subs.on_connection_change(false).await;
        assert_eq!(subs.subscribed_channel(), None);
        assert!(subs.session_destinations().is_empty());
        transport.clear();

        transport.set_connected(true);
        subs.on_connection_change(true).await;
        assert_eq!(transport.active_destinations().len(), 3);
        assert_eq!(subs.subscribed_channel(), Some("3"));
    }

    #[tokio::test]
    async fn teardown_unsubscribes_all() {
        let transport = Arc::new(RecordingTransport::connected());
        let mut subs = manager(&transport);
        subs.on_connection_change(true).await;
        subs.set_active_channel(Some("3")).await;
        subs.teardown().await;
        assert!(transport.active_destinations().is_empty());
        assert_eq!(subs.active_channel(), None);
    }
}
