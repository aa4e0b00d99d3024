//! In-memory transport that records every call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ConnectionState, SubscriptionId, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Subscribe { id: SubscriptionId, destination: String },
    Unsubscribe { id: SubscriptionId },
    Publish { destination: String, body: String },
}

#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    connected: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl RecordingTransport {
    pub(crate) fn connected() -> Self {
        let t = Self::default();
        t.set_connected(true);
        t
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub(crate) fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Publish { destination, body } => {
                    Some((destination, serde_json::from_str(&body).unwrap()))
                }
                _ => None,
            })
            .collect()
    }

    /// Destinations subscribed and not yet unsubscribed, in subscribe order.
    pub(crate) fn active_destinations(&self) -> Vec<String> {
        let mut active: Vec<(SubscriptionId, String)> = Vec::new();
        for call in self.calls() {
            match call {
                Call::Subscribe { id, destination } => active.push((id, destination)),
                Call::Unsubscribe { id } => active.retain(|(a, _)| *a != id),
                Call::Publish { .. } => {}
            }
        }
        active.into_iter().map(|(_, d)| d).collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn state(&self) -> ConnectionState {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    async fn subscribe(&self, destination: &str) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.calls.lock().unwrap().push(Call::Subscribe {
            id: id.clone(),
            destination: destination.to_string(),
        });
        id
    }

    async fn unsubscribe(&self, id: &SubscriptionId) {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Unsubscribe { id: id.clone() });
    }

    async fn publish(&self, destination: &str, body: String) {
        self.calls.lock().unwrap().push(Call::Publish {
            destination: destination.to_string(),
            body,
        });
    }
}
