//! Transport-agnostic session state shared by the event loop and the handle.

use std::sync::{Arc, Mutex as StdMutex};

use discuss_common::{Notification, NotificationQueue};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::SharedCache;
use crate::callbacks::CallbackRegistry;
use crate::commands::CommandSender;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::protocol::{Destinations, ServerError};
use crate::subscriptions::SubscriptionManager;
use crate::transport::{Transport, TransportEvent};

/// What the core did with one transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    ConnectionChanged { connected: bool },
    Dispatched(DispatchOutcome),
    ServerRejected(ServerError),
    Notified,
}

pub(crate) struct SyncCore<T> {
    pub(crate) transport: Arc<T>,
    pub(crate) destinations: Destinations,
    pub(crate) subscriptions: Mutex<SubscriptionManager<T>>,
    pub(crate) commands: CommandSender<T>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) callbacks: CallbackRegistry,
    pub(crate) cache: SharedCache,
    pub(crate) notifications: Arc<StdMutex<NotificationQueue>>,
}

impl<T: Transport> SyncCore<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        destinations: Destinations,
        cache: SharedCache,
        callbacks: CallbackRegistry,
    ) -> Self {
        Self {
            subscriptions: Mutex::new(SubscriptionManager::new(
                Arc::clone(&transport),
                destinations.clone(),
            )),
            commands: CommandSender::new(Arc::clone(&transport), destinations.clone()),
            dispatcher: Dispatcher::new(Arc::clone(&cache), callbacks.clone()),
            transport,
            destinations,
            callbacks,
            cache,
            notifications: Arc::new(StdMutex::new(NotificationQueue::default())),
        }
    }

    pub(crate) async fn handle_transport_event(&self, event: TransportEvent) -> EventOutcome {
        match event {
            TransportEvent::Connected => {
                self.subscriptions.lock().await.on_connection_change(true).await;
                EventOutcome::ConnectionChanged { connected: true }
            }
            TransportEvent::Disconnected => {
                // The cache is left as is; delivery resumes after reconnect.
                self.subscriptions.lock().await.on_connection_change(false).await;
                EventOutcome::ConnectionChanged { connected: false }
            }
            TransportEvent::Message {
                destination, body, ..
            } => {
                if destination == self.destinations.error_queue() {
                    let error = ServerError::decode(&body);
                    self.reject(&error);
                    EventOutcome::ServerRejected(error)
                } else {
                    debug!(destination = %destination, "Dispatching frame");
                    EventOutcome::Dispatched(self.dispatcher.dispatch_frame(&body).await)
                }
            }
            TransportEvent::ProtocolError { message, body } => {
                warn!(message = %message, "Broker reported a protocol error");
                let detail = if body.trim().is_empty() { message } else { body };
                self.notify(Notification::error("Real-time connection error", detail));
                EventOutcome::Notified
            }
            TransportEvent::Error(message) => {
                self.notify(Notification::warning("Real-time connection lost", message));
                EventOutcome::Notified
            }
        }
    }

    fn reject(&self, error: &ServerError) {
        info!(code = ?error.code, channel_id = ?error.channel_id, message = %error.message, "Server rejected a command");
        let mut notification = Notification::error("Request failed", error.message.clone());
        if let Some(code) = &error.code {
            notification = notification.with_code(code.clone());
        }
        if let Some(channel_id) = &error.channel_id {
            notification = notification.with_channel(channel_id.clone());
        }
        self.notify(notification);
        self.callbacks.emit_error(error);
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }

    pub(crate) fn take_notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
    }

    pub(crate) async fn active_channel(&self) -> Option<String> {
        self.subscriptions
            .lock()
            .await
            .active_channel()
            .map(str::to_string)
    }
}
