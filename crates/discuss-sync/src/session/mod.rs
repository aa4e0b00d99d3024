//! One sync session: a broker connection plus everything that reacts to it.
//!
//! The session is an owned resource. Create it with [`DiscussSession::start`]
//! when a user session begins and dispose of it with
//! [`DiscussSession::shutdown`] when it ends.

mod event_loop;
mod sync_core;


pub use sync_core::EventOutcome;

use std::sync::Arc;
use std::time::Duration;

use discuss_common::{Notification, SessionId};
use discuss_config::DiscussConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use self::sync_core::SyncCore;
use crate::cache::SharedCache;
use crate::callbacks::CallbackRegistry;
use crate::commands::SendOutcome;
use crate::protocol::Destinations;
use crate::transport::{ConnectionState, StompClient, Transport, TransportConfig};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct DiscussSession {
    id: SessionId,
    client: Arc<StompClient>,
    core: Arc<SyncCore<StompClient>>,
    event_task: JoinHandle<()>,
}

impl DiscussSession {
    /// Connect to the broker and start applying events to `cache`.
    ///
    /// With no usable `token` the session is inert: nothing connects and
    /// every command is skipped.
    pub fn start(config: &DiscussConfig, token: Option<&str>, cache: SharedCache) -> Self {
        let id = SessionId::new();
        let transport_config = TransportConfig::from_realtime(&config.realtime);
        info!(session = %id, endpoint = %transport_config.endpoint, "Starting discuss session");

        let (client, events) = StompClient::connect(transport_config, token);
        let client = Arc::new(client);
        let core = Arc::new(SyncCore::new(
            Arc::clone(&client),
            Destinations::from_config(&config.topics),
            cache,
            CallbackRegistry::new(),
        ));
        let event_task = tokio::spawn(event_loop::run(Arc::clone(&core), events));

        Self {
            id,
            client,
            core,
            event_task,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Callback slots. Replacing a callback never touches subscriptions.
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.core.callbacks
    }

    pub fn cache(&self) -> SharedCache {
        Arc::clone(&self.core.cache)
    }

    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.client.watch_state()
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Make `channel_id` the channel whose topic is subscribed.
    pub async fn set_active_channel(&self, channel_id: Option<&str>) {
        self.core
            .subscriptions
            .lock()
            .await
            .set_active_channel(channel_id)
            .await;
    }

    pub async fn active_channel(&self) -> Option<String> {
        self.core.active_channel().await
    }

    pub async fn send_typing(&self, is_typing: bool) -> SendOutcome {
        let channel = self.core.active_channel().await;
        self.core
            .commands
            .send_typing(channel.as_deref(), is_typing)
            .await
    }

    pub async fn mark_read(&self, message_id: &str) -> SendOutcome {
        let channel = self.core.active_channel().await;
        self.core
            .commands
            .mark_read(channel.as_deref(), message_id)
            .await
    }

    pub async fn send_message(&self, content: &str, parent_id: Option<&str>) -> SendOutcome {
        let channel = self.core.active_channel().await;
        self.core
            .commands
            .send_message(channel.as_deref(), content, parent_id)
            .await
    }

    /// Take pending user-facing notifications (protocol errors, rejections).
    pub fn take_notifications(&self) -> Vec<Notification> {
        self.core.take_notifications()
    }

    /// Unsubscribe, disconnect and wait for the event loop to drain.
    pub async fn shutdown(self) {
        info!(session = %self.id, "Shutting down discuss session");
        self.core.subscriptions.lock().await.teardown().await;
        self.client.disconnect();

        let mut event_task = self.event_task;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut event_task)
            .await
            .is_err()
        {
            warn!(session = %self.id, "Event loop did not stop in time, aborting");
            event_task.abort();
        }
    }
}
