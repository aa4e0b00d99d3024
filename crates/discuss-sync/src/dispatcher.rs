//! Decodes inbound frames and routes them to the cache and callbacks.

use tracing::{debug, warn};

use crate::cache::{self, Mutation, SharedCache};
use crate::callbacks::{CallbackRegistry, StatusUpdate, TypingUpdate};
use crate::protocol::ServerEvent;

/// Result of dispatching one frame, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied {
        kind: &'static str,
        mutation: Mutation,
        notified: bool,
    },
    Dropped {
        reason: String,
    },
}

#[derive(Clone)]
pub struct Dispatcher {
    cache: SharedCache,
    callbacks: CallbackRegistry,
}

impl Dispatcher {
    pub fn new(cache: SharedCache, callbacks: CallbackRegistry) -> Self {
        Self { cache, callbacks }
    }

    /// Decode a raw frame body and dispatch it. Malformed or unknown frames
    /// are logged and dropped.
    pub async fn dispatch_frame(&self, body: &str) -> DispatchOutcome {
        match ServerEvent::decode(body) {
            Ok(event) => self.dispatch(event).await,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable frame");
                debug!(body = %body, "Dropped frame body");
                DispatchOutcome::Dropped {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub async fn dispatch(&self, event: ServerEvent) -> DispatchOutcome {
        let kind = event.kind();
        let mutation = {
            let mut cache = self.cache.write().await;
            cache::apply(&mut cache, &event)
        };
        debug!(kind, channel_id = ?event.channel_id(), ?mutation, "Event applied");

        let notified = match event {
            ServerEvent::MessageNew { .. } if mutation == Mutation::Duplicate => {
                debug!("Redelivered message, not notifying");
                false
            }
            ServerEvent::MessageNew { channel_id, message } => {
                // Prefer the cached shape so callbacks see derived fields.
                let cached = self
                    .cache
                    .read()
                    .await
                    .message(&channel_id, &message.id)
                    .cloned();
                let message = cached.unwrap_or_else(|| cache::transform_message(message));
                self.callbacks.emit_message(&message)
            }
            ServerEvent::TypingIndicator {
                channel_id,
                user_id,
                is_typing,
            } => self.callbacks.emit_typing(TypingUpdate {
                channel_id,
                user_id,
                is_typing,
            }),
            ServerEvent::UserOnline {
                channel_id,
                user_id,
            } => self.callbacks.emit_status(StatusUpdate {
                user_id,
                is_online: true,
                channel_id,
            }),
            ServerEvent::UserOffline {
                channel_id,
                user_id,
            } => self.callbacks.emit_status(StatusUpdate {
                user_id,
                is_online: false,
                channel_id,
            }),
            _ => false,
        };

        DispatchOutcome::Applied {
            kind,
            mutation,
            notified,
        }
    }
}
