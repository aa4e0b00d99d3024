//! Client-originated commands: typing, read receipts and message sends.
//!
//! All sends are fire-and-forget. Unmet preconditions are logged and the
//! command is skipped.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::protocol::{Destinations, ReadReceipt, SendMessageCommand, TypingCommand};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConnected,
    NoActiveChannel,
    EmptyContent,
    MissingMessageId,
    Encode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Queued { destination: String },
    Skipped(SkipReason),
}

impl SendOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

pub struct CommandSender<T> {
    transport: Arc<T>,
    destinations: Destinations,
}

impl<T: Transport> CommandSender<T> {
    pub fn new(transport: Arc<T>, destinations: Destinations) -> Self {
        Self {
            transport,
            destinations,
        }
    }

    pub async fn send_typing(&self, channel: Option<&str>, is_typing: bool) -> SendOutcome {
        let channel_id = match self.ready("send_typing", channel) {
            Ok(channel_id) => channel_id,
            Err(reason) => return SendOutcome::Skipped(reason),
        };
        let destination = self.destinations.typing(channel_id);
        self.publish(destination, &TypingCommand { is_typing }).await
    }

    pub async fn mark_read(&self, channel: Option<&str>, message_id: &str) -> SendOutcome {
        let channel_id = match self.ready("mark_read", channel) {
            Ok(channel_id) => channel_id,
            Err(reason) => return SendOutcome::Skipped(reason),
        };
        let Some(message_id) = discuss_common::normalize_id(message_id) else {
            warn!(channel_id = %channel_id, "Read receipt without a message id, skipping");
            return SendOutcome::Skipped(SkipReason::MissingMessageId);
        };
        let destination = self.destinations.read(channel_id);
        let receipt = ReadReceipt { message_id };
        self.publish(destination, &receipt).await
    }

    pub async fn send_message(
        &self,
        channel: Option<&str>,
        content: &str,
        parent_id: Option<&str>,
    ) -> SendOutcome {
        let channel_id = match self.ready("send_message", channel) {
            Ok(channel_id) => channel_id,
            Err(reason) => return SendOutcome::Skipped(reason),
        };
        if content.trim().is_empty() {
            warn!(channel_id = %channel_id, "Refusing to send an empty message");
            return SendOutcome::Skipped(SkipReason::EmptyContent);
        }
        let destination = self.destinations.message(channel_id);
        let command = SendMessageCommand::standard(
            content,
            parent_id.and_then(discuss_common::normalize_id),
        );
        self.publish(destination, &command).await
    }

    /// The channel to send to, or why the command cannot go out right now.
    fn ready<'a>(&self, op: &'static str, channel: Option<&'a str>) -> Result<&'a str, SkipReason> {
        if !self.transport.is_connected() {
            warn!(op, "Not connected, skipping command");
            return Err(SkipReason::NotConnected);
        }
        match channel.map(str::trim).filter(|c| !c.is_empty()) {
            Some(channel_id) => Ok(channel_id),
            None => {
                warn!(op, "No active channel, skipping command");
                Err(SkipReason::NoActiveChannel)
            }
        }
    }

    async fn publish<P: Serialize>(&self, destination: String, payload: &P) -> SendOutcome {
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode command");
                return SendOutcome::Skipped(SkipReason::Encode);
            }
        };
        debug!(destination = %destination, "Publishing command");
        self.transport.publish(&destination, body).await;
        SendOutcome::Queued { destination }
    }
}
