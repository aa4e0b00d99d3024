//! Broker destinations.

use serde::{Deserialize, Serialize};

/// Destination layout of the discuss broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    /// Channel events arrive on `{channel_topic_prefix}/{channelId}`.
    pub channel_topic_prefix: String,
    /// Commands go to `{command_prefix}/{channelId}/{typing|read|message}`.
    pub command_prefix: String,
    /// Personal queue carrying rejected-command errors.
    pub error_queue: String,
    /// Personal queue carrying events for channels other than the open one.
    pub notification_queue: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            channel_topic_prefix: "/topic/channels".into(),
            command_prefix: "/app/channels".into(),
            error_queue: "/user/queue/errors".into(),
            notification_queue: "/user/queue/notifications".into(),
        }
    }
}
