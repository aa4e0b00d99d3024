//! Wire types for the discuss real-time protocol.
//!
//! Inbound events arrive as `{ "type": <tag>, "payload": { ... } }`. Older
//! server builds used `data` instead of `payload` and a few different tag
//! names; both spellings decode to the same [`ServerEvent`].

use discuss_common::{deserialize_opt_id, normalize_id};
use discuss_config::TopicsConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cache::Message;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(rename = "type", default)]
    tag: Option<String>,
    #[serde(default, alias = "data")]
    payload: Option<Value>,
    /// Some server builds put the channel on the envelope instead of the payload.
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    channel_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Payload {
    #[serde(deserialize_with = "deserialize_opt_id")]
    channel_id: Option<String>,
    #[serde(deserialize_with = "deserialize_opt_id")]
    message_id: Option<String>,
    #[serde(deserialize_with = "deserialize_opt_id")]
    user_id: Option<String>,
    message: Option<Value>,
    emoji: Option<String>,
    is_typing: Option<bool>,
    is_online: Option<bool>,
    content: Option<String>,
    edited_at: Option<String>,
    deleted_at: Option<String>,
    unread_count: Option<i64>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ReactionChange {
    pub channel_id: String,
    pub message_id: String,
    pub emoji: String,
    pub user_id: String,
}

/// A decoded server push. One variant per event tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    MessageNew {
        channel_id: String,
        message: Message,
    },
    MessageUpdated {
        channel_id: String,
        message_id: String,
        content: Option<String>,
        edited_at: Option<String>,
    },
    MessageDeleted {
        channel_id: String,
        message_id: String,
        deleted_at: Option<String>,
    },
    ReactionAdded(ReactionChange),
    ReactionRemoved(ReactionChange),
    TypingIndicator {
        channel_id: String,
        user_id: String,
        is_typing: bool,
    },
    UserOnline {
        channel_id: Option<String>,
        user_id: String,
    },
    UserOffline {
        channel_id: Option<String>,
        user_id: String,
    },
    ChannelUpdated {
        channel_id: String,
    },
    UnreadCountUpdated {
        channel_id: String,
        unread_count: Option<i64>,
    },
}

impl ServerEvent {
    /// The canonical tag, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MessageNew { .. } => "MESSAGE_NEW",
            Self::MessageUpdated { .. } => "MESSAGE_UPDATED",
            Self::MessageDeleted { .. } => "MESSAGE_DELETED",
            Self::ReactionAdded(_) => "REACTION_ADDED",
            Self::ReactionRemoved(_) => "REACTION_REMOVED",
            Self::TypingIndicator { .. } => "TYPING_INDICATOR",
            Self::UserOnline { .. } => "USER_ONLINE",
            Self::UserOffline { .. } => "USER_OFFLINE",
            Self::ChannelUpdated { .. } => "CHANNEL_UPDATED",
            Self::UnreadCountUpdated { .. } => "UNREAD_COUNT_UPDATED",
        }
    }

    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::MessageNew { channel_id, .. }
            | Self::MessageUpdated { channel_id, .. }
            | Self::MessageDeleted { channel_id, .. }
            | Self::TypingIndicator { channel_id, .. }
            | Self::ChannelUpdated { channel_id }
            | Self::UnreadCountUpdated { channel_id, .. } => Some(channel_id),
            Self::ReactionAdded(change) | Self::ReactionRemoved(change) => {
                Some(&change.channel_id)
            }
            Self::UserOnline { channel_id, .. } | Self::UserOffline { channel_id, .. } => {
                channel_id.as_deref()
            }
        }
    }

    /// Decode one frame body.
    pub fn decode(body: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope = serde_json::from_str(body)?;
        let tag = envelope.tag.ok_or(DecodeError::MissingType)?;
        let payload: Payload = match envelope.payload {
            Some(Value::Null) | None => Payload::default(),
            Some(value) => serde_json::from_value(value)?,
        };
        let fields = Fields {
            tag: canonical_tag(&tag),
            payload,
            envelope_channel: envelope.channel_id,
        };
        fields.into_event(&tag)
    }
}

fn canonical_tag(tag: &str) -> &'static str {
    match tag {
        "MESSAGE_NEW" | "NEW_MESSAGE" => "MESSAGE_NEW",
        "MESSAGE_UPDATED" | "MESSAGE_EDITED" => "MESSAGE_UPDATED",
        "MESSAGE_DELETED" => "MESSAGE_DELETED",
        "REACTION_ADDED" => "REACTION_ADDED",
        "REACTION_REMOVED" => "REACTION_REMOVED",
        "TYPING_INDICATOR" | "TYPING_START" | "TYPING_STOP" => "TYPING_INDICATOR",
        "USER_ONLINE" => "USER_ONLINE",
        "USER_OFFLINE" => "USER_OFFLINE",
        "USER_PRESENCE_CHANGED" => "USER_PRESENCE_CHANGED",
        "CHANNEL_UPDATED" => "CHANNEL_UPDATED",
        "UNREAD_COUNT_UPDATED" => "UNREAD_COUNT_UPDATED",
        _ => "",
    }
}

struct Fields {
    tag: &'static str,
    payload: Payload,
    envelope_channel: Option<String>,
}

impl Fields {
    fn require(
        &self,
        value: Option<String>,
        field: &'static str,
    ) -> Result<String, DecodeError> {
        value.ok_or(DecodeError::MissingField {
            tag: self.tag,
            field,
        })
    }

    fn channel(&self) -> Option<String> {
        self.payload
            .channel_id
            .clone()
            .or_else(|| self.envelope_channel.clone())
    }

    fn into_event(self, raw_tag: &str) -> Result<ServerEvent, DecodeError> {
        let channel = self.channel();
        let event = match self.tag {
            "MESSAGE_NEW" => {
                let raw = self
                    .payload
                    .message
                    .clone()
                    .filter(|m| !m.is_null())
                    .ok_or(DecodeError::MissingField {
                        tag: self.tag,
                        field: "message",
                    })?;
                let message: Message = serde_json::from_value(raw)?;
                let channel_id = channel
                    .or_else(|| message.channel_id.clone())
                    .ok_or(DecodeError::MissingField {
                        tag: self.tag,
                        field: "channelId",
                    })?;
                ServerEvent::MessageNew {
                    channel_id,
                    message,
                }
            }
            "MESSAGE_UPDATED" => {
                let nested = nested_message(&self.payload);
                let message_id = self.payload.message_id.clone().or_else(|| {
                    nested.as_ref().map(|m| m.id.clone())
                });
                ServerEvent::MessageUpdated {
                    channel_id: self.require(
                        channel.or_else(|| nested.as_ref().and_then(|m| m.channel_id.clone())),
                        "channelId",
                    )?,
                    message_id: self.require(message_id, "messageId")?,
                    content: self
                        .payload
                        .content
                        .clone()
                        .or_else(|| nested.as_ref().map(|m| m.content.clone())),
                    edited_at: self
                        .payload
                        .edited_at
                        .clone()
                        .or_else(|| nested.and_then(|m| m.edited_at)),
                }
            }
            "MESSAGE_DELETED" => ServerEvent::MessageDeleted {
                channel_id: self.require(channel, "channelId")?,
                message_id: self.require(self.payload.message_id.clone(), "messageId")?,
                deleted_at: self.payload.deleted_at.clone(),
            },
            "REACTION_ADDED" | "REACTION_REMOVED" => {
                let change = ReactionChange {
                    channel_id: self.require(channel, "channelId")?,
                    message_id: self.require(self.payload.message_id.clone(), "messageId")?,
                    emoji: self.require(
                        self.payload.emoji.clone().filter(|e| !e.is_empty()),
                        "emoji",
                    )?,
                    user_id: self.require(self.payload.user_id.clone(), "userId")?,
                };
                if self.tag == "REACTION_ADDED" {
                    ServerEvent::ReactionAdded(change)
                } else {
                    ServerEvent::ReactionRemoved(change)
                }
            }
            "TYPING_INDICATOR" => {
                let is_typing = match raw_tag {
                    "TYPING_START" => true,
                    "TYPING_STOP" => false,
                    _ => self.payload.is_typing.unwrap_or(false),
                };
                ServerEvent::TypingIndicator {
                    channel_id: self.require(channel, "channelId")?,
                    user_id: self.require(self.payload.user_id.clone(), "userId")?,
                    is_typing,
                }
            }
            "USER_ONLINE" => ServerEvent::UserOnline {
                channel_id: channel,
                user_id: self.require(self.payload.user_id.clone(), "userId")?,
            },
            "USER_OFFLINE" => ServerEvent::UserOffline {
                channel_id: channel,
                user_id: self.require(self.payload.user_id.clone(), "userId")?,
            },
            "USER_PRESENCE_CHANGED" => {
                let user_id = self.require(self.payload.user_id.clone(), "userId")?;
                if self.payload.is_online.unwrap_or(false) {
                    ServerEvent::UserOnline {
                        channel_id: channel,
                        user_id,
                    }
                } else {
                    ServerEvent::UserOffline {
                        channel_id: channel,
                        user_id,
                    }
                }
            }
            "CHANNEL_UPDATED" => ServerEvent::ChannelUpdated {
                channel_id: self.require(channel, "channelId")?,
            },
            "UNREAD_COUNT_UPDATED" => ServerEvent::UnreadCountUpdated {
                channel_id: self.require(channel, "channelId")?,
                unread_count: self.payload.unread_count,
            },
            _ => return Err(DecodeError::UnknownType(raw_tag.to_string())),
        };
        Ok(event)
    }
}

/// Edit events from some builds carry the whole message instead of flat fields.
fn nested_message(payload: &Payload) -> Option<Message> {
    payload
        .message
        .clone()
        .and_then(|raw| serde_json::from_value(raw).ok())
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame has no type tag")]
    MissingType,

    #[error("unknown event type: {0}")]
    UnknownType(String),

    #[error("{tag} is missing {field}")]
    MissingField {
        tag: &'static str,
        field: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Server errors
// ---------------------------------------------------------------------------

/// A command rejection delivered on the personal error queue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerError {
    #[serde(skip_deserializing)]
    pub code: Option<String>,
    pub message: String,
    #[serde(deserialize_with = "deserialize_opt_id")]
    pub channel_id: Option<String>,
}

impl ServerError {
    const FALLBACK_MESSAGE: &'static str = "The server rejected the request";

    /// Accepts both the enveloped `{type: "ERROR", payload: {...}}` form and
    /// a bare `{code, message}` object. Never fails: an unreadable body still
    /// yields an error with a generic message.
    pub fn decode(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => {
                let text = body.trim();
                return Self {
                    message: if text.is_empty() {
                        Self::FALLBACK_MESSAGE.to_string()
                    } else {
                        text.to_string()
                    },
                    ..Self::default()
                };
            }
        };
        let inner = value
            .get("payload")
            .or_else(|| value.get("data"))
            .filter(|v| v.is_object())
            .cloned()
            .unwrap_or(value);
        let code = inner.get("code").and_then(|c| match c {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let mut error: Self = serde_json::from_value(inner).unwrap_or_default();
        error.code = code;
        if error.message.trim().is_empty() {
            error.message = Self::FALLBACK_MESSAGE.to_string();
        }
        error
    }
}

// ---------------------------------------------------------------------------
// Outbound commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingCommand {
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageCommand {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl SendMessageCommand {
    pub fn standard(content: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            content: content.into(),
            parent_id,
            kind: "STANDARD",
        }
    }
}

// ---------------------------------------------------------------------------
// Destinations
// ---------------------------------------------------------------------------

/// Resolves topic and command destinations from the configured prefixes.
#[derive(Debug, Clone)]
pub struct Destinations {
    channel_topic_prefix: String,
    command_prefix: String,
    error_queue: String,
    notification_queue: String,
}

impl Destinations {
    pub fn from_config(topics: &TopicsConfig) -> Self {
        Self {
            channel_topic_prefix: topics.channel_topic_prefix.trim_end_matches('/').to_string(),
            command_prefix: topics.command_prefix.trim_end_matches('/').to_string(),
            error_queue: topics.error_queue.clone(),
            notification_queue: topics.notification_queue.clone(),
        }
    }

    pub fn channel_topic(&self, channel_id: &str) -> String {
        format!("{}/{}", self.channel_topic_prefix, channel_id)
    }

    pub fn typing(&self, channel_id: &str) -> String {
        self.command(channel_id, "typing")
    }

    pub fn read(&self, channel_id: &str) -> String {
        self.command(channel_id, "read")
    }

    pub fn message(&self, channel_id: &str) -> String {
        self.command(channel_id, "message")
    }

    pub fn error_queue(&self) -> &str {
        &self.error_queue
    }

    pub fn notification_queue(&self) -> &str {
        &self.notification_queue
    }

    /// Channel id embedded in a channel topic, if `destination` is one.
    pub fn channel_of(&self, destination: &str) -> Option<String> {
        destination
            .strip_prefix(&self.channel_topic_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(normalize_id)
    }

    fn command(&self, channel_id: &str, action: &str) -> String {
        format!("{}/{}/{}", self.command_prefix, channel_id, action)
    }
}

impl Default for Destinations {
    fn default() -> Self {
        Self::from_config(&TopicsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_message_new() {
        let body = r#"{"type":"MESSAGE_NEW","payload":{"channelId":"42","message":{"id":"2","content":"hi"}}}"#;
        match ServerEvent::decode(body).unwrap() {
            ServerEvent::MessageNew {
                channel_id,
                message,
            } => {
                assert_eq!(channel_id, "42");
                assert_eq!(message.id, "2");
                assert_eq!(message.content, "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn legacy_envelope_and_numeric_ids() {
        let body = r#"{"type":"NEW_MESSAGE","data":{"channelId":42,"message":{"id":2,"content":"x"}}}"#;
        let event = ServerEvent::decode(body).unwrap();
        assert_eq!(event.kind(), "MESSAGE_NEW");
        assert_eq!(event.channel_id(), Some("42"));
    }

    #[test]
    fn channel_falls_back_to_message_body() {
        let body = r#"{"type":"MESSAGE_NEW","payload":{"message":{"id":3,"channelId":7}}}"#;
        assert_eq!(ServerEvent::decode(body).unwrap().channel_id(), Some("7"));
    }

    #[test]
    fn message_new_without_message_is_rejected() {
        let body = r#"{"type":"MESSAGE_NEW","payload":{"channelId":"42"}}"#;
        assert!(matches!(
            ServerEvent::decode(body),
            Err(DecodeError::MissingField {
                field: "message",
                ..
            })
        ));
        let body = r#"{"type":"MESSAGE_NEW","payload":{"channelId":"42","message":null}}"#;
        assert!(ServerEvent::decode(body).is_err());
    }

    #[test]
    fn edited_alias_reads_nested_message() {
        let body = r#"{"type":"MESSAGE_EDITED","payload":{"channelId":1,"message":{"id":5,"content":"new","editedAt":"2024-01-01T00:00:00Z"}}}"#;
        assert_eq!(
            ServerEvent::decode(body).unwrap(),
            ServerEvent::MessageUpdated {
                channel_id: "1".into(),
                message_id: "5".into(),
                content: Some("new".into()),
                edited_at: Some("2024-01-01T00:00:00Z".into()),
            }
        );
    }

    #[test]
    fn typing_aliases_infer_flag() {
        let start = r#"{"type":"TYPING_START","payload":{"channelId":1,"userId":9}}"#;
        let stop = r#"{"type":"TYPING_STOP","payload":{"channelId":1,"userId":9,"isTyping":true}}"#;
        assert!(matches!(
            ServerEvent::decode(start).unwrap(),
            ServerEvent::TypingIndicator { is_typing: true, .. }
        ));
        assert!(matches!(
            ServerEvent::decode(stop).unwrap(),
            ServerEvent::TypingIndicator {
                is_typing: false,
                ..
            }
        ));
    }

    #[test]
    fn presence_changed_maps_to_online_offline() {
        let body = r#"{"type":"USER_PRESENCE_CHANGED","payload":{"userId":3,"isOnline":true}}"#;
        assert_eq!(
            ServerEvent::decode(body).unwrap(),
            ServerEvent::UserOnline {
                channel_id: None,
                user_id: "3".into()
            }
        );
        let body = r#"{"type":"USER_PRESENCE_CHANGED","payload":{"userId":3}}"#;
        assert_eq!(ServerEvent::decode(body).unwrap().kind(), "USER_OFFLINE");
    }

    #[test]
    fn reaction_requires_emoji_and_user() {
        let body = r#"{"type":"REACTION_ADDED","payload":{"channelId":1,"messageId":5,"userId":9}}"#;
        assert!(matches!(
            ServerEvent::decode(body),
            Err(DecodeError::MissingField { field: "emoji", .. })
        ));
    }

    #[test]
    fn malformed_and_unknown_frames() {
        assert!(matches!(
            ServerEvent::decode("not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            ServerEvent::decode(r#"{"payload":{}}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            ServerEvent::decode(r#"{"type":"SOMETHING_ELSE","payload":{}}"#),
            Err(DecodeError::UnknownType(t)) if t == "SOMETHING_ELSE"
        ));
    }

    #[test]
    fn server_error_forms() {
        let e = ServerError::decode(
            r#"{"type":"ERROR","payload":{"code":"FORBIDDEN","message":"Not a member","channelId":4}}"#,
        );
        assert_eq!(e.code.as_deref(), Some("FORBIDDEN"));
        assert_eq!(e.message, "Not a member");
        assert_eq!(e.channel_id.as_deref(), Some("4"));

        let e = ServerError::decode(r#"{"code":403,"message":"nope"}"#);
        assert_eq!(e.code.as_deref(), Some("403"));

        let e = ServerError::decode("plain text failure");
        assert_eq!(e.message, "plain text failure");

        let e = ServerError::decode("{}");
        assert_eq!(e.message, ServerError::FALLBACK_MESSAGE);
    }

    #[test]
    fn outbound_payload_shapes() {
        let typing = serde_json::to_value(TypingCommand { is_typing: true }).unwrap();
        assert_eq!(typing, serde_json::json!({"isTyping": true}));

        let read = serde_json::to_value(ReadReceipt {
            message_id: "5".into(),
        })
        .unwrap();
        assert_eq!(read, serde_json::json!({"messageId": "5"}));

        let send = serde_json::to_value(SendMessageCommand::standard("hi", None)).unwrap();
        assert_eq!(send, serde_json::json!({"content": "hi", "type": "STANDARD"}));

        let reply =
            serde_json::to_value(SendMessageCommand::standard("re", Some("3".into()))).unwrap();
        assert_eq!(reply["parentId"], "3");
    }

    #[test]
    fn destinations_follow_prefixes() {
        let d = Destinations::default();
        assert_eq!(d.channel_topic("42"), "/topic/channels/42");
        assert_eq!(d.typing("42"), "/app/channels/42/typing");
        assert_eq!(d.read("42"), "/app/channels/42/read");
        assert_eq!(d.message("42"), "/app/channels/42/message");
        assert_eq!(d.error_queue(), "/user/queue/errors");
        assert_eq!(d.notification_queue(), "/user/queue/notifications");
        assert_eq!(d.channel_of("/topic/channels/42"), Some("42".into()));
        assert_eq!(d.channel_of("/user/queue/errors"), None);
    }
}
