//! Message shapes held in the cache.
//!
//! Only the fields this crate mutates are typed; everything else the server
//! sends is carried through untouched in `extra`.

use chrono::{SecondsFormat, Utc};
use discuss_common::{deserialize_id, deserialize_id_list, deserialize_opt_id};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Visible content of a deleted message.
pub const TOMBSTONE_TEXT: &str = "This message has been deleted";

/// One emoji reaction on a message. `count` always equals `user_ids.len()`
/// once the entry has been touched by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub emoji: String,
    #[serde(default, deserialize_with = "deserialize_id_list")]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub count: i64,
}

impl Reaction {
    pub fn new(emoji: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            emoji: emoji.into(),
            user_ids: vec![user_id.into()],
            count: 1,
        }
    }

    fn recount(&mut self) {
        self.count = self.user_ids.len() as i64;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub content: String,
    /// Backend message type (`STANDARD` or `SYSTEM`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Display type derived by [`transform_message`] (`TEXT`, `IMAGE`, `FILE`, `SYSTEM`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// A bare message, mostly useful for seeding caches in tests and tools.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channel_id: None,
            sender_id: None,
            content: content.into(),
            message_type: None,
            kind: None,
            parent_id: None,
            reactions: Vec::new(),
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            deleted_at: None,
            created_at: None,
            extra: Map::new(),
        }
    }

    pub fn reaction(&self, emoji: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.emoji == emoji)
    }

    /// Returns `true` if anything changed.
    pub fn mark_edited(&mut self, content: Option<&str>, edited_at: Option<&str>) -> bool {
        let before = (self.content.clone(), self.is_edited, self.edited_at.clone());
        if let Some(content) = content {
            self.content = content.to_string();
        }
        self.is_edited = true;
        self.edited_at = Some(edited_at.map(str::to_string).unwrap_or_else(now_timestamp));
        before != (self.content.clone(), self.is_edited, self.edited_at.clone())
    }

    /// Redact the message in place. The entry keeps its id and position.
    pub fn mark_deleted(&mut self, deleted_at: Option<&str>) -> bool {
        let before = (self.content.clone(), self.is_deleted, self.deleted_at.clone());
        self.is_deleted = true;
        self.content = TOMBSTONE_TEXT.to_string();
        self.deleted_at = Some(deleted_at.map(str::to_string).unwrap_or_else(now_timestamp));
        before != (self.content.clone(), self.is_deleted, self.deleted_at.clone())
    }

    /// Add `user_id` to the `emoji` entry. A repeated add is a no-op.
    pub fn add_reaction(&mut self, emoji: &str, user_id: &str) -> bool {
        match self.reactions.iter_mut().find(|r| r.emoji == emoji) {
            Some(reaction) => {
                if reaction.user_ids.iter().any(|u| u == user_id) {
                    let stale = reaction.count != reaction.user_ids.len() as i64;
                    reaction.recount();
                    return stale;
                }
                reaction.user_ids.push(user_id.to_string());
                reaction.recount();
                true
            }
            None => {
                self.reactions.push(Reaction::new(emoji, user_id));
                true
            }
        }
    }

    /// Remove `user_id` from the `emoji` entry, dropping the entry once empty.
    pub fn remove_reaction(&mut self, emoji: &str, user_id: &str) -> bool {
        let Some(idx) = self.reactions.iter().position(|r| r.emoji == emoji) else {
            return false;
        };
        let reaction = &mut self.reactions[idx];
        let before = reaction.user_ids.len();
        reaction.user_ids.retain(|u| u != user_id);
        if before == reaction.user_ids.len() {
            return false;
        }
        reaction.recount();
        if reaction.count <= 0 {
            self.reactions.remove(idx);
        }
        true
    }
}

/// Bring a server message into the cached shape: derive the display type,
/// dedupe reaction users and fix up counts, drop empty reactions.
pub fn transform_message(mut message: Message) -> Message {
    if message.kind.is_none() {
        message.kind = Some(display_kind(&message).to_string());
    }
    for reaction in &mut message.reactions {
        let mut seen = std::collections::HashSet::new();
        reaction.user_ids.retain(|u| seen.insert(u.clone()));
        reaction.recount();
    }
    message.reactions.retain(|r| r.count > 0);
    message
}

fn display_kind(message: &Message) -> &'static str {
    if message.message_type.as_deref() == Some("SYSTEM") {
        return "SYSTEM";
    }
    let first_attachment = message
        .extra
        .get("attachments")
        .and_then(Value::as_array)
        .and_then(|a| a.first());
    match first_attachment {
        Some(att) => {
            let is_image = att
                .get("fileType")
                .and_then(Value::as_str)
                .is_some_and(|t| t.starts_with("image/"));
            if is_image {
                "IMAGE"
            } else {
                "FILE"
            }
        }
        None => "TEXT",
    }
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
