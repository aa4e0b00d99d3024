//! Applies server events to the cache as minimal in-place patches.
//!
//! Every rule is idempotent and tolerates missing targets: an event for a
//! channel or message that is not cached leaves the cache untouched.

use tracing::debug;

use super::model::{transform_message, Message};
use super::store::{CacheTag, PageWindow, QueryCache};
use crate::protocol::{ReactionChange, ServerEvent};

/// What a single event did to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A new message was appended to this window.
    Appended { window: PageWindow },
    /// An existing message was patched in these windows.
    Patched { windows: Vec<PageWindow> },
    /// The message id is already cached for the channel.
    Duplicate,
    ChannelNotCached,
    MessageNotCached,
    /// The target exists but already reflects the event.
    Unchanged,
    /// Only non-page regions were marked stale.
    Invalidated { tags: Vec<CacheTag> },
    /// The event carries no cache state (typing).
    Ignored,
}

impl Mutation {
    pub fn changed_pages(&self) -> bool {
        matches!(self, Self::Appended { .. } | Self::Patched { .. })
    }
}

pub fn apply(cache: &mut QueryCache, event: &ServerEvent) -> Mutation {
    match event {
        ServerEvent::MessageNew {
            channel_id,
            message,
        } => {
            let mutation = append_message(cache, channel_id, message);
            cache.invalidate(CacheTag::channel_list());
            cache.invalidate(CacheTag::Channel(channel_id.clone()));
            mutation
        }
        ServerEvent::MessageUpdated {
            channel_id,
            message_id,
            content,
            edited_at,
        } => patch_message(cache, channel_id, message_id, |m| {
            m.mark_edited(content.as_deref(), edited_at.as_deref())
        }),
        ServerEvent::MessageDeleted {
            channel_id,
            message_id,
            deleted_at,
        } => patch_message(cache, channel_id, message_id, |m| {
            m.mark_deleted(deleted_at.as_deref())
        }),
        ServerEvent::ReactionAdded(change) => patch_reaction(cache, change, Message::add_reaction),
        ServerEvent::ReactionRemoved(change) => {
            patch_reaction(cache, change, Message::remove_reaction)
        }
        ServerEvent::TypingIndicator { .. } => Mutation::Ignored,
        ServerEvent::ChannelUpdated { channel_id } => invalidate(
            cache,
            vec![
                CacheTag::Channel(channel_id.clone()),
                CacheTag::channel_list(),
            ],
        ),
        ServerEvent::UnreadCountUpdated { channel_id, .. } => {
            invalidate(cache, vec![CacheTag::Channel(channel_id.clone())])
        }
        ServerEvent::UserOnline { .. } | ServerEvent::UserOffline { .. } => {
            invalidate(cache, vec![CacheTag::Presence])
        }
    }
}

fn append_message(cache: &mut QueryCache, channel_id: &str, message: &Message) -> Mutation {
    let Some(window) = cache.locate(channel_id) else {
        debug!(channel_id = %channel_id, "Channel not cached, skipping append");
        return Mutation::ChannelNotCached;
    };
    if !cache.locate_message(channel_id, &message.id).is_empty() {
        debug!(channel_id = %channel_id, message_id = %message.id, "Duplicate message suppressed");
        return Mutation::Duplicate;
    }
    let mut message = transform_message(message.clone());
    if message.channel_id.is_none() {
        message.channel_id = Some(channel_id.to_string());
    }
    match cache.page_mut(channel_id, window) {
        Some(page) => {
            page.messages.push(message);
            Mutation::Appended { window }
        }
        None => Mutation::ChannelNotCached,
    }
}

fn patch_message<F>(
    cache: &mut QueryCache,
    channel_id: &str,
    message_id: &str,
    mut patch: F,
) -> Mutation
where
    F: FnMut(&mut Message) -> bool,
{
    if cache.locate(channel_id).is_none() {
        return Mutation::ChannelNotCached;
    }
    let windows = cache.locate_message(channel_id, message_id);
    if windows.is_empty() {
        debug!(channel_id = %channel_id, message_id = %message_id, "Message not cached, skipping patch");
        return Mutation::MessageNotCached;
    }
    let mut changed = Vec::new();
    for window in windows {
        let patched = cache
            .page_mut(channel_id, window)
            .and_then(|page| page.message_mut(message_id))
            .is_some_and(&mut patch);
        if patched {
            changed.push(window);
        }
    }
    if changed.is_empty() {
        Mutation::Unchanged
    } else {
        Mutation::Patched { windows: changed }
    }
}

fn patch_reaction(
    cache: &mut QueryCache,
    change: &ReactionChange,
    op: fn(&mut Message, &str, &str) -> bool,
) -> Mutation {
    patch_message(cache, &change.channel_id, &change.message_id, |m| {
        op(m, &change.emoji, &change.user_id)
    })
}

fn invalidate(cache: &mut QueryCache, tags: Vec<CacheTag>) -> Mutation {
    for tag in &tags {
        cache.invalidate(tag.clone());
    }
    Mutation::Invalidated { tags }
}
