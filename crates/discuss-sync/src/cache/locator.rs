//! Channel → page-window lookup backed by the cache's index.

use discuss_common::normalize_id;

use super::store::{PageWindow, QueryCache};

impl QueryCache {
    /// The newest cached window of a channel (lowest page number), or `None`
    /// when the channel's messages are not cached at all.
    pub fn locate(&self, channel_id: &str) -> Option<PageWindow> {
        let channel_id = normalize_id(channel_id)?;
        self.index
            .get(&channel_id)
            .and_then(|windows| windows.iter().next().copied())
    }

    /// Every cached window of a channel, in page order.
    pub fn locate_all(&self, channel_id: &str) -> Vec<PageWindow> {
        normalize_id(channel_id)
            .and_then(|id| self.index.get(&id))
            .map(|windows| windows.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Windows of a channel whose page holds `message_id`.
    pub fn locate_message(&self, channel_id: &str, message_id: &str) -> Vec<PageWindow> {
        self.locate_all(channel_id)
            .into_iter()
            .filter(|w| {
                self.page(channel_id, *w)
                    .is_some_and(|p| p.contains(message_id))
            })
            .collect()
    }
}
