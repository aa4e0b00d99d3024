//! In-memory query cache for paginated message lists.
//!
//! Pages are inserted by the request/response layer and patched in place by
//! the mutator. Broader cache regions (channel metadata, presence) are not
//! stored here; they are only tracked as stale tags that the owning layer
//! drains and refetches.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use discuss_common::normalize_id;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::model::{transform_message, Message};

/// Shared handle to the cache. A single write lock per event keeps readers
/// from observing a half-applied mutation.
pub type SharedCache = Arc<RwLock<QueryCache>>;

/// Sentinel id of the channel-list cache entry.
pub const CHANNEL_LIST_ID: &str = "LIST";

/// Pagination window of a message query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl PageWindow {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }
}

impl fmt::Display for PageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page={} limit={}", self.page, self.limit)
    }
}

/// One cached message query result.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMessagePage {
    pub channel_id: String,
    pub window: PageWindow,
    pub messages: Vec<Message>,
}

impl CachedMessagePage {
    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.id.as_str()).collect()
    }
}

/// Cache regions that live outside the message pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheTag {
    /// Channel detail by id, or the channel list under [`CHANNEL_LIST_ID`].
    Channel(String),
    Presence,
}

impl CacheTag {
    pub fn channel_list() -> Self {
        Self::Channel(CHANNEL_LIST_ID.to_string())
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "Channel({id})"),
            Self::Presence => write!(f, "Presence"),
        }
    }
}

type PageKey = (String, PageWindow);

pub struct QueryCache {
    pages: HashMap<PageKey, CachedMessagePage>,
    /// channel id -> windows currently materialized for it.
    pub(super) index: HashMap<String, BTreeSet<PageWindow>>,
    stale: HashSet<CacheTag>,
    invalidations: broadcast::Sender<CacheTag>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("pages", &self.pages.len())
            .field("channels", &self.index.len())
            .field("stale", &self.stale)
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (invalidations, _) = broadcast::channel(64);
        Self {
            pages: HashMap::new(),
            index: HashMap::new(),
            stale: HashSet::new(),
            invalidations,
        }
    }

    pub fn shared(self) -> SharedCache {
        Arc::new(RwLock::new(self))
    }

    /// Store a fetched page, replacing any previous result for the same key.
    /// Messages are brought into the cached shape and duplicate ids dropped.
    /// Returns `false` when the channel id is blank.
    pub fn insert_page(
        &mut self,
        channel_id: &str,
        window: PageWindow,
        messages: Vec<Message>,
    ) -> bool {
        let Some(channel_id) = normalize_id(channel_id) else {
            return false;
        };
        let mut seen = HashSet::new();
        let messages: Vec<Message> = messages
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .map(transform_message)
            .collect();
        debug!(channel_id = %channel_id, %window, count = messages.len(), "Caching message page");
        self.index
            .entry(channel_id.clone())
            .or_default()
            .insert(window);
        self.pages.insert(
            (channel_id.clone(), window),
            CachedMessagePage {
                channel_id,
                window,
                messages,
            },
        );
        true
    }

    pub fn remove_page(&mut self, channel_id: &str, window: PageWindow) -> Option<CachedMessagePage> {
        let channel_id = normalize_id(channel_id)?;
        let removed = self.pages.remove(&(channel_id.clone(), window));
        if let Some(windows) = self.index.get_mut(&channel_id) {
            windows.remove(&window);
            if windows.is_empty() {
                self.index.remove(&channel_id);
            }
        }
        removed
    }

    /// Drop every cached window of a channel. Returns how many were removed.
    pub fn remove_channel(&mut self, channel_id: &str) -> usize {
        let Some(channel_id) = normalize_id(channel_id) else {
            return 0;
        };
        let Some(windows) = self.index.remove(&channel_id) else {
            return 0;
        };
        for window in &windows {
            self.pages.remove(&(channel_id.clone(), *window));
        }
        windows.len()
    }

    pub fn page(&self, channel_id: &str, window: PageWindow) -> Option<&CachedMessagePage> {
        let channel_id = normalize_id(channel_id)?;
        self.pages.get(&(channel_id, window))
    }

    pub fn page_mut(
        &mut self,
        channel_id: &str,
        window: PageWindow,
    ) -> Option<&mut CachedMessagePage> {
        let channel_id = normalize_id(channel_id)?;
        self.pages.get_mut(&(channel_id, window))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// First cached copy of a message, searching the channel's windows in order.
    pub fn message(&self, channel_id: &str, message_id: &str) -> Option<&Message> {
        self.locate_all(channel_id)
            .into_iter()
            .filter_map(|w| self.page(channel_id, w))
            .find_map(|p| p.messages.iter().find(|m| m.id == message_id))
    }

    /// Mark a region stale and notify subscribers. Every call is broadcast,
    /// even for a region that is already stale. Returns `true` when the tag
    /// was not yet in the stale set.
    pub fn invalidate(&mut self, tag: CacheTag) -> bool {
        let fresh = self.stale.insert(tag.clone());
        debug!(%tag, fresh, "Cache region invalidated");
        // No receivers is fine; the tag stays in the stale set.
        let _ = self.invalidations.send(tag);
        fresh
    }

    pub fn is_stale(&self, tag: &CacheTag) -> bool {
        self.stale.contains(tag)
    }

    /// Drain stale tags in a stable order so the refetching layer can act on them.
    pub fn take_stale(&mut self) -> Vec<CacheTag> {
        let mut tags: Vec<CacheTag> = self.stale.drain().collect();
        tags.sort();
        tags
    }

    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<CacheTag> {
        self.invalidations.subscribe()
    }
}
