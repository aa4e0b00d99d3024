//! Client-side message cache: storage, lookup and event-driven patching.

mod locator;
mod model;
mod mutator;
mod store;


pub use model::{transform_message, Message, Reaction, TOMBSTONE_TEXT};
pub use mutator::{apply, Mutation};
pub use store::{
    CacheTag, CachedMessagePage, PageWindow, QueryCache, SharedCache, CHANNEL_LIST_ID,
};
