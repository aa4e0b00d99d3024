//! Real-time message synchronization for the discuss chat module.
//!
//! A STOMP-over-WebSocket client receives server-pushed events and merges
//! them into a client-side paginated message cache that is also filled by
//! ordinary request/response calls.

pub mod cache;
pub mod callbacks;
pub mod commands;
pub mod dispatcher;
pub mod protocol;
pub mod session;
pub mod stomp;
pub mod subscriptions;
pub mod transport;

pub use cache::{
    CacheTag, CachedMessagePage, Message, Mutation, PageWindow, QueryCache, Reaction, SharedCache,
};
pub use callbacks::{CallbackRegistry, StatusUpdate, TypingUpdate};
pub use commands::{CommandSender, SendOutcome, SkipReason};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use protocol::{DecodeError, Destinations, ReactionChange, ServerError, ServerEvent};
pub use session::{DiscussSession, EventOutcome};
pub use subscriptions::SubscriptionManager;
pub use transport::{
    ConnectionState, StompClient, SubscriptionId, Transport, TransportConfig, TransportEvent,
};
