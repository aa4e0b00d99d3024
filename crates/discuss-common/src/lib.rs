pub mod errors;
pub mod id;
pub mod notifications;

pub use errors::{ConfigError, StompError, SyncError, TransportError};
pub use id::{
    deserialize_id, deserialize_id_list, deserialize_opt_id, id_from_value, normalize_id, SessionId,
};
pub use notifications::{Notification, NotificationLevel, NotificationQueue};

pub type Result<T> = std::result::Result<T, SyncError>;
