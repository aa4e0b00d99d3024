//! Replaceable UI callbacks.
//!
//! The registry is independent of the subscription lifecycle: swapping a
//! callback never touches the transport.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::Message;
use crate::protocol::ServerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingUpdate {
    pub channel_id: String,
    pub user_id: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub user_id: String,
    pub is_online: bool,
    pub channel_id: Option<String>,
}

type MessageFn = Arc<dyn Fn(&Message) + Send + Sync>;
type TypingFn = Arc<dyn Fn(TypingUpdate) + Send + Sync>;
type StatusFn = Arc<dyn Fn(StatusUpdate) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&ServerError) + Send + Sync>;

#[derive(Default)]
struct Slots {
    on_message: Option<MessageFn>,
    on_typing_update: Option<TypingFn>,
    on_user_status_update: Option<StatusFn>,
    on_error: Option<ErrorFn>,
}

/// Cloneable handle; all clones share the same slots.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    slots: Arc<RwLock<Slots>>,
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.read();
        f.debug_struct("CallbackRegistry")
            .field("on_message", &slots.on_message.is_some())
            .field("on_typing_update", &slots.on_typing_update.is_some())
            .field("on_user_status_update", &slots.on_user_status_update.is_some())
            .field("on_error", &slots.on_error.is_some())
            .finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_on_message<F>(&self, f: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.write().on_message = Some(Arc::new(f));
    }

    pub fn set_on_typing_update<F>(&self, f: F)
    where
        F: Fn(TypingUpdate) + Send + Sync + 'static,
    {
        self.write().on_typing_update = Some(Arc::new(f));
    }

    pub fn set_on_user_status_update<F>(&self, f: F)
    where
        F: Fn(StatusUpdate) + Send + Sync + 'static,
    {
        self.write().on_user_status_update = Some(Arc::new(f));
    }

    pub fn set_on_error<F>(&self, f: F)
    where
        F: Fn(&ServerError) + Send + Sync + 'static,
    {
        self.write().on_error = Some(Arc::new(f));
    }

    pub fn clear_on_message(&self) {
        self.write().on_message = None;
    }

    pub fn clear_on_typing_update(&self) {
        self.write().on_typing_update = None;
    }

    pub fn clear_on_user_status_update(&self) {
        self.write().on_user_status_update = None;
    }

    pub fn clear_on_error(&self) {
        self.write().on_error = None;
    }

    pub fn clear_all(&self) {
        *self.write() = Slots::default();
    }

    // The callback is cloned out so the lock is released before it runs;
    // a callback may replace itself.

    pub(crate) fn emit_message(&self, message: &Message) -> bool {
        let cb = self.read().on_message.clone();
        cb.map(|cb| cb(message)).is_some()
    }

    pub(crate) fn emit_typing(&self, update: TypingUpdate) -> bool {
        let cb = self.read().on_typing_update.clone();
        cb.map(|cb| cb(update)).is_some()
    }

    pub(crate) fn emit_status(&self, update: StatusUpdate) -> bool {
        let cb = self.read().on_user_status_update.clone();
        cb.map(|cb| cb(update)).is_some()
    }

    pub(crate) fn emit_error(&self, error: &ServerError) -> bool {
        let cb = self.read().on_error.clone();
        cb.map(|cb| cb(error)).is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn emits_nothing_when_unset() {
        let registry = CallbackRegistry::new();
        assert!(!registry.emit_message(&Message::new("1", "x")));
        assert!(!registry.emit_error(&ServerError::default()));
    }

    #[test]
    fn replacing_a_callback_takes_effect_immediately() {
        let registry = CallbackRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&first);
        registry.set_on_message(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        registry.emit_message(&Message::new("1", "a"));

        let s = Arc::clone(&second);
        registry.set_on_message(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        registry.emit_message(&Message::new("2", "b"));

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_slots() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.clone().set_on_typing_update(move |u| {
            sink.lock().unwrap().push((u.user_id, u.is_typing));
        });
        assert!(registry.emit_typing(TypingUpdate {
            channel_id: "42".into(),
            user_id: "9".into(),
            is_typing: true,
        }));
        assert_eq!(*seen.lock().unwrap(), vec![("9".to_string(), true)]);

        registry.clear_on_typing_update();
        assert!(!registry.emit_typing(TypingUpdate {
            channel_id: "42".into(),
            user_id: "9".into(),
            is_typing: false,
        }));
    }

    #[test]
    fn callback_may_replace_itself() {
        let registry = CallbackRegistry::new();
        let inner = registry.clone();
        registry.set_on_error(move |_| {
            inner.clear_on_error();
        });
        assert!(registry.emit_error(&ServerError::default()));
        assert!(!registry.emit_error(&ServerError::default()));
    }

    #[test]
    fn clear_all_resets_every_slot() {
        let registry = CallbackRegistry::new();
        registry.set_on_user_status_update(|_| {});
        registry.set_on_message(|_| {});
        registry.clear_all();
        assert!(!registry.emit_status(StatusUpdate {
            user_id: "1".into(),
            is_online: true,
            channel_id: None,
        }));
        assert!(!registry.emit_message(&Message::new("1", "x")));
    }
}
