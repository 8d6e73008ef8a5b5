//! Shared mute flag for every playback surface.
//!
//! [`MuteStore`] is created once per app and handed to each controller.
//! Changing the flag notifies every subscriber synchronously, inside the
//! same call, so neighbouring media elements never disagree. The flag
//! outlives any single video.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle returned by [`MuteStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Process-wide mute state with subscriber notification.
pub struct MuteStore {
    muted: RwLock<bool>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl MuteStore {
    pub fn new(muted: bool) -> Arc<Self> {
        Arc::new(Self {
            muted: RwLock::new(muted),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn is_muted(&self) -> bool {
        *self.muted.read()
    }

    /// Update the flag and notify every subscriber before returning.
    ///
    /// Returns `false` (and notifies nobody) when the value is unchanged.
    pub fn set_muted(&self, muted: bool) -> bool {
        {
            let mut current = self.muted.write();
            if *current == muted {
                return false;
            }
            *current = muted;
        }

        // Snapshot so listeners may subscribe/unsubscribe from inside the callback.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        tracing::debug!(muted, subscribers = listeners.len(), "Mute state changed");
        for listener in listeners {
            listener(muted);
        }
        true
    }

    /// Flip the flag; returns the new value.
    pub fn toggle(&self) -> bool {
        let next = !self.is_muted();
        self.set_muted(next);
        next
    }

    pub fn subscribe(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().retain(|(sid, _)| *sid != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn all_subscribers_see_change_in_same_call() {
        let store = MuteStore::new(true);
        let a = Arc::new(AtomicBool::new(true));
        let b = Arc::new(AtomicBool::new(true));
        let (a2, b2) = (Arc::clone(&a), Arc::clone(&b));
        store.subscribe(move |m| a2.store(m, Ordering::SeqCst));
        store.subscribe(move |m| b2.store(m, Ordering::SeqCst));

        assert!(store.set_muted(false));
        assert!(!a.load(Ordering::SeqCst));
        assert!(!b.load(Ordering::SeqCst));
        assert!(!store.is_muted());
    }

    #[test]
    fn unchanged_value_does_not_notify() {
        let store = MuteStore::new(false);
        let calls = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&calls);
        store.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!store.set_muted(false));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        store.toggle();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = MuteStore::new(false);
        let calls = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        store.unsubscribe(id);
        store.toggle();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let store = MuteStore::new(false);
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let inner_store = Arc::clone(&store);
        let inner_slot = Arc::clone(&slot);
        let id = store.subscribe(move |_| {
            if let Some(id) = inner_slot.lock().take() {
                inner_store.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);
        store.toggle();
        assert_eq!(store.subscriber_count(), 0);
    }
}
