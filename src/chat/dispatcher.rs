//! Listener registry for translated chat messages.
//!
//! Listeners are keyed by [`ListenerId`], one per registration. Dispatch
//! snapshots the registry and invokes each listener with no lock held, so
//! a listener may remove itself (or others) from inside its callback.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::identifiers::{IdAllocator, ListenerId};

use super::message::ChatMessage;

// ============================================================================
// Types
// ============================================================================

/// Chat message listener.
pub type Listener = Arc<dyn Fn(ChatMessage) + Send + Sync>;

#[derive(Default)]
struct Registry {
    listeners: FxHashMap<ListenerId, Listener>,
}

// ============================================================================
// MessageDispatcher
// ============================================================================

/// Fan-out of chat messages to registered listeners.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone, Default)]
pub struct MessageDispatcher {
    registry: Arc<Mutex<Registry>>,
    ids: Arc<IdAllocator>,
}

impl MessageDispatcher {
    /// Creates an empty dispatcher.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    ///
    /// The listener receives every message dispatched after this call.
    pub fn register<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(ChatMessage) + Send + Sync + 'static,
    {
        let id = self.ids.next_listener();
        self.registry.lock().listeners.insert(id, Arc::new(listener));

        trace!(%id, "Listener registered");

        ListenerHandle {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.registry.lock().listeners.remove(&id).is_some()
    }

    /// Delivers `message` to every listener registered at call time.
    ///
    /// Each listener receives its own copy, exactly once.
    pub fn dispatch(&self, message: &ChatMessage) {
        let snapshot: Vec<Listener> = self.registry.lock().listeners.values().cloned().collect();

        trace!(listeners = snapshot.len(), id = %message.id, "Dispatching message");

        for listener in snapshot {
            listener(message.clone());
        }
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.registry.lock().listeners.clear();
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.lock().listeners.len()
    }

    /// Returns `true` if no listener is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// ListenerHandle
// ============================================================================

/// Removal capability for one registered listener.
///
/// Dropping the handle does not remove the listener.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    id: ListenerId,
    registry: Weak<Mutex<Registry>>,
}

impl ListenerHandle {
    /// Returns the listener's ID.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Removes exactly this listener. Idempotent.
    pub fn remove(&self) {
        if let Some(registry) = self.registry.upgrade()
            && registry.lock().listeners.remove(&self.id).is_some()
        {
            trace!(id = %self.id, "Listener removed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
