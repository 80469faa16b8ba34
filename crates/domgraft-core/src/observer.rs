//! Shared mutation observers.
//!
//! Every patch needs to hear about document changes, but most patches watch
//! the same thing (child list changes under the root). The manager keeps one
//! native observer per identical (target, options) pair and fans each batch
//! out to the subscriptions sharing it.

use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use domgraft_protocols::error::describe_panic;
use domgraft_protocols::{
    DomError, MutationCallback, MutationNotifier, MutationRecord, NodeId, ObserveOptions,
    ObserverToken, PatchError,
};

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;

/// Callback invoked with each delivered batch.
///
/// Errors and panics are caught and logged per invocation.
pub type ObserverCallback = Arc<dyn Fn(&[MutationRecord]) -> Result<(), PatchError> + Send + Sync>;

/// Identifies one subscription. Ordering follows creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObserverKey {
    target: NodeId,
    options: ObserveOptions,
}

struct SubscriptionEntry {
    key: ObserverKey,
    callback: ObserverCallback,
    active: bool,
}

struct SharedObserver {
    token: ObserverToken,
    subscribers: BTreeMap<SubscriptionId, ObserverCallback>,
}

#[derive(Default)]
struct ManagerState {
    next_id: u64,
    subscriptions: HashMap<SubscriptionId, SubscriptionEntry>,
    shared: HashMap<ObserverKey, SharedObserver>,
}

struct ManagerInner {
    notifier: Arc<dyn MutationNotifier>,
    state: Mutex<ManagerState>,
}

/// Owns every native observer it creates. Callers only hold
/// [`ObserverSubscription`] handles.
#[derive(Clone)]
pub struct MutationObserverManager {
    inner: Arc<ManagerInner>,
}

impl MutationObserverManager {
    pub fn new(notifier: Arc<dyn MutationNotifier>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                notifier,
                state: Mutex::new(ManagerState::default()),
            }),
        }
    }

    /// Create a subscription. Nothing is observed until [`ObserverSubscription::observe`].
    pub fn create_observer(
        &self,
        target: NodeId,
        options: ObserveOptions,
        callback: ObserverCallback,
    ) -> ObserverSubscription {
        let mut state = self.inner.state.lock();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.subscriptions.insert(
            id,
            SubscriptionEntry {
                key: ObserverKey { target, options },
                callback,
                active: false,
            },
        );
        ObserverSubscription {
            id,
            manager: Arc::downgrade(&self.inner),
        }
    }

    /// Disconnect every native observer and deactivate every subscription.
    ///
    /// Handles stay valid and may observe again.
    pub fn disconnect_all(&self) {
        let tokens: Vec<ObserverToken> = {
            let mut state = self.inner.state.lock();
            for entry in state.subscriptions.values_mut() {
                entry.active = false;
            }
            state.shared.drain().map(|(_, shared)| shared.token).collect()
        };
        for token in &tokens {
            self.inner.notifier.disconnect(*token);
        }
        debug!(native = tokens.len(), "Disconnected all observers");
    }

    /// Number of subscriptions currently observing.
    pub fn subscription_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .subscriptions
            .values()
            .filter(|entry| entry.active)
            .count()
    }

    /// Number of native observers currently connected through this manager.
    pub fn native_observer_count(&self) -> usize {
        self.inner.state.lock().shared.len()
    }
}

impl ManagerInner {
    fn observe(self: &Arc<Self>, id: SubscriptionId) -> Result<(), DomError> {
        let mut state = self.state.lock();
        let (key, callback) = match state.subscriptions.get(&id) {
            Some(entry) if entry.active => return Ok(()),
            Some(entry) => (entry.key.clone(), entry.callback.clone()),
            None => {
                return Err(DomError::Custom(format!(
                    "subscription {} has been released",
                    id.0
                )))
            }
        };

        if let Some(shared) = state.shared.get_mut(&key) {
            shared.subscribers.insert(id, callback);
        } else {
            // Delivery takes the state lock, so no batch for this key can be
            // dispatched before the subscriber below is recorded.
            let token = self
                .notifier
                .observe(key.target, &key.options, self.dispatcher(key.clone()))?;
            let mut subscribers = BTreeMap::new();
            subscribers.insert(id, callback);
            state.shared.insert(key.clone(), SharedObserver { token, subscribers });
            debug!(node = %key.target, "Native observer created");
        }

        if let Some(entry) = state.subscriptions.get_mut(&id) {
            entry.active = true;
        }
        Ok(())
    }

    fn disconnect(&self, id: SubscriptionId) {
        let token = {
            let mut state = self.state.lock();
            let key = match state.subscriptions.get_mut(&id) {
                Some(entry) if entry.active => {
                    entry.active = false;
                    entry.key.clone()
                }
                _ => return,
            };
            release(&mut state, &key, id)
        };
        if let Some(token) = token {
            self.notifier.disconnect(token);
        }
    }

    fn forget(&self, id: SubscriptionId) {
        let token = {
            let mut state = self.state.lock();
            let removed = state.subscriptions.remove(&id);
            match removed {
                Some(entry) if entry.active => release(&mut state, &entry.key, id),
                _ => None,
            }
        };
        if let Some(token) = token {
            self.notifier.disconnect(token);
        }
    }

    fn dispatcher(self: &Arc<Self>, key: ObserverKey) -> MutationCallback {
        let weak = Arc::downgrade(self);
        Arc::new(move |records: &[MutationRecord]| {
            if let Some(inner) = weak.upgrade() {
                inner.deliver(&key, records);
            }
        })
    }

    fn deliver(&self, key: &ObserverKey, records: &[MutationRecord]) {
        let subscribers: Vec<(SubscriptionId, ObserverCallback)> = {
            let state = self.state.lock();
            match state.shared.get(key) {
                Some(shared) => shared
                    .subscribers
                    .iter()
                    .map(|(id, callback)| (*id, callback.clone()))
                    .collect(),
                None => return,
            }
        };

        for (id, callback) in subscribers {
            // An earlier callback in this batch may have released this one.
            let still_active = self
                .state
                .lock()
                .subscriptions
                .get(&id)
                .is_some_and(|entry| entry.active);
            if !still_active {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| callback(records))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(subscription = id.0, "Observer callback failed: {}", e),
                Err(payload) => error!(
                    subscription = id.0,
                    "Observer callback panicked: {}",
                    describe_panic(payload.as_ref())
                ),
            }
        }
    }
}

/// Drop `id` from the shared observer for `key`. Returns the native token to
/// disconnect when `id` was the last subscriber.
fn release(state: &mut ManagerState, key: &ObserverKey, id: SubscriptionId) -> Option<ObserverToken> {
    let shared = state.shared.get_mut(key)?;
    if shared.subscribers.len() > 1 {
        shared.subscribers.remove(&id);
        return None;
    }
    let shared = state.shared.remove(key)?;
    debug!(node = %key.target, "Native observer released");
    Some(shared.token)
}

/// Handle to one subscription. Dropping it releases the subscription.
pub struct ObserverSubscription {
    id: SubscriptionId,
    manager: Weak<ManagerInner>,
}

impl ObserverSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Start receiving batches. Idempotent.
    pub fn observe(&self) -> Result<(), DomError> {
        match self.manager.upgrade() {
            Some(manager) => manager.observe(self.id),
            None => Err(DomError::Custom("observer manager was dropped".to_string())),
        }
    }

    /// Stop receiving batches. Idempotent.
    pub fn disconnect(&self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.manager.upgrade().is_some_and(|manager| {
            manager
                .state
                .lock()
                .subscriptions
                .get(&self.id)
                .is_some_and(|entry| entry.active)
        })
    }
}

impl Drop for ObserverSubscription {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.forget(self.id);
        }
    }
}

impl std::fmt::Debug for ObserverSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSubscription")
            .field("id", &self.id)
            .finish()
    }
}
