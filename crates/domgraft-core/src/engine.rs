//! Patch engine.
//!
//! Turns patch descriptors into mounted components and keeps them in sync
//! with a document that keeps re-rendering underneath them:
//!
//! - an initial scan mounts whatever already matches;
//! - live patches subscribe to mutations and re-evaluate on every batch,
//!   mounting new matches and tearing down mounts whose element went away;
//! - `remove()` undoes everything a plugin put into the document.
//!
//! User code (matchers, filters, resolvers, components) never runs while an
//! engine lock is held.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use domgraft_protocols::error::describe_panic;
use domgraft_protocols::{
    Document, MountContext, MutationNotifier, MutationRecord, NodeId, PatchError, UiEvent,
};

use crate::boundary::ErrorBoundary;
use crate::observer::{MutationObserverManager, ObserverCallback, ObserverSubscription};
use crate::patch::{MatchMode, PatchDescriptor};

#[path = "engine_mount.rs"]
mod engine_mount;
pub use engine_mount::{CONTAINER_ATTR, CONTAINER_CLASS};
use engine_mount::{create_container, MountRecord};

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

/// Per-plugin lifecycle in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchState {
    Unregistered,
    Applied,
    Removed,
}

struct PluginRuntime {
    state: PatchState,
    /// Changes on every apply so callbacks from an earlier apply are ignored.
    epoch: u64,
    patches: Vec<Arc<PatchDescriptor>>,
    mounts: BTreeMap<NodeId, MountRecord>,
    subscriptions: Vec<ObserverSubscription>,
    cancel: CancellationToken,
    debounce: Vec<Arc<AtomicU64>>,
}

impl PluginRuntime {
    fn new(epoch: u64, patches: Vec<Arc<PatchDescriptor>>) -> Self {
        let debounce = patches.iter().map(|_| Arc::new(AtomicU64::new(0))).collect();
        Self {
            state: PatchState::Applied,
            epoch,
            patches,
            mounts: BTreeMap::new(),
            subscriptions: Vec::new(),
            cancel: CancellationToken::new(),
            debounce,
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.state == PatchState::Applied && self.epoch == epoch
    }
}

struct EngineInner {
    document: Arc<dyn Document>,
    observers: MutationObserverManager,
    plugins: Mutex<HashMap<String, PluginRuntime>>,
    next_epoch: AtomicU64,
}

/// Sole owner of mount records. Cheap to clone.
#[derive(Clone)]
pub struct PatchEngine {
    inner: Arc<EngineInner>,
}

impl PatchEngine {
    pub fn new(document: Arc<dyn Document>, notifier: Arc<dyn MutationNotifier>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                document,
                observers: MutationObserverManager::new(notifier),
                plugins: Mutex::new(HashMap::new()),
                next_epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.inner.document
    }

    pub fn observers(&self) -> &MutationObserverManager {
        &self.inner.observers
    }

    /// Mount `plugin`'s patches and start watching for live ones.
    ///
    /// Applying an already applied plugin is a no-op. A patch whose selector
    /// does not parse fails the call before anything is mounted. If a
    /// subscription cannot be created, everything applied so far is removed
    /// again.
    pub fn apply(&self, plugin: &str, patches: &[Arc<PatchDescriptor>]) -> Result<(), PatchError> {
        for patch in patches {
            if let Err(e) = patch.validate(self.inner.document.as_ref()) {
                warn!(plugin = %plugin, selector = %patch.describe(), "Invalid patch: {}", e);
                return Err(e);
            }
        }
        let epoch = self.inner.next_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut plugins = self.inner.plugins.lock();
            if plugins
                .get(plugin)
                .is_some_and(|runtime| runtime.state == PatchState::Applied)
            {
                debug!(plugin = %plugin, "Plugin already applied");
                return Ok(());
            }
            plugins.insert(plugin.to_string(), PluginRuntime::new(epoch, patches.to_vec()));
        }
        info!(plugin = %plugin, patches = patches.len(), "Applying plugin");

        for (index, patch) in patches.iter().enumerate() {
            self.inner.process_patch(plugin, epoch, index);
            if patch.is_live() {
                if let Err(e) = self.inner.subscribe(plugin, epoch, index, patch) {
                    warn!(plugin = %plugin, selector = %patch.describe(), "Failed to observe: {}", e);
                    self.remove(plugin);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Tear down everything `plugin` mounted and release its subscriptions.
    ///
    /// Idempotent; a plugin that was never applied is a no-op.
    pub fn remove(&self, plugin: &str) {
        let (mounts, subscriptions) = {
            let mut plugins = self.inner.plugins.lock();
            match plugins.get_mut(plugin) {
                Some(runtime) if runtime.state == PatchState::Applied => {
                    runtime.state = PatchState::Removed;
                    runtime.cancel.cancel();
                    runtime.patches.clear();
                    runtime.debounce.clear();
                    (
                        std::mem::take(&mut runtime.mounts),
                        std::mem::take(&mut runtime.subscriptions),
                    )
                }
                _ => {
                    debug!(plugin = %plugin, "Plugin not applied, nothing to remove");
                    return;
                }
            }
        };

        for subscription in &subscriptions {
            subscription.disconnect();
        }
        drop(subscriptions);

        let count = mounts.len();
        let document = self.inner.document.as_ref();
        for (_, record) in mounts {
            record.teardown(document, plugin);
        }
        info!(plugin = %plugin, mounts = count, "Plugin removed");
    }

    /// Route `event` to the component whose container holds the event target.
    ///
    /// Returns whether a component handled it without error.
    pub fn dispatch_event(&self, event: &UiEvent) -> bool {
        let document = self.inner.document.as_ref();
        let found = {
            let plugins = self.inner.plugins.lock();
            let mut current = Some(event.target);
            let mut found = None;
            while let Some(node) = current {
                found = plugins.iter().find_map(|(name, runtime)| {
                    runtime
                        .mounts
                        .values()
                        .find(|record| record.container == node)
                        .map(|record| (name.clone(), record.boundary.clone()))
                });
                if found.is_some() {
                    break;
                }
                current = document.parent(node);
            }
            found
        };

        match found {
            Some((plugin, boundary)) => {
                trace!(plugin = %plugin, event = %event.name, "Dispatching event");
                boundary.lock().handle_event(document, event)
            }
            None => {
                debug!(node = %event.target, event = %event.name, "No mounted component for event");
                false
            }
        }
    }

    pub fn state(&self, plugin: &str) -> PatchState {
        self.inner
            .plugins
            .lock()
            .get(plugin)
            .map(|runtime| runtime.state)
            .unwrap_or(PatchState::Unregistered)
    }

    pub fn mount_count(&self, plugin: &str) -> usize {
        self.inner
            .plugins
            .lock()
            .get(plugin)
            .map(|runtime| runtime.mounts.len())
            .unwrap_or(0)
    }

    pub fn total_mounts(&self) -> usize {
        self.inner
            .plugins
            .lock()
            .values()
            .map(|runtime| runtime.mounts.len())
            .sum()
    }

    /// Anchors `plugin` is mounted at, in node order.
    pub fn mounted_anchors(&self, plugin: &str) -> Vec<NodeId> {
        self.inner
            .plugins
            .lock()
            .get(plugin)
            .map(|runtime| runtime.mounts.keys().copied().collect())
            .unwrap_or_default()
    }

    /// The container mounted for `plugin` at `anchor`.
    pub fn container_of(&self, plugin: &str, anchor: NodeId) -> Option<NodeId> {
        self.inner
            .plugins
            .lock()
            .get(plugin)
            .and_then(|runtime| runtime.mounts.get(&anchor))
            .map(|record| record.container)
    }

    /// Anchors whose component is showing the fallback.
    pub fn failed_mounts(&self, plugin: &str) -> Vec<NodeId> {
        self.inner
            .plugins
            .lock()
            .get(plugin)
            .map(|runtime| {
                runtime
                    .mounts
                    .values()
                    .filter(|record| record.boundary.lock().is_failed())
                    .map(|record| record.anchor)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove every plugin and disconnect every observer.
    pub fn shutdown(&self) {
        let applied: Vec<String> = self
            .inner
            .plugins
            .lock()
            .iter()
            .filter(|(_, runtime)| runtime.state == PatchState::Applied)
            .map(|(name, _)| name.clone())
            .collect();
        for plugin in &applied {
            self.remove(plugin);
        }
        self.inner.observers.disconnect_all();
        info!(plugins = applied.len(), "Patch engine shut down");
    }
}

impl EngineInner {
    fn subscribe(
        self: &Arc<Self>,
        plugin: &str,
        epoch: u64,
        index: usize,
        patch: &PatchDescriptor,
    ) -> Result<(), PatchError> {
        let weak = Arc::downgrade(self);
        let name = plugin.to_string();
        let callback: ObserverCallback = Arc::new(move |records: &[MutationRecord]| {
            match weak.upgrade() {
                Some(inner) => inner.on_mutations(&name, epoch, index, records),
                None => Ok(()),
            }
        });

        let subscription =
            self.observers
                .create_observer(self.document.root(), patch.observe.clone(), callback);
        subscription.observe()?;

        let stale = {
            let mut plugins = self.plugins.lock();
            match plugins.get_mut(plugin) {
                Some(runtime) if runtime.is_current(epoch) => {
                    runtime.subscriptions.push(subscription);
                    None
                }
                _ => Some(subscription),
            }
        };
        // Removed while subscribing; dropping the handle releases it.
        drop(stale);
        Ok(())
    }

    fn on_mutations(
        self: &Arc<Self>,
        plugin: &str,
        epoch: u64,
        index: usize,
        records: &[MutationRecord],
    ) -> Result<(), PatchError> {
        let (debounce, cancel, generation) = {
            let plugins = self.plugins.lock();
            let Some(runtime) = plugins.get(plugin).filter(|r| r.is_current(epoch)) else {
                return Ok(());
            };
            let Some(patch) = runtime.patches.get(index) else {
                return Ok(());
            };
            (
                patch.debounce,
                runtime.cancel.clone(),
                runtime.debounce[index].clone(),
            )
        };
        trace!(plugin = %plugin, patch = index, records = records.len(), "Mutations observed");

        match debounce {
            None => self.process_patch(plugin, epoch, index),
            Some(window) => self.schedule(plugin, epoch, index, window, cancel, generation),
        }
        Ok(())
    }

    /// Restart the debounce window for one patch.
    fn schedule(
        self: &Arc<Self>,
        plugin: &str,
        epoch: u64,
        index: usize,
        window: Duration,
        cancel: CancellationToken,
        generation: Arc<AtomicU64>,
    ) {
        let ticket = generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(plugin = %plugin, "No Tokio runtime for debounced patch, processing now");
                self.process_patch(plugin, epoch, index);
                return;
            }
        };

        let weak = Arc::downgrade(self);
        let name = plugin.to_string();
        handle.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(window) => {
                    if generation.load(Ordering::SeqCst) != ticket {
                        return;
                    }
                    if let Some(inner) = weak.upgrade() {
                        inner.process_patch(&name, epoch, index);
                    }
                }
            }
        });
    }

    /// Re-evaluate one patch against the current document.
    fn process_patch(&self, plugin: &str, epoch: u64, index: usize) {
        let (patch, existing, owned) = {
            let plugins = self.plugins.lock();
            let Some(runtime) = plugins.get(plugin).filter(|r| r.is_current(epoch)) else {
                return;
            };
            let Some(patch) = runtime.patches.get(index).cloned() else {
                return;
            };
            let existing: Vec<(NodeId, NodeId, NodeId)> = runtime
                .mounts
                .values()
                .filter(|record| record.patch == index)
                .map(|record| (record.anchor, record.matched, record.container))
                .collect();
            let owned: HashSet<NodeId> = plugins
                .values()
                .flat_map(|runtime| runtime.mounts.values())
                .flat_map(|record| record.owned_nodes())
                .collect();
            (patch, existing, owned)
        };

        let document = self.document.as_ref();
        let candidates = match self.candidates(plugin, &patch, &owned) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(plugin = %plugin, selector = %patch.describe(), "Patch evaluation failed: {}", e);
                return;
            }
        };

        let stale: Vec<NodeId> = existing
            .iter()
            .filter(|(anchor, matched, container)| {
                !document.is_connected(*anchor)
                    || !document.is_connected(*matched)
                    || !document.is_connected(*container)
                    || !candidates.contains(matched)
            })
            .map(|(anchor, _, _)| *anchor)
            .collect();

        if !stale.is_empty() {
            let removed: Vec<MountRecord> = {
                let mut plugins = self.plugins.lock();
                match plugins.get_mut(plugin).filter(|r| r.is_current(epoch)) {
                    Some(runtime) => stale
                        .iter()
                        .filter_map(|anchor| runtime.mounts.remove(anchor))
                        .collect(),
                    None => Vec::new(),
                }
            };
            for record in removed {
                debug!(plugin = %plugin, anchor = %record.anchor, "Match disappeared, unmounting");
                record.teardown(document, plugin);
            }
        }

        let kept: HashSet<NodeId> = existing
            .iter()
            .filter(|(anchor, _, _)| !stale.contains(anchor))
            .map(|(_, matched, _)| *matched)
            .collect();
        let mut has_mount = !kept.is_empty();

        for matched in candidates {
            if patch.mode == MatchMode::First && has_mount {
                break;
            }
            if kept.contains(&matched) {
                continue;
            }
            match self.mount(plugin, epoch, index, &patch, matched) {
                Ok(true) => has_mount = true,
                Ok(false) => {}
                Err(e) => warn!(
                    plugin = %plugin,
                    selector = %patch.describe(),
                    node = %matched,
                    "Mount failed: {}", e
                ),
            }
        }
    }

    /// Current matches of `patch`, minus engine-owned nodes and filtered out ones.
    fn candidates(
        &self,
        plugin: &str,
        patch: &PatchDescriptor,
        owned: &HashSet<NodeId>,
    ) -> Result<Vec<NodeId>, PatchError> {
        let document = self.document.as_ref();
        let found = guarded(|| patch.matcher.find_all(document, document.root()))??;

        Ok(found
            .into_iter()
            .filter(|node| !self.is_engine_owned(*node, owned))
            .filter(|node| match guarded(|| patch.accepts(document, *node)) {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(plugin = %plugin, node = %node, "Patch filter failed: {}", e);
                    false
                }
            })
            .collect())
    }

    /// Whether `node` is, or sits inside, something the engine inserted.
    fn is_engine_owned(&self, node: NodeId, owned: &HashSet<NodeId>) -> bool {
        let document = self.document.as_ref();
        let mut current = Some(node);
        while let Some(id) = current {
            if owned.contains(&id) || document.attribute(id, CONTAINER_ATTR).is_some() {
                return true;
            }
            current = document.parent(id);
        }
        false
    }

    /// Mount one match. Returns whether a new record was created.
    fn mount(
        &self,
        plugin: &str,
        epoch: u64,
        index: usize,
        patch: &PatchDescriptor,
        matched: NodeId,
    ) -> Result<bool, PatchError> {
        let document = self.document.as_ref();

        let Some(anchor) = guarded(|| patch.resolve_anchor(document, matched))? else {
            debug!(plugin = %plugin, node = %matched, "Anchor resolved to nothing");
            return Ok(false);
        };
        if !document.is_connected(anchor) {
            debug!(plugin = %plugin, anchor = %anchor, "Anchor is detached");
            return Ok(false);
        }
        {
            let plugins = self.plugins.lock();
            match plugins.get(plugin).filter(|r| r.is_current(epoch)) {
                Some(runtime) if !runtime.mounts.contains_key(&anchor) => {}
                _ => return Ok(false),
            }
        }

        let reference = match &patch.parent {
            Some(resolve) => match guarded(|| resolve(document, anchor))? {
                Some(parent) => parent,
                None => {
                    debug!(plugin = %plugin, anchor = %anchor, "Parent resolved to nothing");
                    return Ok(false);
                }
            },
            None => anchor,
        };

        let container = create_container(document, plugin)?;
        document.insert(reference, container, patch.position)?;

        let ctx = MountContext::new(document, plugin, container, anchor, matched);
        let boundary = ErrorBoundary::mount(patch.component.as_ref(), &ctx);
        let (auxiliary, cleanups) = ctx.into_parts();
        let record = MountRecord {
            patch: index,
            anchor,
            matched,
            container,
            boundary: Arc::new(Mutex::new(boundary)),
            auxiliary,
            cleanups,
        };

        // The plugin may have been removed, or another pass may have mounted
        // the same anchor, while the component rendered.
        let rejected = {
            let mut plugins = self.plugins.lock();
            match plugins.get_mut(plugin).filter(|r| r.is_current(epoch)) {
                Some(runtime) if !runtime.mounts.contains_key(&anchor) => {
                    runtime.mounts.insert(anchor, record);
                    None
                }
                _ => Some(record),
            }
        };
        if let Some(record) = rejected {
            record.teardown(document, plugin);
            return Ok(false);
        }

        debug!(plugin = %plugin, anchor = %anchor, "Mounted");
        Ok(true)
    }
}

/// Run user code, turning a panic into [`PatchError::Panicked`].
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, PatchError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| PatchError::Panicked(describe_panic(payload.as_ref())))
}
