//! Plugin registry.
//!
//! Holds plugin metadata and the user-facing enabled flag, persists the flag
//! and drives the engine's apply/remove. Transitions for one plugin name are
//! serialised; different plugins transition independently.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use domgraft_protocols::error::describe_panic;
use domgraft_protocols::storage::keys;
use domgraft_protocols::{PluginError, SettingsStore};

use crate::engine::PatchEngine;
use crate::plugin::{PluginContext, PluginDescriptor, PluginInfo};

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

struct PluginEntry {
    descriptor: Arc<PluginDescriptor>,
    enabled: bool,
}

pub struct PluginRegistry {
    engine: PatchEngine,
    settings: Arc<dyn SettingsStore>,
    plugins: RwLock<BTreeMap<String, PluginEntry>>,
    transitions: DashMap<String, Arc<Mutex<()>>>,
    started: AtomicBool,
}

impl PluginRegistry {
    pub fn new(engine: PatchEngine, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            engine,
            settings,
            plugins: RwLock::new(BTreeMap::new()),
            transitions: DashMap::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn engine(&self) -> &PatchEngine {
        &self.engine
    }

    /// Register a plugin. Names are unique; a duplicate is an error, never an
    /// overwrite. A descriptor with an invalid name or a selector that does
    /// not parse is rejected. After [`start`](Self::start) an enabled plugin
    /// is applied right away.
    pub fn register(&self, descriptor: PluginDescriptor) -> Result<(), PluginError> {
        descriptor.validate(self.engine.document().as_ref())?;
        let name = descriptor.name.clone();
        let enabled = self.persisted_flag(&name, descriptor.enabled_by_default);
        {
            let mut plugins = self.plugins.write();
            if plugins.contains_key(&name) {
                return Err(PluginError::AlreadyRegistered(name));
            }
            plugins.insert(
                name.clone(),
                PluginEntry {
                    descriptor: Arc::new(descriptor),
                    enabled: false,
                },
            );
        }
        debug!(plugin = %name, "Plugin registered");

        if self.started.load(Ordering::SeqCst) && enabled {
            let lock = self.transition_lock(&name);
            let _guard = lock.lock();
            self.activate_logged(&name);
        } else {
            self.set_flag(&name, enabled);
        }
        Ok(())
    }

    /// Register every descriptor, continuing past failures.
    pub fn register_all<I>(&self, descriptors: I) -> Vec<PluginError>
    where
        I: IntoIterator<Item = PluginDescriptor>,
    {
        descriptors
            .into_iter()
            .filter_map(|descriptor| {
                let name = descriptor.name.clone();
                self.register(descriptor)
                    .map_err(|e| {
                        warn!(plugin = %name, "Failed to register plugin: {}", e);
                        e
                    })
                    .err()
            })
            .collect()
    }

    /// Persist the flag, then apply or remove the plugin if the registry is
    /// running. Setting the current state again is a no-op.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), PluginError> {
        let lock = self.transition_lock(name);
        let _guard = lock.lock();

        let current = self
            .plugins
            .read()
            .get(name)
            .map(|entry| entry.enabled)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        if current == enabled {
            debug!(plugin = %name, enabled, "Plugin already in requested state");
            return Ok(());
        }

        self.settings.set_bool(&keys::plugin_enabled(name), enabled)?;

        if !self.started.load(Ordering::SeqCst) {
            self.set_flag(name, enabled);
            return Ok(());
        }
        if enabled {
            self.activate(name)
        } else {
            self.deactivate(name);
            Ok(())
        }
    }

    /// Whether the plugin is enabled; `false` for unknown names.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.plugins
            .read()
            .get(name)
            .is_some_and(|entry| entry.enabled)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// All plugins, sorted by name.
    pub fn list(&self) -> Vec<PluginInfo> {
        self.plugins
            .read()
            .values()
            .map(|entry| {
                let d = &entry.descriptor;
                PluginInfo {
                    name: d.name.clone(),
                    description: d.description.clone(),
                    authors: d.authors.clone(),
                    category: d.category,
                    tags: d.tags.clone(),
                    enabled: entry.enabled,
                    enabled_by_default: d.enabled_by_default,
                    patches: d.patches.len(),
                    mounts: self.engine.mount_count(&d.name),
                }
            })
            .collect()
    }

    /// Apply every enabled plugin. Returns how many were applied.
    ///
    /// A plugin that fails to start is logged and left disabled.
    pub fn start(&self) -> usize {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Plugin registry already started");
            return 0;
        }

        let enabled: Vec<String> = self
            .plugins
            .read()
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, _)| name.clone())
            .collect();
        info!(plugins = enabled.len(), "Starting plugins");

        let mut applied = 0;
        for name in &enabled {
            let lock = self.transition_lock(name);
            let _guard = lock.lock();
            // The in-memory flag only flips to true once the plugin is live.
            self.set_flag(name, false);
            if self.activate_logged(name) {
                applied += 1;
            }
        }
        applied
    }

    /// Remove every active plugin and shut the engine down. Persisted flags
    /// are left untouched.
    pub fn shutdown(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        let active: Vec<String> = self
            .plugins
            .read()
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &active {
            let lock = self.transition_lock(name);
            let _guard = lock.lock();
            self.deactivate(name);
            // Still enabled from the user's point of view.
            self.set_flag(name, true);
        }
        self.engine.shutdown();
        info!(plugins = active.len(), "Plugin registry shut down");
    }

    fn transition_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.transitions
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    fn descriptor(&self, name: &str) -> Option<Arc<PluginDescriptor>> {
        self.plugins
            .read()
            .get(name)
            .map(|entry| entry.descriptor.clone())
    }

    fn set_flag(&self, name: &str, enabled: bool) {
        if let Some(entry) = self.plugins.write().get_mut(name) {
            entry.enabled = enabled;
        }
    }

    fn persisted_flag(&self, name: &str, default: bool) -> bool {
        match self.settings.get_bool(&keys::plugin_enabled(name)) {
            Ok(Some(enabled)) => enabled,
            Ok(None) => default,
            Err(e) => {
                warn!(plugin = %name, "Unreadable enabled flag, using default: {}", e);
                default
            }
        }
    }

    fn activate_logged(&self, name: &str) -> bool {
        match self.activate(name) {
            Ok(()) => true,
            Err(e) => {
                error!(plugin = %name, "Failed to start plugin: {}", e);
                false
            }
        }
    }

    /// Run the start hook and apply the patches. On failure the plugin is
    /// rolled back and left disabled in memory.
    fn activate(&self, name: &str) -> Result<(), PluginError> {
        let descriptor = self
            .descriptor(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        let document = self.engine.document().clone();
        let ctx = PluginContext::new(name, document.as_ref(), self.settings.as_ref());

        if let Some(hooks) = &descriptor.hooks {
            if let Err(e) = run_hook(name, || hooks.start(&ctx)) {
                self.set_flag(name, false);
                return Err(e);
            }
        }

        if let Err(e) = self.engine.apply(name, &descriptor.patches) {
            if let Some(hooks) = &descriptor.hooks {
                if let Err(stop_err) = run_hook(name, || hooks.stop(&ctx)) {
                    warn!(plugin = %name, "Stop hook failed during rollback: {}", stop_err);
                }
            }
            self.set_flag(name, false);
            return Err(PluginError::HookFailed {
                plugin: name.to_string(),
                message: e.to_string(),
            });
        }

        self.set_flag(name, true);
        info!(plugin = %name, "Plugin enabled");
        Ok(())
    }

    /// Remove the patches, then run the stop hook. Hook errors are logged.
    fn deactivate(&self, name: &str) {
        self.engine.remove(name);
        if let Some(descriptor) = self.descriptor(name) {
            if let Some(hooks) = &descriptor.hooks {
                let document = self.engine.document().clone();
                let ctx = PluginContext::new(name, document.as_ref(), self.settings.as_ref());
                if let Err(e) = run_hook(name, || hooks.stop(&ctx)) {
                    warn!(plugin = %name, "Stop hook failed: {}", e);
                }
            }
        }
        self.set_flag(name, false);
        info!(plugin = %name, "Plugin disabled");
    }
}

/// Run a hook, mapping errors and panics to [`PluginError::HookFailed`].
fn run_hook<F>(name: &str, hook: F) -> Result<(), PluginError>
where
    F: FnOnce() -> Result<(), PluginError>,
{
    match catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(PluginError::HookFailed { plugin, message })) => {
            Err(PluginError::HookFailed { plugin, message })
        }
        Ok(Err(e)) => Err(PluginError::HookFailed {
            plugin: name.to_string(),
            message: e.to_string(),
        }),
        Err(payload) => Err(PluginError::HookFailed {
            plugin: name.to_string(),
            message: format!("panicked: {}", describe_panic(payload.as_ref())),
        }),
    }
}
