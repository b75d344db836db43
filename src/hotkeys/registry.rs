use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::backend::{BackendError, HookHandle, HotkeyBackend};
use super::global::GlobalHotkeyBackend;
use super::{in_hook_callback, HookCallback, OnFire};
use crate::bindings::Binding;
use crate::combo::Combo;
use crate::error::HotkeyError;

/// What one `reconcile` pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub registered: Vec<Combo>,
    pub unregistered: Vec<Combo>,
    pub repointed: Vec<Combo>,
    pub failures: Vec<HotkeyError>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.registered.is_empty()
            && self.unregistered.is_empty()
            && self.repointed.is_empty()
            && self.failures.is_empty()
    }
}

struct LiveHook {
    handle: HookHandle,
    template_id: String,
}

/// Owns every live OS hook and keeps them in line with declared bindings.
pub struct HotkeyRegistry {
    backend: Option<Box<dyn HotkeyBackend>>,
    unavailable_reason: String,
    unavailable_reported: bool,
    live: BTreeMap<Combo, LiveHook>,
}

impl HotkeyRegistry {
    pub fn new(backend: Box<dyn HotkeyBackend>) -> Self {
        Self {
            backend: Some(backend),
            unavailable_reason: String::new(),
            unavailable_reported: false,
            live: BTreeMap::new(),
        }
    }

    /// A registry for a platform without global hotkeys.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: None,
            unavailable_reason: reason.into(),
            unavailable_reported: false,
            live: BTreeMap::new(),
        }
    }

    /// Probe the OS facility once, falling back to an unavailable registry.
    pub fn detect(timeout: Duration) -> Self {
        match GlobalHotkeyBackend::new(timeout) {
            Ok(backend) => Self::new(Box::new(backend)),
            Err(e) => {
                warn!(error = %e, "Global hotkeys unavailable");
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        (!self.is_available()).then_some(self.unavailable_reason.as_str())
    }

    /// Combos with a live hook, in canonical order.
    pub fn live_combos(&self) -> Vec<Combo> {
        self.live.keys().cloned().collect()
    }

    /// Template id captured by the live hook on `combo`.
    pub fn live_target(&self, combo: &Combo) -> Option<&str> {
        self.live.get(combo).map(|hook| hook.template_id.as_str())
    }

    /// Make the live hooks equal the bound entries of `bindings`.
    ///
    /// Stale hooks are removed, hooks whose target changed are repointed
    /// without touching the OS, and new combos are registered. A combo that
    /// fails to register is reported and skipped; the rest still proceed.
    #[instrument(skip_all, fields(declared = bindings.len()))]
    pub fn reconcile(&mut self, bindings: &[Binding], on_fire: &OnFire) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        if in_hook_callback() {
            error!("reconcile called from a hotkey callback; ignoring");
            return report;
        }

        let Some(backend) = self.backend.as_mut() else {
            if !self.unavailable_reported {
                self.unavailable_reported = true;
                report.failures.push(HotkeyError::CapabilityUnavailable(
                    self.unavailable_reason.clone(),
                ));
            }
            return report;
        };

        let desired: BTreeMap<&Combo, &str> = bindings
            .iter()
            .filter_map(|b| b.template_id.as_deref().map(|id| (&b.combo, id)))
            .collect();

        let stale: Vec<Combo> = self
            .live
            .keys()
            .filter(|combo| !desired.contains_key(combo))
            .cloned()
            .collect();
        for combo in stale {
            if let Some(hook) = self.live.remove(&combo) {
                if let Err(e) = backend.unregister(hook.handle) {
                    warn!(combo = %combo, error = %e, "OS unregister failed; hook dropped");
                }
                report.unregistered.push(combo);
            }
        }

        for (combo, template_id) in desired {
            match self.live.get_mut(combo) {
                Some(hook) if hook.template_id == template_id => {}
                Some(hook) => {
                    backend.repoint(hook.handle, make_callback(on_fire, template_id));
                    hook.template_id = template_id.to_string();
                    report.repointed.push(combo.clone());
                }
                None => match backend.register(combo, make_callback(on_fire, template_id)) {
                    Ok(handle) => {
                        self.live.insert(
                            combo.clone(),
                            LiveHook {
                                handle,
                                template_id: template_id.to_string(),
                            },
                        );
                        report.registered.push(combo.clone());
                    }
                    Err(e) => {
                        let failure = match e {
                            BackendError::TimedOut => {
                                HotkeyError::RegistrationTimedOut(combo.to_string())
                            }
                            other => HotkeyError::RegistrationFailed {
                                combo: combo.to_string(),
                                reason: other.to_string(),
                            },
                        };
                        warn!(combo = %combo, error = %failure, "Hotkey registration failed");
                        report.failures.push(failure);
                    }
                },
            }
        }

        if !report.is_noop() {
            info!(
                registered = report.registered.len(),
                unregistered = report.unregistered.len(),
                repointed = report.repointed.len(),
                failures = report.failures.len(),
                live = self.live.len(),
                "Reconciled hotkeys"
            );
        }
        report
    }

    /// Remove every live hook. Safe to call repeatedly.
    pub fn unregister_all(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        if self.live.is_empty() {
            return;
        }
        let count = self.live.len();
        for (combo, hook) in std::mem::take(&mut self.live) {
            if let Err(e) = backend.unregister(hook.handle) {
                warn!(combo = %combo, error = %e, "OS unregister failed during teardown");
            }
        }
        debug!(count, "Unregistered all hotkeys");
    }
}

impl Drop for HotkeyRegistry {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

/// The callback captures its own copy of the id; nothing shared is read at
/// fire time.
fn make_callback(on_fire: &OnFire, template_id: &str) -> HookCallback {
    let on_fire = Arc::clone(on_fire);
    let template_id: Arc<str> = Arc::from(template_id);
    Arc::new(move || on_fire(&*template_id))
}
