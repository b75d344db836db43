use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use super::{invoke_callback, HookCallback};
use crate::combo::Combo;

/// Why the OS refused or failed to act on a single hook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0}")]
    Rejected(String),
    #[error("OS call timed out")]
    TimedOut,
    #[error("not supported: {0}")]
    Unsupported(String),
}

/// Opaque token for one live OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookHandle(u64);

impl HookHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The OS hook facility, as seen by [`super::HotkeyRegistry`].
pub trait HotkeyBackend: Send {
    /// Register `combo` and route its key presses to `callback`.
    fn register(&mut self, combo: &Combo, callback: HookCallback)
        -> Result<HookHandle, BackendError>;

    /// Swap the callback of a live hook without touching the OS hook table.
    fn repoint(&mut self, handle: HookHandle, callback: HookCallback);

    /// Remove a live hook. Its callback must not run after this returns.
    fn unregister(&mut self, handle: HookHandle) -> Result<(), BackendError>;
}

/// In-process hook table, for running without OS hooks.
///
/// Clones share state, so a caller can keep one clone to fire combos while
/// another is owned by the registry.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    hooks: BTreeMap<HookHandle, (Combo, HookCallback)>,
    rejected: BTreeSet<Combo>,
    timing_out: BTreeSet<Combo>,
    register_calls: usize,
    repoint_calls: usize,
}

static NEXT_MEMORY_HANDLE: AtomicU64 = AtomicU64::new(1);

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future registrations of `combo` fail as if another app owns it.
    pub fn reject(&self, combo: &Combo) {
        self.inner.lock().rejected.insert(combo.clone());
    }

    /// Make future registrations of `combo` time out.
    pub fn time_out(&self, combo: &Combo) {
        self.inner.lock().timing_out.insert(combo.clone());
    }

    /// Let `combo` register normally again.
    pub fn allow(&self, combo: &Combo) {
        let mut state = self.inner.lock();
        state.rejected.remove(combo);
        state.timing_out.remove(combo);
    }

    /// Simulate the user pressing `combo`. Returns false if no hook is live.
    pub fn fire(&self, combo: &Combo) -> bool {
        let callback = {
            let state = self.inner.lock();
            state
                .hooks
                .values()
                .find(|(c, _)| c == combo)
                .map(|(_, cb)| cb.clone())
        };
        match callback {
            Some(callback) => {
                invoke_callback(&callback);
                true
            }
            None => false,
        }
    }

    pub fn registered_combos(&self) -> BTreeSet<Combo> {
        self.inner
            .lock()
            .hooks
            .values()
            .map(|(combo, _)| combo.clone())
            .collect()
    }

    pub fn register_calls(&self) -> usize {
        self.inner.lock().register_calls
    }

    pub fn repoint_calls(&self) -> usize {
        self.inner.lock().repoint_calls
    }
}

impl HotkeyBackend for MemoryBackend {
    fn register(
        &mut self,
        combo: &Combo,
        callback: HookCallback,
    ) -> Result<HookHandle, BackendError> {
        let mut state = self.inner.lock();
        state.register_calls += 1;
        if state.timing_out.contains(combo) {
            return Err(BackendError::TimedOut);
        }
        if state.rejected.contains(combo) {
            return Err(BackendError::Rejected("already registered".into()));
        }
        if state.hooks.values().any(|(c, _)| c == combo) {
            return Err(BackendError::Rejected("already registered".into()));
        }
        let handle = HookHandle::new(NEXT_MEMORY_HANDLE.fetch_add(1, Ordering::Relaxed));
        state.hooks.insert(handle, (combo.clone(), callback));
        Ok(handle)
    }

    fn repoint(&mut self, handle: HookHandle, callback: HookCallback) {
        let mut state = self.inner.lock();
        state.repoint_calls += 1;
        if let Some(entry) = state.hooks.get_mut(&handle) {
            entry.1 = callback;
        }
    }

    fn unregister(&mut self, handle: HookHandle) -> Result<(), BackendError> {
        self.inner.lock().hooks.remove(&handle);
        Ok(())
    }
}
