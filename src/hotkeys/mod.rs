//! Global hotkey registration.
//!
//! [`HotkeyRegistry`] is the only component that talks to the OS hotkey
//! facility. It keeps the live hook table in line with the binding store:
//! `reconcile` diffs declared bindings against live hooks, `unregister_all`
//! tears everything down.
//!
//! Each hook owns a callback built at registration time. The callback
//! captures a copy of the template id, so the OS callback thread never reads
//! shared binding state. A rebind takes effect at the next `reconcile`.

mod backend;
mod global;
mod registry;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;

use std::cell::Cell;
use std::sync::Arc;

pub use backend::{BackendError, HookHandle, HotkeyBackend, MemoryBackend};
pub use global::GlobalHotkeyBackend;
pub use registry::{HotkeyRegistry, ReconcileReport};

/// Callback attached to one live hook.
pub type HookCallback = Arc<dyn Fn() + Send + Sync>;

/// Receives the template id captured by the hook that fired.
pub type OnFire = Arc<dyn Fn(&str) + Send + Sync>;

thread_local! {
    static IN_HOOK_CALLBACK: Cell<bool> = const { Cell::new(false) };
}

/// True while the current thread is running a hook callback.
pub fn in_hook_callback() -> bool {
    IN_HOOK_CALLBACK.with(Cell::get)
}

/// Run a hook callback, marking the thread as inside hook delivery.
pub(crate) fn invoke_callback(callback: &HookCallback) {
    struct Reset(bool);
    impl Drop for Reset {
        fn drop(&mut self) {
            IN_HOOK_CALLBACK.with(|flag| flag.set(self.0));
        }
    }

    let _reset = Reset(IN_HOOK_CALLBACK.with(|flag| flag.replace(true)));
    callback();
}
