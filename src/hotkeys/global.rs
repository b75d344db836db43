//! OS hotkeys through the `global-hotkey` crate.
//!
//! Two threads back this facility:
//!
//! - the **owner** thread creates the `GlobalHotKeyManager`, executes every
//!   register/unregister call and pumps the platform event loop so the OS can
//!   deliver key presses;
//! - the **listener** thread drains `GlobalHotKeyEvent::receiver()` and runs
//!   the callback routed to the hotkey id once the combo is released.
//!
//! Callers never touch the manager directly. Each OS call is a command sent
//! to the owner and awaited with a timeout, so a wedged OS call surfaces as
//! [`BackendError::TimedOut`] instead of blocking the caller.

use global_hotkey::{
    hotkey::HotKey, Error as GlobalHotkeyError, GlobalHotKeyEvent, GlobalHotKeyManager,
    HotKeyState,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::backend::{BackendError, HookHandle, HotkeyBackend};
use super::{invoke_callback, HookCallback};
use crate::combo::Combo;
use crate::error::ResultExt;

/// How long the listener blocks before checking whether it should exit.
const LISTENER_POLL: Duration = Duration::from_millis(100);

type Routes = Arc<RwLock<HashMap<u32, HookCallback>>>;
type Reply = mpsc::Sender<Result<(), BackendError>>;

enum Command {
    Register { hotkey: HotKey, reply: Reply },
    Unregister { hotkey: HotKey, reply: Option<Reply> },
}

pub struct GlobalHotkeyBackend {
    commands: mpsc::Sender<Command>,
    routes: Routes,
    hotkeys: HashMap<u32, HotKey>,
    timeout: Duration,
}

impl GlobalHotkeyBackend {
    /// Start the owner and listener threads.
    ///
    /// Fails with [`BackendError::Unsupported`] when the platform has no
    /// global hotkey facility (for example, no display server) or the manager
    /// does not come up within `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, BackendError> {
        let (commands, command_rx) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        thread::Builder::new()
            .name("hotkey-owner".into())
            .spawn(move || run_owner(command_rx, ready_tx))
            .map_err(|e| BackendError::Unsupported(format!("failed to spawn hotkey thread: {}", e)))?;

        match ready_rx.recv_timeout(timeout) {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return Err(BackendError::Unsupported(reason)),
            Err(_) => {
                return Err(BackendError::Unsupported(
                    "hotkey manager did not start in time".into(),
                ))
            }
        }

        let routes: Routes = Arc::new(RwLock::new(HashMap::new()));
        let weak = Arc::downgrade(&routes);
        thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || run_listener(weak))
            .map_err(|e| {
                BackendError::Unsupported(format!("failed to spawn listener thread: {}", e))
            })?;

        info!(timeout_ms = timeout.as_millis() as u64, "Global hotkey backend started");
        Ok(Self {
            commands,
            routes,
            hotkeys: HashMap::new(),
            timeout,
        })
    }

    /// Send a command to the owner and wait for its reply.
    fn call(&self, make: impl FnOnce(Reply) -> Command) -> Result<(), BackendError> {
        let (reply, reply_rx) = mpsc::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| BackendError::Rejected("hotkey thread stopped".into()))?;
        match reply_rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(BackendError::TimedOut),
            Err(RecvTimeoutError::Disconnected) => {
                Err(BackendError::Rejected("hotkey thread stopped".into()))
            }
        }
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(
        &mut self,
        combo: &Combo,
        callback: HookCallback,
    ) -> Result<HookHandle, BackendError> {
        let hotkey = combo.to_hotkey().ok_or_else(|| {
            BackendError::Unsupported(format!("key '{}' cannot be a global hotkey", combo.key()))
        })?;
        let id = hotkey.id();

        // Route before the OS call so the first press is never dropped.
        self.routes.write().insert(id, callback);

        match self.call(|reply| Command::Register { hotkey, reply }) {
            Ok(()) => {
                self.hotkeys.insert(id, hotkey);
                debug!(combo = %combo, id, "Registered OS hotkey");
                Ok(HookHandle::new(u64::from(id)))
            }
            Err(e) => {
                self.routes.write().remove(&id);
                if e == BackendError::TimedOut {
                    // Queued after the register, so a late success is undone.
                    self.commands
                        .send(Command::Unregister {
                            hotkey,
                            reply: None,
                        })
                        .warn_on_err();
                }
                Err(e)
            }
        }
    }

    fn repoint(&mut self, handle: HookHandle, callback: HookCallback) {
        let Ok(id) = u32::try_from(handle.id()) else {
            return;
        };
        if let Some(route) = self.routes.write().get_mut(&id) {
            *route = callback;
        }
    }

    fn unregister(&mut self, handle: HookHandle) -> Result<(), BackendError> {
        let id = u32::try_from(handle.id())
            .map_err(|_| BackendError::Rejected("unknown hook handle".into()))?;

        // Waits for any in-flight delivery, since the listener holds a read
        // lock while running a callback.
        self.routes.write().remove(&id);

        let Some(hotkey) = self.hotkeys.remove(&id) else {
            return Ok(());
        };
        self.call(|reply| Command::Unregister {
            hotkey,
            reply: Some(reply),
        })
    }
}

fn run_owner(commands: mpsc::Receiver<Command>, ready: mpsc::SyncSender<Result<(), String>>) {
    let manager = match GlobalHotKeyManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            warn!(error = %e, "Global hotkey manager unavailable");
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut registered: HashMap<u32, HotKey> = HashMap::new();
    loop {
        match commands.recv_timeout(platform::PUMP_INTERVAL) {
            Ok(Command::Register { hotkey, reply }) => {
                let result = manager
                    .register(hotkey)
                    .map_err(|e| BackendError::Rejected(format_hotkey_error(&e)));
                if result.is_ok() {
                    registered.insert(hotkey.id(), hotkey);
                }
                let _ = reply.send(result);
            }
            Ok(Command::Unregister { hotkey, reply }) => {
                registered.remove(&hotkey.id());
                let result = manager
                    .unregister(hotkey)
                    .map_err(|e| BackendError::Rejected(format_hotkey_error(&e)));
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            debug!(error = %e, "Cleanup unregister failed");
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        platform::pump_events();
    }

    for (_, hotkey) in registered.drain() {
        if let Err(e) = manager.unregister(hotkey) {
            warn!(error = %e, "Failed to unregister hotkey on shutdown");
        }
    }
    debug!("Hotkey owner thread exiting");
}

fn run_listener(routes: Weak<RwLock<HashMap<u32, HookCallback>>>) {
    let receiver = GlobalHotKeyEvent::receiver();
    loop {
        let event = receiver.recv_timeout(LISTENER_POLL);
        let Some(routes) = routes.upgrade() else {
            break;
        };
        let Ok(event) = event else {
            continue;
        };
        if !fires_on(event.state) {
            continue;
        }

        let table = routes.read();
        match table.get(&event.id) {
            Some(callback) => {
                debug!(id = event.id, "Hotkey released");
                invoke_callback(callback);
            }
            None => debug!(id = event.id, "Event for unrouted hotkey ignored"),
        }
    }
    debug!("Hotkey listener thread exiting");
}

/// Callbacks run on release, so a paste is sent after the user has let go
/// of the combo's modifiers.
fn fires_on(state: HotKeyState) -> bool {
    state == HotKeyState::Released
}

fn format_hotkey_error(e: &GlobalHotkeyError) -> String {
    match e {
        GlobalHotkeyError::AlreadyRegistered(hk) => format!(
            "already registered by another application (ID: {})",
            hk.id()
        ),
        GlobalHotkeyError::FailedToRegister(msg) => {
            format!("system rejected the shortcut: {}", msg)
        }
        GlobalHotkeyError::OsError(os_err) => format!("OS error: {}", os_err),
        other => other.to_string(),
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use std::time::Duration;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    };

    pub const PUMP_INTERVAL: Duration = Duration::from_millis(10);

    /// Drain this thread's message queue; hotkey messages arrive here.
    pub fn pump_events() {
        let mut msg = MSG::default();
        // SAFETY: the queue belongs to this thread and `msg` outlives each call.
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop};
    use std::time::Duration;

    pub const PUMP_INTERVAL: Duration = Duration::from_millis(10);

    /// Spin this thread's run loop briefly so Carbon can deliver events.
    pub fn pump_events() {
        // SAFETY: reading an immutable CoreFoundation constant.
        let mode = unsafe { kCFRunLoopDefaultMode };
        CFRunLoop::run_in_mode(mode, Duration::from_millis(10), true);
    }
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
mod platform {
    use std::time::Duration;

    // X11 delivery runs on the crate's own thread.
    pub const PUMP_INTERVAL: Duration = Duration::from_millis(50);

    pub fn pump_events() {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callbacks_fire_on_release_only() {
        assert!(fires_on(HotKeyState::Released));
        assert!(!fires_on(HotKeyState::Pressed));
    }
}
