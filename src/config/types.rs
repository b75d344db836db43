//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::defaults::*;

/// The persisted settings document.
///
/// `hotkeys` maps a combo string to a template id, or `null` when the combo
/// is known but currently unbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub hotkeys: BTreeMap<String, Option<String>>,
    #[serde(default = "default_auto_paste_on_click")]
    pub auto_paste_on_click: bool,
    #[serde(default = "default_paste_on_hotkey")]
    pub paste_on_hotkey: bool,
    #[serde(default = "default_minimize_to_tray_on_close")]
    pub minimize_to_tray_on_close: bool,
    #[serde(default = "default_notification_duration_ms")]
    pub notification_duration_ms: u64,
    #[serde(default = "default_registration_timeout_ms")]
    pub registration_timeout_ms: u64,
}

fn default_auto_paste_on_click() -> bool {
    DEFAULT_AUTO_PASTE_ON_CLICK
}
fn default_paste_on_hotkey() -> bool {
    DEFAULT_PASTE_ON_HOTKEY
}
fn default_minimize_to_tray_on_close() -> bool {
    DEFAULT_MINIMIZE_TO_TRAY_ON_CLOSE
}
fn default_notification_duration_ms() -> u64 {
    DEFAULT_NOTIFICATION_DURATION_MS
}
fn default_registration_timeout_ms() -> u64 {
    DEFAULT_REGISTRATION_TIMEOUT_MS
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            hotkeys: DEFAULT_HOTKEY_SLOTS
                .iter()
                .map(|combo| (combo.to_string(), None))
                .collect(),
            auto_paste_on_click: DEFAULT_AUTO_PASTE_ON_CLICK,
            paste_on_hotkey: DEFAULT_PASTE_ON_HOTKEY,
            minimize_to_tray_on_close: DEFAULT_MINIMIZE_TO_TRAY_ON_CLOSE,
            notification_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
            registration_timeout_ms: DEFAULT_REGISTRATION_TIMEOUT_MS,
        }
    }
}

impl Settings {
    pub fn registration_timeout(&self) -> Duration {
        Duration::from_millis(self.registration_timeout_ms.max(1))
    }
}
