//! Default configuration values
//!
//! All constants used throughout the config module are defined here.

/// Copy-and-paste when a template is used from the list (default: true)
pub const DEFAULT_AUTO_PASTE_ON_CLICK: bool = true;

/// Paste into the focused application when a global hotkey fires (default: true)
pub const DEFAULT_PASTE_ON_HOTKEY: bool = true;

/// Keep running in the tray when the window is closed (default: true)
pub const DEFAULT_MINIMIZE_TO_TRAY_ON_CLOSE: bool = true;

/// How long transient notifications stay visible
pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 1800;

/// Upper bound on a single OS hotkey registration call
pub const DEFAULT_REGISTRATION_TIMEOUT_MS: u64 = 2000;

/// Combos present (unbound) in a freshly created settings document.
pub const DEFAULT_HOTKEY_SLOTS: &[&str] = &["ctrl+shift+t", "ctrl+shift+q"];

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const TEMPLATES_FILE_NAME: &str = "templates.json";
pub const APP_DIR_NAME: &str = "snippet-hotkeys";
