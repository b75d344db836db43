//! Configuration module - persisted settings document
//!
//! This module provides functionality for:
//! - Loading and saving the settings document (`settings.json`)
//! - Default values for all settings
//! - Default on-disk locations
//!
//! # Module Structure
//!
//! - `defaults` - All default constant values
//! - `types` - The `Settings` document
//! - `loader` - File system loading and durable saving

mod defaults;
mod loader;
mod types;

pub use defaults::{
    DEFAULT_AUTO_PASTE_ON_CLICK, DEFAULT_HOTKEY_SLOTS, DEFAULT_NOTIFICATION_DURATION_MS,
    DEFAULT_PASTE_ON_HOTKEY, DEFAULT_REGISTRATION_TIMEOUT_MS,
};
pub use loader::{
    data_dir, default_settings_path, default_templates_path, load_settings, save_settings,
    LoadError,
};
pub(crate) use loader::write_atomically;
pub use types::Settings;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
