//! Paste keystroke synthesis.
//!
//! After a template is on the clipboard, the platform paste shortcut is sent
//! to whatever application has focus. This is best-effort: input synthesis can
//! be missing (no input driver, headless session) or blocked by the OS.
//!
//! ## Permissions
//!
//! On macOS this requires Accessibility permission in System Settings >
//! Privacy & Security > Accessibility.

use parking_lot::Mutex;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Delay between the clipboard write and the keystroke, so the clipboard
/// owner has published the new text before the target app reads it.
const CLIPBOARD_SETTLE_DELAY: Duration = Duration::from_millis(10);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasteError {
    #[error("paste synthesis unavailable: {0}")]
    Unavailable(String),
    #[error("paste keystroke denied: {0}")]
    Denied(String),
}

/// Sends the platform paste keystroke to the focused application.
pub trait PasteSynthesizer: Send + Sync {
    fn simulate(&self) -> Result<(), PasteError>;
}

/// Paste through the OS input APIs.
#[derive(Debug, Default)]
pub struct SystemPaste;

impl PasteSynthesizer for SystemPaste {
    #[instrument(skip_all)]
    fn simulate(&self) -> Result<(), PasteError> {
        thread::sleep(CLIPBOARD_SETTLE_DELAY);
        platform::simulate_paste()?;
        debug!("Simulated paste keystroke");
        Ok(())
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::PasteError;
    use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
    use macos_accessibility_client::accessibility;
    use std::thread;
    use std::time::Duration;

    // 'v' key is keycode 9 on macOS
    const KEY_V: CGKeyCode = 9;

    /// Cmd+V through Core Graphics events.
    pub fn simulate_paste() -> Result<(), PasteError> {
        if !accessibility::application_is_trusted() {
            return Err(PasteError::Denied(
                "Accessibility permission required".to_string(),
            ));
        }

        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| PasteError::Unavailable("failed to create CGEventSource".into()))?;

        let key_down = CGEvent::new_keyboard_event(source.clone(), KEY_V, true)
            .map_err(|_| PasteError::Unavailable("failed to create key down event".into()))?;
        key_down.set_flags(CGEventFlags::CGEventFlagCommand);

        let key_up = CGEvent::new_keyboard_event(source, KEY_V, false)
            .map_err(|_| PasteError::Unavailable("failed to create key up event".into()))?;
        key_up.set_flags(CGEventFlags::CGEventFlagCommand);

        key_down.post(CGEventTapLocation::HID);
        thread::sleep(Duration::from_millis(5));
        key_up.post(CGEventTapLocation::HID);
        Ok(())
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use super::PasteError;
    use enigo::{Direction, Enigo, Key, Keyboard, Settings};

    /// Ctrl+V through enigo.
    pub fn simulate_paste() -> Result<(), PasteError> {
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| PasteError::Unavailable(e.to_string()))?;

        enigo
            .key(Key::Control, Direction::Press)
            .map_err(|e| PasteError::Denied(e.to_string()))?;
        let clicked = enigo
            .key(Key::Unicode('v'), Direction::Click)
            .map_err(|e| PasteError::Denied(e.to_string()));
        // Always release the modifier, even if the click failed.
        let released = enigo
            .key(Key::Control, Direction::Release)
            .map_err(|e| PasteError::Denied(e.to_string()));
        clicked.and(released)
    }
}

/// Paste synthesizer with a fixed outcome, counting attempts.
#[derive(Debug, Default)]
pub struct ScriptedPaste {
    outcome: Mutex<Option<PasteError>>,
    attempts: Mutex<usize>,
}

impl ScriptedPaste {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(error: PasteError) -> Self {
        Self {
            outcome: Mutex::new(Some(error)),
            attempts: Mutex::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl PasteSynthesizer for ScriptedPaste {
    fn simulate(&self) -> Result<(), PasteError> {
        *self.attempts.lock() += 1;
        match self.outcome.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
