use thiserror::Error;
use tracing::warn;

use crate::clipboard::ClipboardError;
use crate::paste::PasteError;

/// Severity used for notifications and log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,    // informational
    Warning, // recoverable, feature degraded
    Error,   // operation failed
}

/// Failures of the global hotkey subsystem.
///
/// Per-combo variants are isolated: one combo failing never stops other
/// combos from registering in the same reconcile pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HotkeyError {
    #[error("could not register hotkey '{combo}': {reason}")]
    RegistrationFailed { combo: String, reason: String },

    #[error("registering hotkey '{0}' timed out")]
    RegistrationTimedOut(String),

    #[error("global hotkeys are unavailable: {0}")]
    CapabilityUnavailable(String),
}

impl HotkeyError {
    pub fn combo(&self) -> Option<&str> {
        match self {
            Self::RegistrationFailed { combo, .. } | Self::RegistrationTimedOut(combo) => {
                Some(combo)
            }
            Self::CapabilityUnavailable(_) => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::RegistrationFailed { .. } => Severity::Warning,
            Self::RegistrationTimedOut(_) => Severity::Warning,
            Self::CapabilityUnavailable(_) => Severity::Warning,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::RegistrationFailed { combo, reason } => {
                format!("Shortcut {} could not be registered: {}", combo, reason)
            }
            Self::RegistrationTimedOut(combo) => {
                format!("Shortcut {} did not register in time", combo)
            }
            Self::CapabilityUnavailable(_) => {
                "Global shortcuts are unavailable. Templates can still be copied from the list."
                    .to_string()
            }
        }
    }
}

/// Failures that abort a single dispatch.
///
/// Paste failures are not here: they degrade a dispatch to "copied only".
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

impl DispatchError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::TemplateNotFound(_) => Severity::Warning,
            Self::Clipboard(_) => Severity::Error,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::TemplateNotFound(_) => "Template no longer exists.".to_string(),
            Self::Clipboard(_) => "Could not access the clipboard; nothing was copied.".to_string(),
        }
    }
}

impl PasteError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable(_) => "Copied to clipboard. Automatic paste is unavailable.".into(),
            Self::Denied(_) => "Copied to clipboard. Automatic paste was blocked.".into(),
        }
    }
}

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
pub trait ResultExt<T> {
    /// Log as warning with caller location and return None.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_combo_errors_expose_their_combo() {
        let failed = HotkeyError::RegistrationFailed {
            combo: "ctrl+shift+t".into(),
            reason: "taken".into(),
        };
        assert_eq!(failed.combo(), Some("ctrl+shift+t"));
        assert_eq!(
            HotkeyError::RegistrationTimedOut("alt+f1".into()).combo(),
            Some("alt+f1")
        );
        assert_eq!(HotkeyError::CapabilityUnavailable("x".into()).combo(), None);
    }

    #[test]
    fn dispatch_error_severity() {
        assert_eq!(
            DispatchError::TemplateNotFound("abc".into()).severity(),
            Severity::Warning
        );
        let clipboard = DispatchError::from(ClipboardError::Unavailable("busy".into()));
        assert_eq!(clipboard.severity(), Severity::Error);
    }

    #[test]
    fn warn_on_err_returns_none_on_error() {
        let result: Result<u8, &str> = Err("boom");
        assert_eq!(result.warn_on_err(), None);
        let ok: Result<u8, &str> = Ok(3);
        assert_eq!(ok.warn_on_err(), Some(3));
    }
}
