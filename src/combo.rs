//! Key-combination descriptors.
//!
//! A [`Combo`] is the normalized, order-independent form of a global shortcut
//! such as `ctrl+shift+t`. The canonical string is what the binding store uses
//! as its key, so `Shift+Ctrl+T` and `ctrl+shift+t` address the same binding.

use global_hotkey::hotkey::{Code, HotKey, Modifiers as HotkeyModifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing a combo string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComboParseError {
    #[error("combo string is empty")]
    Empty,
    #[error("combo has no key, only modifiers")]
    MissingKey,
    #[error("unexpected second key '{0}' in combo")]
    UnknownToken(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// Modifier keys held for a combo.
///
/// `cmd` is the platform meta key: Command on macOS, Windows/Super elsewhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub cmd: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.cmd || self.ctrl || self.alt || self.shift
    }

    fn to_hotkey_modifiers(self) -> HotkeyModifiers {
        let mut mods = HotkeyModifiers::empty();
        if self.cmd {
            mods |= HotkeyModifiers::META;
        }
        if self.ctrl {
            mods |= HotkeyModifiers::CONTROL;
        }
        if self.alt {
            mods |= HotkeyModifiers::ALT;
        }
        if self.shift {
            mods |= HotkeyModifiers::SHIFT;
        }
        mods
    }
}

/// A normalized global key combination: a modifier set plus one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combo {
    key: String,
    modifiers: ModifierBits,
}

// Ordered representation so combos can live in sorted maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct ModifierBits(u8);

impl From<Modifiers> for ModifierBits {
    fn from(m: Modifiers) -> Self {
        ModifierBits(
            (m.alt as u8) | ((m.cmd as u8) << 1) | ((m.ctrl as u8) << 2) | ((m.shift as u8) << 3),
        )
    }
}

impl Combo {
    pub fn new(key: &str, modifiers: Modifiers) -> Result<Self, ComboParseError> {
        let canonical = canonicalize_key(key);
        if !is_known_key(&canonical) {
            return Err(ComboParseError::UnknownKey(key.to_string()));
        }
        Ok(Self {
            key: canonical,
            modifiers: modifiers.into(),
        })
    }

    /// Parse a user-facing combo string.
    ///
    /// Tokens may be separated by `+` or whitespace and are case-insensitive.
    /// Exactly one non-modifier key is required.
    pub fn parse(s: &str) -> Result<Self, ComboParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ComboParseError::Empty);
        }

        let normalized = s.replace('+', " ");
        let parts: Vec<&str> = normalized.split_whitespace().collect();
        if parts.is_empty() {
            return Err(ComboParseError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut key_part: Option<&str> = None;

        for part in &parts {
            match part.to_lowercase().as_str() {
                "cmd" | "command" | "meta" | "super" | "win" | "⌘" => modifiers.cmd = true,
                "ctrl" | "control" | "ctl" | "^" => modifiers.ctrl = true,
                "alt" | "opt" | "option" | "⌥" => modifiers.alt = true,
                "shift" | "shft" | "⇧" => modifiers.shift = true,
                _ => {
                    if key_part.is_some() {
                        return Err(ComboParseError::UnknownToken(part.to_string()));
                    }
                    key_part = Some(part);
                }
            }
        }

        let key = key_part.ok_or(ComboParseError::MissingKey)?;
        Self::new(key, modifiers)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn modifiers(&self) -> Modifiers {
        let bits = self.modifiers.0;
        Modifiers {
            alt: bits & 1 != 0,
            cmd: bits & 2 != 0,
            ctrl: bits & 4 != 0,
            shift: bits & 8 != 0,
        }
    }

    /// Canonical `alt+cmd+ctrl+shift+key` form used as the persistence key.
    pub fn to_canonical_string(&self) -> String {
        let modifiers = self.modifiers();
        let mut parts: Vec<&str> = Vec::new();
        if modifiers.alt {
            parts.push("alt");
        }
        if modifiers.cmd {
            parts.push("cmd");
        }
        if modifiers.ctrl {
            parts.push("ctrl");
        }
        if modifiers.shift {
            parts.push("shift");
        }
        parts.push(&self.key);
        parts.join("+")
    }

    /// Convert to the OS hotkey library's representation.
    ///
    /// Returns `None` for keys the hotkey library cannot register.
    pub fn to_hotkey(&self) -> Option<HotKey> {
        let code = key_code(&self.key)?;
        let mods = self.modifiers().to_hotkey_modifiers();
        Some(HotKey::new(if mods.is_empty() { None } else { Some(mods) }, code))
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl FromStr for Combo {
    type Err = ComboParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Combo::parse(s)
    }
}

/// Canonicalize a key name to the internal standard form.
pub fn canonicalize_key(key: &str) -> String {
    let key_lower = key.to_lowercase();
    match key_lower.as_str() {
        "arrowup" | "uparrow" => "up",
        "arrowdown" | "downarrow" => "down",
        "arrowleft" | "leftarrow" => "left",
        "arrowright" | "rightarrow" => "right",
        "return" => "enter",
        "esc" => "escape",
        "back" => "backspace",
        "del" => "delete",
        "/" | "forwardslash" => "slash",
        "\\" => "backslash",
        ";" => "semicolon",
        "'" | "apostrophe" => "quote",
        "," => "comma",
        "." | "dot" => "period",
        "[" | "leftbracket" => "bracketleft",
        "]" | "rightbracket" => "bracketright",
        "-" | "dash" | "hyphen" => "minus",
        "=" | "equals" => "equal",
        "`" | "backtick" | "grave" => "backquote",
        "pgup" => "pageup",
        "pgdn" | "pgdown" => "pagedown",
        _ => return canonical_function_key(&key_lower).unwrap_or(key_lower),
    }
    .to_string()
}

/// `f01` and `f1` name the same key.
fn canonical_function_key(key: &str) -> Option<String> {
    let digits = key.strip_prefix('f')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = digits.parse().ok()?;
    Some(format!("f{}", n))
}

/// Check if a canonical key name is known.
pub fn is_known_key(key: &str) -> bool {
    if key.len() == 1 {
        let c = key.as_bytes()[0];
        return c.is_ascii_lowercase() || c.is_ascii_digit();
    }
    if let Some(n) = key.strip_prefix('f') {
        if let Ok(n) = n.parse::<u8>() {
            return (1..=24).contains(&n);
        }
    }
    matches!(
        key,
        "space"
            | "enter"
            | "tab"
            | "escape"
            | "backspace"
            | "delete"
            | "insert"
            | "up"
            | "down"
            | "left"
            | "right"
            | "home"
            | "end"
            | "pageup"
            | "pagedown"
            | "semicolon"
            | "quote"
            | "comma"
            | "period"
            | "slash"
            | "backslash"
            | "bracketleft"
            | "bracketright"
            | "minus"
            | "equal"
            | "backquote"
    )
}

fn key_code(key: &str) -> Option<Code> {
    let code = match key {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "space" => Code::Space,
        "enter" => Code::Enter,
        "tab" => Code::Tab,
        "escape" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" => Code::Delete,
        "insert" => Code::Insert,
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "semicolon" => Code::Semicolon,
        "quote" => Code::Quote,
        "comma" => Code::Comma,
        "period" => Code::Period,
        "slash" => Code::Slash,
        "backslash" => Code::Backslash,
        "bracketleft" => Code::BracketLeft,
        "bracketright" => Code::BracketRight,
        "minus" => Code::Minus,
        "equal" => Code::Equal,
        "backquote" => Code::Backquote,
        // f13-f24 parse but are not registrable through the hotkey library
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_order_and_case_independent() {
        let a = Combo::parse("ctrl+shift+t").unwrap();
        let b = Combo::parse("Shift + CTRL + T").unwrap();
        assert_eq!(a, b);
        assert_eq!(b.to_canonical_string(), "ctrl+shift+t");
    }

    #[test]
    fn canonical_modifier_order() {
        let combo = Combo::parse("shift+cmd+alt+ctrl+k").unwrap();
        assert_eq!(combo.to_string(), "alt+cmd+ctrl+shift+k");
    }

    #[test]
    fn aliases_normalize() {
        let combo = Combo::parse("control option esc").unwrap();
        assert_eq!(combo.to_canonical_string(), "alt+ctrl+escape");
        assert_eq!(Combo::parse("win+pgdn").unwrap().to_string(), "cmd+pagedown");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Combo::parse(""), Err(ComboParseError::Empty));
        assert_eq!(Combo::parse("  +  "), Err(ComboParseError::Empty));
        assert_eq!(Combo::parse("ctrl+shift"), Err(ComboParseError::MissingKey));
        assert_eq!(
            Combo::parse("ctrl+a+b"),
            Err(ComboParseError::UnknownToken("b".to_string()))
        );
        assert_eq!(
            Combo::parse("ctrl+banana"),
            Err(ComboParseError::UnknownKey("banana".to_string()))
        );
        assert!(Combo::parse("f25").is_err());
    }

    #[test]
    fn key_without_modifiers_is_valid() {
        let combo = Combo::parse("F9").unwrap();
        assert!(!combo.modifiers().any());
        assert_eq!(combo.key(), "f9");
    }

    #[test]
    fn converts_to_os_hotkey() {
        let combo = Combo::parse("ctrl+shift+t").unwrap();
        let hotkey = combo.to_hotkey().expect("registrable");
        let expected = HotKey::new(
            Some(HotkeyModifiers::CONTROL | HotkeyModifiers::SHIFT),
            Code::KeyT,
        );
        assert_eq!(hotkey.id(), expected.id());
    }

    #[test]
    fn leading_zero_function_keys_canonicalize() {
        let padded = Combo::parse("ctrl+F01").unwrap();
        assert_eq!(padded, Combo::parse("ctrl+f1").unwrap());
        assert_eq!(padded.to_canonical_string(), "ctrl+f1");
        assert!(padded.to_hotkey().is_some());
        assert!(Combo::parse("ctrl+f00").is_err());
    }

    #[test]
    fn high_function_keys_are_not_registrable() {
        let combo = Combo::parse("ctrl+f20").unwrap();
        assert!(combo.to_hotkey().is_none());
    }
}
