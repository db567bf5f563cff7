//! Key code definitions and name mapping
//!
//! Key identity is the Linux evdev scancode. The device_query backend is
//! mapped onto the same numbering so bindings compare equal whichever
//! backend delivered the event. Bindings are persisted by name.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Represents a physical key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const ESCAPE: KeyCode = KeyCode(1);
    pub const C: KeyCode = KeyCode(46);
    pub const E: KeyCode = KeyCode(18);

    pub fn new(code: u16) -> Self {
        Self(code)
    }

    /// Canonical name, if the code is in the keymap
    pub fn name(&self) -> Option<&'static str> {
        KEYMAP.get(self).map(|info| info.name)
    }

    /// Short on-screen label, falling back to the persisted name
    pub fn label(&self) -> String {
        match KEYMAP.get(self) {
            Some(info) => info.label.to_string(),
            None => self.to_string(),
        }
    }

    /// Parse a persisted key name.
    ///
    /// Matching is case-insensitive and accepts a few common aliases
    /// (`Esc`, `Return`, `D1`). Codes without a name round-trip as `Key#<n>`.
    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if let Some(raw) = trimmed.strip_prefix("Key#") {
            return raw.parse::<u16>().ok().map(KeyCode);
        }
        let lower = trimmed.to_ascii_lowercase();
        NAME_INDEX.get(lower.as_str()).copied()
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Key#{}", self.0),
        }
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl Serialize for KeyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyNameVisitor;

        impl Visitor<'_> for KeyNameVisitor {
            type Value = KeyCode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a key name such as \"C\" or \"Escape\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<KeyCode, E> {
                KeyCode::from_name(value)
                    .ok_or_else(|| E::custom(format!("unknown key name `{}`", value)))
            }
        }

        deserializer.deserialize_str(KeyNameVisitor)
    }
}

impl From<device_query::Keycode> for KeyCode {
    fn from(keycode: device_query::Keycode) -> Self {
        use device_query::Keycode as DK;
        // Map device_query keycodes to Linux evdev scancodes
        let code = match keycode {
            DK::Escape => 1,
            DK::Key1 => 2,
            DK::Key2 => 3,
            DK::Key3 => 4,
            DK::Key4 => 5,
            DK::Key5 => 6,
            DK::Key6 => 7,
            DK::Key7 => 8,
            DK::Key8 => 9,
            DK::Key9 => 10,
            DK::Key0 => 11,
            DK::Minus => 12,
            DK::Equal => 13,
            DK::Backspace => 14,
            DK::Tab => 15,
            DK::Q => 16,
            DK::W => 17,
            DK::E => 18,
            DK::R => 19,
            DK::T => 20,
            DK::Y => 21,
            DK::U => 22,
            DK::I => 23,
            DK::O => 24,
            DK::P => 25,
            DK::LeftBracket => 26,
            DK::RightBracket => 27,
            DK::Enter => 28,
            DK::LControl => 29,
            DK::A => 30,
            DK::S => 31,
            DK::D => 32,
            DK::F => 33,
            DK::G => 34,
            DK::H => 35,
            DK::J => 36,
            DK::K => 37,
            DK::L => 38,
            DK::Semicolon => 39,
            DK::Apostrophe => 40,
            DK::Grave => 41,
            DK::LShift => 42,
            DK::BackSlash => 43,
            DK::Z => 44,
            DK::X => 45,
            DK::C => 46,
            DK::V => 47,
            DK::B => 48,
            DK::N => 49,
            DK::M => 50,
            DK::Comma => 51,
            DK::Dot => 52,
            DK::Slash => 53,
            DK::RShift => 54,
            DK::LAlt => 56,
            DK::Space => 57,
            DK::CapsLock => 58,
            DK::F1 => 59,
            DK::F2 => 60,
            DK::F3 => 61,
            DK::F4 => 62,
            DK::F5 => 63,
            DK::F6 => 64,
            DK::F7 => 65,
            DK::F8 => 66,
            DK::F9 => 67,
            DK::F10 => 68,
            DK::F11 => 87,
            DK::F12 => 88,
            DK::RControl => 97,
            DK::RAlt => 100,
            DK::Home => 102,
            DK::Up => 103,
            DK::PageUp => 104,
            DK::Left => 105,
            DK::Right => 106,
            DK::End => 107,
            DK::Down => 108,
            DK::PageDown => 109,
            DK::Insert => 110,
            DK::Delete => 111,
            DK::LMeta => 125,
            DK::RMeta => 126,
            // Numpad keys
            DK::Numpad0 => 82,
            DK::Numpad1 => 79,
            DK::Numpad2 => 80,
            DK::Numpad3 => 81,
            DK::Numpad4 => 75,
            DK::Numpad5 => 76,
            DK::Numpad6 => 77,
            DK::Numpad7 => 71,
            DK::Numpad8 => 72,
            DK::Numpad9 => 73,
            DK::NumpadSubtract => 74,
            DK::NumpadAdd => 78,
            DK::NumpadDivide => 98,
            DK::NumpadMultiply => 55,
            // Fallback for any unmapped keys
            _ => 0,
        };
        Self(code)
    }
}

/// Information about a key
#[derive(Debug, Clone)]
pub struct KeyInfo {
    /// Persisted name for the key
    pub name: &'static str,
    /// Short label for on-screen display
    pub label: &'static str,
}

impl KeyInfo {
    const fn new(name: &'static str, label: &'static str) -> Self {
        Self { name, label }
    }
}

const KEYS: &[(u16, KeyInfo)] = &[
    (1, KeyInfo::new("Escape", "Esc")),
    (2, KeyInfo::new("1", "1")),
    (3, KeyInfo::new("2", "2")),
    (4, KeyInfo::new("3", "3")),
    (5, KeyInfo::new("4", "4")),
    (6, KeyInfo::new("5", "5")),
    (7, KeyInfo::new("6", "6")),
    (8, KeyInfo::new("7", "7")),
    (9, KeyInfo::new("8", "8")),
    (10, KeyInfo::new("9", "9")),
    (11, KeyInfo::new("0", "0")),
    (12, KeyInfo::new("Minus", "-")),
    (13, KeyInfo::new("Equals", "=")),
    (14, KeyInfo::new("Backspace", "Bksp")),
    (15, KeyInfo::new("Tab", "Tab")),
    (16, KeyInfo::new("Q", "Q")),
    (17, KeyInfo::new("W", "W")),
    (18, KeyInfo::new("E", "E")),
    (19, KeyInfo::new("R", "R")),
    (20, KeyInfo::new("T", "T")),
    (21, KeyInfo::new("Y", "Y")),
    (22, KeyInfo::new("U", "U")),
    (23, KeyInfo::new("I", "I")),
    (24, KeyInfo::new("O", "O")),
    (25, KeyInfo::new("P", "P")),
    (26, KeyInfo::new("LeftBracket", "[")),
    (27, KeyInfo::new("RightBracket", "]")),
    (28, KeyInfo::new("Enter", "Enter")),
    (29, KeyInfo::new("LeftCtrl", "Ctrl")),
    (30, KeyInfo::new("A", "A")),
    (31, KeyInfo::new("S", "S")),
    (32, KeyInfo::new("D", "D")),
    (33, KeyInfo::new("F", "F")),
    (34, KeyInfo::new("G", "G")),
    (35, KeyInfo::new("H", "H")),
    (36, KeyInfo::new("J", "J")),
    (37, KeyInfo::new("K", "K")),
    (38, KeyInfo::new("L", "L")),
    (39, KeyInfo::new("Semicolon", ";")),
    (40, KeyInfo::new("Apostrophe", "'")),
    (41, KeyInfo::new("Grave", "`")),
    (42, KeyInfo::new("LeftShift", "Shift")),
    (43, KeyInfo::new("Backslash", "\\")),
    (44, KeyInfo::new("Z", "Z")),
    (45, KeyInfo::new("X", "X")),
    (46, KeyInfo::new("C", "C")),
    (47, KeyInfo::new("V", "V")),
    (48, KeyInfo::new("B", "B")),
    (49, KeyInfo::new("N", "N")),
    (50, KeyInfo::new("M", "M")),
    (51, KeyInfo::new("Comma", ",")),
    (52, KeyInfo::new("Period", ".")),
    (53, KeyInfo::new("Slash", "/")),
    (54, KeyInfo::new("RightShift", "Shift")),
    (55, KeyInfo::new("NumpadMultiply", "Num*")),
    (56, KeyInfo::new("LeftAlt", "Alt")),
    (57, KeyInfo::new("Space", "Space")),
    (58, KeyInfo::new("CapsLock", "Caps")),
    (59, KeyInfo::new("F1", "F1")),
    (60, KeyInfo::new("F2", "F2")),
    (61, KeyInfo::new("F3", "F3")),
    (62, KeyInfo::new("F4", "F4")),
    (63, KeyInfo::new("F5", "F5")),
    (64, KeyInfo::new("F6", "F6")),
    (65, KeyInfo::new("F7", "F7")),
    (66, KeyInfo::new("F8", "F8")),
    (67, KeyInfo::new("F9", "F9")),
    (68, KeyInfo::new("F10", "F10")),
    (71, KeyInfo::new("Numpad7", "Num7")),
    (72, KeyInfo::new("Numpad8", "Num8")),
    (73, KeyInfo::new("Numpad9", "Num9")),
    (74, KeyInfo::new("NumpadSubtract", "Num-")),
    (75, KeyInfo::new("Numpad4", "Num4")),
    (76, KeyInfo::new("Numpad5", "Num5")),
    (77, KeyInfo::new("Numpad6", "Num6")),
    (78, KeyInfo::new("NumpadAdd", "Num+")),
    (79, KeyInfo::new("Numpad1", "Num1")),
    (80, KeyInfo::new("Numpad2", "Num2")),
    (81, KeyInfo::new("Numpad3", "Num3")),
    (82, KeyInfo::new("Numpad0", "Num0")),
    (87, KeyInfo::new("F11", "F11")),
    (88, KeyInfo::new("F12", "F12")),
    (97, KeyInfo::new("RightCtrl", "Ctrl")),
    (98, KeyInfo::new("NumpadDivide", "Num/")),
    (100, KeyInfo::new("RightAlt", "Alt")),
    (102, KeyInfo::new("Home", "Home")),
    (103, KeyInfo::new("Up", "↑")),
    (104, KeyInfo::new("PageUp", "PgUp")),
    (105, KeyInfo::new("Left", "←")),
    (106, KeyInfo::new("Right", "→")),
    (107, KeyInfo::new("End", "End")),
    (108, KeyInfo::new("Down", "↓")),
    (109, KeyInfo::new("PageDown", "PgDn")),
    (110, KeyInfo::new("Insert", "Ins")),
    (111, KeyInfo::new("Delete", "Del")),
    (125, KeyInfo::new("LeftMeta", "Win")),
    (126, KeyInfo::new("RightMeta", "Win")),
    (127, KeyInfo::new("Menu", "Menu")),
];

const ALIASES: &[(&str, u16)] = &[
    ("esc", 1),
    ("return", 28),
    ("d1", 2),
    ("d2", 3),
    ("d3", 4),
    ("d4", 5),
    ("d5", 6),
    ("d6", 7),
    ("d7", 8),
    ("d8", 9),
    ("d9", 10),
    ("d0", 11),
    ("lshift", 42),
    ("rshift", 54),
    ("lctrl", 29),
    ("rctrl", 97),
    ("leftalt", 56),
    ("lalt", 56),
    ("ralt", 100),
    ("back", 14),
    ("capital", 58),
];

/// Static keymap for standard US keyboard layout
pub static KEYMAP: LazyLock<HashMap<KeyCode, KeyInfo>> = LazyLock::new(|| {
    KEYS.iter()
        .map(|(code, info)| (KeyCode(*code), info.clone()))
        .collect()
});

static NAME_INDEX: LazyLock<HashMap<String, KeyCode>> = LazyLock::new(|| {
    let mut index: HashMap<String, KeyCode> = KEYS
        .iter()
        .map(|(code, info)| (info.name.to_ascii_lowercase(), KeyCode(*code)))
        .collect();
    for (alias, code) in ALIASES {
        index.entry(alias.to_string()).or_insert(KeyCode(*code));
    }
    index
});
