//! Output vocabulary: keyboard keys, virtual joystick buttons and axes, and
//! the one-shot actions shift layers trigger.
//!
//! # Profile syntax
//!
//! ```text
//! "esc"                → Action::Key(Esc)        (tap)
//! ["ralt", "f1"]       → Action::Combo([RAlt, F1])
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Keyboard keys the virtual device can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Esc,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Zero,
    Tab,
    Enter,
    Space,
    Backspace,
    /// Right shift
    Shift,
    #[serde(rename = "lshift")]
    LShift,
    #[serde(rename = "lctrl")]
    LCtrl,
    #[serde(rename = "rctrl")]
    RCtrl,
    #[serde(rename = "lalt")]
    LAlt,
    #[serde(rename = "ralt")]
    RAlt,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Every key, in registration order for the virtual device
    pub const ALL: &'static [Key] = &[
        Key::Esc,
        Key::One,
        Key::Two,
        Key::Three,
        Key::Four,
        Key::Five,
        Key::Six,
        Key::Seven,
        Key::Eight,
        Key::Nine,
        Key::Zero,
        Key::Tab,
        Key::Enter,
        Key::Space,
        Key::Backspace,
        Key::Shift,
        Key::LShift,
        Key::LCtrl,
        Key::RCtrl,
        Key::LAlt,
        Key::RAlt,
        Key::F1,
        Key::F2,
        Key::F3,
        Key::F4,
        Key::F5,
        Key::F6,
        Key::F7,
        Key::F8,
        Key::F9,
        Key::F10,
        Key::F11,
        Key::F12,
        Key::Insert,
        Key::Delete,
        Key::Home,
        Key::End,
        Key::PageUp,
        Key::PageDown,
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
    ];
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug spelling is close enough for logs ("PageUp", "RAlt")
        write!(f, "{self:?}")
    }
}

/// Digital outputs of the virtual joystick (bank B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadButton {
    A,
    B,
    X,
    Y,
    Tl,
    Tr,
    Tl2,
    Tr2,
    Select,
    Start,
    Mode,
    ThumbL,
    ThumbR,
    Up,
    Down,
    Left,
    Right,
}

impl PadButton {
    pub const ALL: &'static [PadButton] = &[
        PadButton::A,
        PadButton::B,
        PadButton::X,
        PadButton::Y,
        PadButton::Tl,
        PadButton::Tr,
        PadButton::Tl2,
        PadButton::Tr2,
        PadButton::Select,
        PadButton::Start,
        PadButton::Mode,
        PadButton::ThumbL,
        PadButton::ThumbR,
        PadButton::Up,
        PadButton::Down,
        PadButton::Left,
        PadButton::Right,
    ];
}

impl fmt::Display for PadButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Absolute axes of the virtual joystick (bank A)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadAxis {
    X,
    Y,
    Z,
    Rx,
    Ry,
    Rz,
}

impl PadAxis {
    pub const ALL: &'static [PadAxis] = &[
        PadAxis::X,
        PadAxis::Y,
        PadAxis::Z,
        PadAxis::Rx,
        PadAxis::Ry,
        PadAxis::Rz,
    ];
}

impl fmt::Display for PadAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A one-shot keyboard action triggered from a shift layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Press and release a single key
    Key(Key),
    /// Press every key in order, then release them all
    Combo(Vec<Key>),
}

impl Action {
    /// Keys involved, in press order
    pub fn keys(&self) -> &[Key] {
        match self {
            Action::Key(key) => std::slice::from_ref(key),
            Action::Combo(keys) => keys,
        }
    }
}

impl From<Key> for Action {
    fn from(key: Key) -> Self {
        Action::Key(key)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Key(key) => write!(f, "{key}"),
            Action::Combo(keys) => {
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, "+")?;
                    }
                    write!(f, "{key}")?;
                }
                Ok(())
            }
        }
    }
}
