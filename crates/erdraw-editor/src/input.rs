//! Host-agnostic input events, in screen (client) pixels.

use erdraw_core::Point;
use serde::{Deserialize, Serialize};

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    /// ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Button {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` value.
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => Button::Middle,
            2 => Button::Secondary,
            _ => Button::Primary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        at: Point,
        button: Button,
        modifiers: Modifiers,
    },
    PointerMove {
        at: Point,
        modifiers: Modifiers,
    },
    PointerUp {
        at: Point,
        modifiers: Modifiers,
    },
    /// The pointer sequence was interrupted (capture lost, window blur).
    PointerCancel,
    Click {
        at: Point,
    },
    DoubleClick {
        at: Point,
    },
    ContextMenu {
        at: Point,
    },
    Wheel {
        at: Point,
        delta_y: f64,
    },
    Key {
        key: String,
        modifiers: Modifiers,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_buttons() {
        assert_eq!(Button::from_dom(0), Button::Primary);
        assert_eq!(Button::from_dom(1), Button::Middle);
        assert_eq!(Button::from_dom(2), Button::Secondary);
        assert_eq!(Button::from_dom(4), Button::Primary);
    }

    #[test]
    fn command_is_ctrl_or_meta() {
        assert!(!Modifiers::default().command());
        assert!(Modifiers { meta: true, ..Default::default() }.command());
        assert!(Modifiers { ctrl: true, ..Default::default() }.command());
    }
}
