//! Input types
//!
//! Local input as captured by the host, and the protocol-level mouse state
//! and keysyms forwarded to the remote end.

use std::ops::{BitAnd, BitOr, Not};

/// Pressed mouse buttons, one bit per button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonMask(pub u8);

impl ButtonMask {
    /// No button pressed
    pub const NONE: ButtonMask = ButtonMask(0);
    /// Left mouse button
    pub const LEFT: ButtonMask = ButtonMask(1);
    /// Middle mouse button (wheel click)
    pub const MIDDLE: ButtonMask = ButtonMask(1 << 1);
    /// Right mouse button
    pub const RIGHT: ButtonMask = ButtonMask(1 << 2);
    /// Wheel scrolled up
    pub const SCROLL_UP: ButtonMask = ButtonMask(1 << 3);
    /// Wheel scrolled down
    pub const SCROLL_DOWN: ButtonMask = ButtonMask(1 << 4);

    /// Returns true if every button in `other` is set
    pub fn contains(self, other: ButtonMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no button is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ButtonMask {
    type Output = ButtonMask;

    fn bitor(self, rhs: ButtonMask) -> ButtonMask {
        ButtonMask(self.0 | rhs.0)
    }
}

impl BitAnd for ButtonMask {
    type Output = ButtonMask;

    fn bitand(self, rhs: ButtonMask) -> ButtonMask {
        ButtonMask(self.0 & rhs.0)
    }
}

impl Not for ButtonMask {
    type Output = ButtonMask;

    fn not(self) -> ButtonMask {
        ButtonMask(!self.0)
    }
}

/// Symbolic key identifier understood by the remote protocol
///
/// Values follow the X11 keysym space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keysym(pub u32);

impl Keysym {
    /// Backspace
    pub const BACKSPACE: Keysym = Keysym(0xff08);
    /// Tab
    pub const TAB: Keysym = Keysym(0xff09);
    /// Enter/Return
    pub const RETURN: Keysym = Keysym(0xff0d);
    /// Escape
    pub const ESCAPE: Keysym = Keysym(0xff1b);
    /// Home
    pub const HOME: Keysym = Keysym(0xff50);
    /// Left arrow
    pub const LEFT: Keysym = Keysym(0xff51);
    /// Up arrow
    pub const UP: Keysym = Keysym(0xff52);
    /// Right arrow
    pub const RIGHT: Keysym = Keysym(0xff53);
    /// Down arrow
    pub const DOWN: Keysym = Keysym(0xff54);
    /// Page Up
    pub const PAGE_UP: Keysym = Keysym(0xff55);
    /// Page Down
    pub const PAGE_DOWN: Keysym = Keysym(0xff56);
    /// End
    pub const END: Keysym = Keysym(0xff57);
    /// Insert
    pub const INSERT: Keysym = Keysym(0xff63);
    /// F1; F2..F12 follow consecutively
    pub const F1: Keysym = Keysym(0xffbe);
    /// Left Shift
    pub const SHIFT_LEFT: Keysym = Keysym(0xffe1);
    /// Left Control
    pub const CONTROL_LEFT: Keysym = Keysym(0xffe3);
    /// Caps Lock
    pub const CAPS_LOCK: Keysym = Keysym(0xffe5);
    /// Left Alt
    pub const ALT_LEFT: Keysym = Keysym(0xffe9);
    /// Left Super (Windows/Command)
    pub const SUPER_LEFT: Keysym = Keysym(0xffeb);
    /// Delete
    pub const DELETE: Keysym = Keysym(0xffff);

    /// Returns the keysym producing `c`
    ///
    /// Latin-1 characters map to themselves, everything else to the
    /// Unicode keysym range.
    pub fn from_char(c: char) -> Keysym {
        let code = c as u32;
        match code {
            0x20..=0x7e | 0xa0..=0xff => Keysym(code),
            _ => Keysym(0x0100_0000 | code),
        }
    }

    /// Returns the function key keysym for `F{n}`, n in 1..=12
    pub fn function(n: u8) -> Option<Keysym> {
        (1..=12)
            .contains(&n)
            .then(|| Keysym(Self::F1.0 + u32::from(n) - 1))
    }
}

/// Local input event as captured by the host
///
/// Coordinates are in local pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer moved
    MouseMove {
        /// X coordinate
        x: f64,
        /// Y coordinate
        y: f64,
    },
    /// Button(s) pressed or released
    MouseButton {
        /// X coordinate
        x: f64,
        /// Y coordinate
        y: f64,
        /// Buttons that changed
        button_mask: ButtonMask,
        /// True on press, false on release
        pressed: bool,
    },
    /// Key pressed or released
    Key {
        /// Protocol keysym
        keysym: Keysym,
        /// True on press, false on release
        pressed: bool,
    },
}

/// Complete pointer state sent to the remote end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseState {
    /// X coordinate in remote display space
    pub x: f64,
    /// Y coordinate in remote display space
    pub y: f64,
    /// Buttons held down
    pub buttons: ButtonMask,
}

impl MouseState {
    /// Creates a mouse state
    pub fn new(x: f64, y: f64, buttons: ButtonMask) -> Self {
        Self { x, y, buttons }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_mask_ops() {
        let held = ButtonMask::LEFT | ButtonMask::RIGHT;
        assert!(held.contains(ButtonMask::LEFT));
        assert!(!held.contains(ButtonMask::MIDDLE));

        let released = held & !ButtonMask::LEFT;
        assert_eq!(released, ButtonMask::RIGHT);
        assert!((released & !ButtonMask::RIGHT).is_empty());
    }

    #[test]
    fn test_keysym_from_char() {
        assert_eq!(Keysym::from_char('a'), Keysym(0x61));
        assert_eq!(Keysym::from_char('é'), Keysym(0xe9));
        assert_eq!(Keysym::from_char('€'), Keysym(0x0100_20ac));
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(Keysym::function(1), Some(Keysym::F1));
        assert_eq!(Keysym::function(12), Some(Keysym(0xffc9)));
        assert_eq!(Keysym::function(0), None);
        assert_eq!(Keysym::function(13), None);
    }
}
