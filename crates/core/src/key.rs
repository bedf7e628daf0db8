//! Controller key events passed across the engine boundary.

use serde::{Deserialize, Serialize};

/// One of the eight logical controller buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];

    /// Bit position of this button in a [`KeyLatch`]; also its index in `ALL`.
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            Button::A => 0,
            Button::B => 1,
            Button::Select => 2,
            Button::Start => 3,
            Button::Up => 4,
            Button::Down => 5,
            Button::Left => 6,
            Button::Right => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::Select => "SELECT",
            Button::Start => "START",
            Button::Up => "UP",
            Button::Down => "DOWN",
            Button::Left => "LEFT",
            Button::Right => "RIGHT",
        }
    }
}

/// Press or release of one button.
///
/// The discriminants are part of the binary interface and match the C
/// `enum class KeyEvent : uint8_t` declaration.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyEvent {
    PressA = 0,
    PressB = 1,
    PressSelect = 2,
    PressStart = 3,
    PressUp = 4,
    PressDown = 5,
    PressLeft = 6,
    PressRight = 7,
    ReleaseA = 8,
    ReleaseB = 9,
    ReleaseSelect = 10,
    ReleaseStart = 11,
    ReleaseUp = 12,
    ReleaseDown = 13,
    ReleaseLeft = 14,
    ReleaseRight = 15,
}

impl KeyEvent {
    pub const ALL: [KeyEvent; 16] = [
        KeyEvent::PressA,
        KeyEvent::PressB,
        KeyEvent::PressSelect,
        KeyEvent::PressStart,
        KeyEvent::PressUp,
        KeyEvent::PressDown,
        KeyEvent::PressLeft,
        KeyEvent::PressRight,
        KeyEvent::ReleaseA,
        KeyEvent::ReleaseB,
        KeyEvent::ReleaseSelect,
        KeyEvent::ReleaseStart,
        KeyEvent::ReleaseUp,
        KeyEvent::ReleaseDown,
        KeyEvent::ReleaseLeft,
        KeyEvent::ReleaseRight,
    ];

    pub const fn press(button: Button) -> Self {
        Self::ALL[button.bit() as usize]
    }

    pub const fn release(button: Button) -> Self {
        Self::ALL[button.bit() as usize + 8]
    }

    /// Decode a raw discriminant; `None` for values outside 0..=15.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub const fn is_press(self) -> bool {
        (self as u8) < 8
    }

    pub const fn button(self) -> Button {
        Button::ALL[(self as u8 % 8) as usize]
    }
}

/// Pressed-state of all eight buttons as a bitmask (bit = [`Button::bit`]).
///
/// Engines keep one of these as their input latch: an event sets or clears
/// one bit and the state holds until the opposite event arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLatch(u8);

impl KeyLatch {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn apply(&mut self, event: KeyEvent) {
        let mask = 1u8 << event.button().bit();
        if event.is_press() {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    #[inline]
    pub const fn is_pressed(self, button: Button) -> bool {
        self.0 & (1 << button.bit()) != 0
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminants_match_c_header() {
        assert_eq!(KeyEvent::PressA as u8, 0);
        assert_eq!(KeyEvent::PressRight as u8, 7);
        assert_eq!(KeyEvent::ReleaseA as u8, 8);
        assert_eq!(KeyEvent::ReleaseRight as u8, 15);
        assert_eq!(std::mem::size_of::<KeyEvent>(), 1);
        for (i, ev) in KeyEvent::ALL.iter().enumerate() {
            assert_eq!(*ev as u8 as usize, i);
        }
    }

    #[test]
    fn test_press_release_constructors() {
        for button in Button::ALL {
            let press = KeyEvent::press(button);
            let release = KeyEvent::release(button);
            assert!(press.is_press());
            assert!(!release.is_press());
            assert_eq!(press.button(), button);
            assert_eq!(release.button(), button);
        }
        assert_eq!(KeyEvent::press(Button::Start), KeyEvent::PressStart);
        assert_eq!(KeyEvent::release(Button::Left), KeyEvent::ReleaseLeft);
    }

    #[test]
    fn test_from_u8() {
        assert_eq!(KeyEvent::from_u8(3), Some(KeyEvent::PressStart));
        assert_eq!(KeyEvent::from_u8(15), Some(KeyEvent::ReleaseRight));
        assert_eq!(KeyEvent::from_u8(16), None);
    }

    #[test]
    fn test_latch_holds_until_release() {
        let mut latch = KeyLatch::new();
        latch.apply(KeyEvent::PressA);
        latch.apply(KeyEvent::PressUp);
        assert!(latch.is_pressed(Button::A));
        assert!(latch.is_pressed(Button::Up));
        assert_eq!(latch.bits(), 0b0001_0001);

        // Repeated press is not a toggle
        latch.apply(KeyEvent::PressA);
        assert!(latch.is_pressed(Button::A));

        latch.apply(KeyEvent::ReleaseA);
        assert!(!latch.is_pressed(Button::A));
        assert!(latch.is_pressed(Button::Up));

        latch.clear();
        assert_eq!(latch.bits(), 0);
    }
}
