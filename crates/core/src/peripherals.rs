//! Board peripherals the host drives.
//!
//! The display controller, SDRAM controller and touch panel drivers belong to
//! the board support package. The host only depends on the surface below;
//! [`crate::sim`] provides in-memory implementations for host builds and tests.

use serde::{Deserialize, Serialize};

/// Status of a failed driver call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PeripheralError {
    #[error("device not initialized")]
    NotInitialized,
    #[error("address range {address:#010X}+{words} words is outside the device")]
    OutOfRange { address: u32, words: usize },
    #[error("device error (status {0})")]
    Device(u32),
}

/// Horizontal anchoring for [`Display::draw_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    /// `x` is the left edge of the text.
    Left,
    /// Text is centered on the display width; `x` is an offset from center.
    Center,
}

/// Foreground/background colours for text, ARGB8888.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    pub foreground: u32,
    pub background: u32,
}

impl TextStyle {
    pub const fn new(foreground: u32, background: u32) -> Self {
        Self {
            foreground,
            background,
        }
    }
}

/// Display controller driver.
///
/// Coordinates are physical panel pixels. Drawing calls do not clip: callers
/// keep every coordinate inside `width() x height()`.
pub trait Display {
    /// Controller and default layer bring-up.
    fn init(&mut self) -> Result<(), PeripheralError>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Fill the whole layer with one colour.
    fn clear(&mut self, argb: u32);

    fn draw_pixel(&mut self, x: u32, y: u32, argb: u32);

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, argb: u32);

    fn draw_text(&mut self, x: u32, y: u32, text: &str, style: TextStyle, align: TextAlign);
}

/// External memory (SDRAM) controller driver.
pub trait ExternalMemory {
    /// Controller bring-up (timing registers, refresh).
    fn init(&mut self) -> Result<(), PeripheralError>;

    /// Write `data.len()` words starting at physical `address`.
    fn write_words(&mut self, address: u32, data: &[u32]) -> Result<(), PeripheralError>;

    /// Read `data.len()` words starting at physical `address`.
    fn read_words(&mut self, address: u32, data: &mut [u32]) -> Result<(), PeripheralError>;
}

/// One touch panel sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchState {
    pub detected: bool,
    pub x: u16,
    pub y: u16,
}

impl TouchState {
    pub const NONE: TouchState = TouchState {
        detected: false,
        x: 0,
        y: 0,
    };

    pub const fn at(x: u16, y: u16) -> Self {
        Self {
            detected: true,
            x,
            y,
        }
    }

    /// Coordinates of the touch, if any.
    pub fn point(&self) -> Option<(u16, u16)> {
        self.detected.then_some((self.x, self.y))
    }
}

/// Touch panel driver.
pub trait TouchPanel {
    /// Bring-up; the panel reports coordinates in a `width x height` space.
    fn init(&mut self, width: u32, height: u32) -> Result<(), PeripheralError>;

    fn poll(&mut self) -> TouchState;
}

/// Board support: core features plus ownership of the three peripherals.
pub trait Board {
    type Display: Display;
    type Memory: ExternalMemory;
    type Touch: TouchPanel;

    /// Enable instruction/data caches and flash prefetch. Called once at boot.
    fn enable_performance_features(&mut self);

    fn core_clock_hz(&self) -> u32;

    fn delay_ms(&mut self, ms: u32);

    fn display(&mut self) -> &mut Self::Display;

    fn memory(&mut self) -> &mut Self::Memory;

    fn touch(&mut self) -> &mut Self::Touch;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_state_point() {
        assert_eq!(TouchState::NONE.point(), None);
        assert_eq!(TouchState::at(12, 34).point(), Some((12, 34)));
        assert_eq!(TouchState::default(), TouchState::NONE);
    }

    #[test]
    fn test_peripheral_error_messages() {
        let err = PeripheralError::OutOfRange {
            address: 0xC000_0000,
            words: 4,
        };
        assert_eq!(
            err.to_string(),
            "address range 0xC0000000+4 words is outside the device"
        );
        assert_eq!(PeripheralError::Device(3).to_string(), "device error (status 3)");
    }
}
