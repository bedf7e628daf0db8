//! On-screen touch keypad.
//!
//! The panel area not covered by the scaled frame holds eight button regions.
//! Each poll is compared with the button currently held: entering a region
//! presses its button, leaving it (or lifting the finger) releases it, and
//! holding still produces nothing. The engine's key latch does the rest.

use crate::blit::BlitGeometry;
use crate::key::{Button, KeyEvent};
use crate::peripherals::{Display, TextAlign, TextStyle, TouchState};
use serde::{Deserialize, Serialize};

const OUTLINE: u32 = 0xFF40_4040;
const LABEL: TextStyle = TextStyle::new(0xFFC0_C0C0, 0xFF00_0000);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeypadError {
    #[error("{button:?} region has zero size")]
    ZeroSize { button: Button },
    #[error("{button:?} region extends past the {display_width}x{display_height} display")]
    OffPanel {
        button: Button,
        display_width: u32,
        display_height: u32,
    },
    #[error("{button:?} region overlaps the scaled frame")]
    OverlapsFrame { button: Button },
}

/// A rectangular touch target for one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRegion {
    pub button: Button,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl KeyRegion {
    pub const fn new(button: Button, x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            button,
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        let (x, y) = (u32::from(x), u32::from(y));
        x >= u32::from(self.x)
            && x < u32::from(self.x) + u32::from(self.width)
            && y >= u32::from(self.y)
            && y < u32::from(self.y) + u32::from(self.height)
    }
}

/// Button regions. The first region containing a touch wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchKeypadLayout {
    pub regions: Vec<KeyRegion>,
}

impl Default for TouchKeypadLayout {
    /// D-pad left of the 2x frame, buttons right of it, on an 800x480 panel.
    fn default() -> Self {
        Self {
            regions: vec![
                KeyRegion::new(Button::Up, 40, 140, 64, 64),
                KeyRegion::new(Button::Left, 4, 208, 64, 64),
                KeyRegion::new(Button::Right, 76, 208, 64, 64),
                KeyRegion::new(Button::Down, 40, 276, 64, 64),
                KeyRegion::new(Button::A, 728, 180, 64, 64),
                KeyRegion::new(Button::B, 660, 250, 64, 64),
                KeyRegion::new(Button::Select, 664, 400, 60, 40),
                KeyRegion::new(Button::Start, 732, 400, 60, 40),
            ],
        }
    }
}

impl TouchKeypadLayout {
    /// Every region must be non-empty, inside the display and clear of the
    /// rectangle the blit paints.
    pub fn check_fits(
        &self,
        display_width: u32,
        display_height: u32,
        frame: &BlitGeometry,
    ) -> Result<(), KeypadError> {
        let (frame_w, frame_h) = frame.scaled_size();
        let frame_x = u64::from(frame.offset_x);
        let frame_y = u64::from(frame.offset_y);
        for r in &self.regions {
            let button = r.button;
            if r.width == 0 || r.height == 0 {
                return Err(KeypadError::ZeroSize { button });
            }
            let (x, y) = (u64::from(r.x), u64::from(r.y));
            let right = x + u64::from(r.width);
            let bottom = y + u64::from(r.height);
            if right > u64::from(display_width) || bottom > u64::from(display_height) {
                return Err(KeypadError::OffPanel {
                    button,
                    display_width,
                    display_height,
                });
            }
            let overlaps = x < frame_x + u64::from(frame_w)
                && frame_x < right
                && y < frame_y + u64::from(frame_h)
                && frame_y < bottom;
            if overlaps {
                return Err(KeypadError::OverlapsFrame { button });
            }
        }
        Ok(())
    }

    pub fn hit(&self, x: u16, y: u16) -> Option<Button> {
        self.regions
            .iter()
            .find(|r| r.contains(x, y))
            .map(|r| r.button)
    }
}

/// At most one release followed by at most one press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeypadEvents {
    release: Option<KeyEvent>,
    press: Option<KeyEvent>,
}

impl KeypadEvents {
    pub fn is_empty(&self) -> bool {
        self.release.is_none() && self.press.is_none()
    }
}

impl Iterator for KeypadEvents {
    type Item = KeyEvent;

    fn next(&mut self) -> Option<KeyEvent> {
        self.release.take().or_else(|| self.press.take())
    }
}

#[derive(Debug, Clone)]
pub struct TouchKeypad {
    layout: TouchKeypadLayout,
    held: Option<Button>,
}

impl TouchKeypad {
    pub fn new(layout: TouchKeypadLayout) -> Self {
        Self { layout, held: None }
    }

    pub fn held(&self) -> Option<Button> {
        self.held
    }

    pub fn layout(&self) -> &TouchKeypadLayout {
        &self.layout
    }

    /// Turn one touch sample into key events.
    pub fn update(&mut self, touch: TouchState) -> KeypadEvents {
        let now = touch.point().and_then(|(x, y)| self.layout.hit(x, y));
        if now == self.held {
            return KeypadEvents::default();
        }
        let events = KeypadEvents {
            release: self.held.map(KeyEvent::release),
            press: now.map(KeyEvent::press),
        };
        self.held = now;
        events
    }

    /// Outline and label every region.
    pub fn draw<D: Display + ?Sized>(&self, display: &mut D) {
        for r in &self.layout.regions {
            if r.width == 0 || r.height == 0 {
                continue;
            }
            let (x, y, w, h) = (
                u32::from(r.x),
                u32::from(r.y),
                u32::from(r.width),
                u32::from(r.height),
            );
            display.fill_rect(x, y, w, 1, OUTLINE);
            display.fill_rect(x, y + h - 1, w, 1, OUTLINE);
            display.fill_rect(x, y, 1, h, OUTLINE);
            display.fill_rect(x + w - 1, y, 1, h, OUTLINE);
            // Short regions put the label at the top edge
            let label_y = (y + h / 2).saturating_sub(4);
            display.draw_text(x + 4, label_y, r.button.name(), LABEL, TextAlign::Left);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centre(layout: &TouchKeypadLayout, button: Button) -> TouchState {
        let r = layout
            .regions
            .iter()
            .find(|r| r.button == button)
            .unwrap();
        TouchState::at(r.x + r.width / 2, r.y + r.height / 2)
    }

    #[test]
    fn test_default_layout_has_every_button_once() {
        let layout = TouchKeypadLayout::default();
        for button in Button::ALL {
            assert_eq!(
                layout.regions.iter().filter(|r| r.button == button).count(),
                1
            );
            assert_eq!(
                {
                    let t = centre(&layout, button);
                    layout.hit(t.x, t.y)
                },
                Some(button)
            );
        }
    }

    #[test]
    fn test_default_layout_stays_clear_of_frame() {
        // Default frame occupies x 144..656
        for r in TouchKeypadLayout::default().regions {
            let right = r.x + r.width;
            assert!(right <= 144 || r.x >= 656, "{:?} overlaps the frame", r.button);
            assert!(r.y + r.height <= 480);
        }
    }

    #[test]
    fn test_check_fits_accepts_default_layout() {
        let layout = TouchKeypadLayout::default();
        assert_eq!(layout.check_fits(800, 480, &BlitGeometry::default()), Ok(()));
    }

    #[test]
    fn test_check_fits_rejects_bad_regions() {
        let frame = BlitGeometry::default();
        let layout = |r: KeyRegion| TouchKeypadLayout { regions: vec![r] };

        assert_eq!(
            layout(KeyRegion::new(Button::A, 700, 0, 40, 0)).check_fits(800, 480, &frame),
            Err(KeypadError::ZeroSize { button: Button::A })
        );
        assert!(matches!(
            layout(KeyRegion::new(Button::B, 780, 100, 40, 40)).check_fits(800, 480, &frame),
            Err(KeypadError::OffPanel { button: Button::B, .. })
        ));
        assert!(matches!(
            layout(KeyRegion::new(Button::Up, 0, 460, 40, 40)).check_fits(800, 480, &frame),
            Err(KeypadError::OffPanel { .. })
        ));
        // Touches the last frame column
        assert_eq!(
            layout(KeyRegion::new(Button::Start, 650, 10, 20, 20)).check_fits(800, 480, &frame),
            Err(KeypadError::OverlapsFrame {
                button: Button::Start
            })
        );
        // Adjacent on both sides is fine
        assert_eq!(
            layout(KeyRegion::new(Button::Left, 100, 10, 44, 20)).check_fits(800, 480, &frame),
            Ok(())
        );
        assert_eq!(
            layout(KeyRegion::new(Button::Right, 656, 10, 20, 20)).check_fits(800, 480, &frame),
            Ok(())
        );
    }

    #[test]
    fn test_draw_short_region_at_top_edge() {
        use crate::sim::SimDisplay;

        let layout = TouchKeypadLayout {
            regions: vec![
                KeyRegion::new(Button::A, 700, 0, 40, 6),
                KeyRegion::new(Button::B, 700, 100, 0, 0),
            ],
        };
        let mut display = SimDisplay::new(800, 480);
        TouchKeypad::new(layout).draw(&mut display);
        assert_eq!(display.text_at(704, 0), Some("A"));
        assert_eq!(display.pixel(700, 5), OUTLINE);
        assert!(!display.has_text("B"));
    }

    #[test]
    fn test_region_edges() {
        let r = KeyRegion::new(Button::A, 10, 10, 5, 5);
        assert!(r.contains(10, 10));
        assert!(r.contains(14, 14));
        assert!(!r.contains(15, 10));
        assert!(!r.contains(9, 12));
    }

    #[test]
    fn test_press_hold_release() {
        let layout = TouchKeypadLayout::default();
        let mut pad = TouchKeypad::new(layout.clone());
        let a = centre(&layout, Button::A);

        let events: Vec<_> = pad.update(a).collect();
        assert_eq!(events, vec![KeyEvent::PressA]);
        assert_eq!(pad.held(), Some(Button::A));

        assert!(pad.update(a).is_empty());
        assert!(pad.update(a).is_empty());

        let events: Vec<_> = pad.update(TouchState::NONE).collect();
        assert_eq!(events, vec![KeyEvent::ReleaseA]);
        assert_eq!(pad.held(), None);

        assert!(pad.update(TouchState::NONE).is_empty());
    }

    #[test]
    fn test_slide_between_buttons_releases_first() {
        let layout = TouchKeypadLayout::default();
        let mut pad = TouchKeypad::new(layout.clone());
        pad.update(centre(&layout, Button::Left)).count();

        let events: Vec<_> = pad.update(centre(&layout, Button::Right)).collect();
        assert_eq!(events, vec![KeyEvent::ReleaseLeft, KeyEvent::PressRight]);
    }

    #[test]
    fn test_touch_outside_regions_releases() {
        let layout = TouchKeypadLayout::default();
        let mut pad = TouchKeypad::new(layout.clone());
        pad.update(centre(&layout, Button::Start)).count();
        let events: Vec<_> = pad.update(TouchState::at(400, 240)).collect();
        assert_eq!(events, vec![KeyEvent::ReleaseStart]);
    }
}
