//! Reference engine for exercising the host driver without the real core.
//!
//! Implements the full engine contract: it accepts iNES-style program images,
//! keeps an input latch, and renders a deterministic moving pattern derived
//! from the image and the frame number. A row of eight indicator squares at
//! the bottom of the frame shows which buttons are latched, so key handling
//! is visible through `render_into` alone.

mod image;

pub use image::{ImageError, ImageHeader, BUILTIN_IMAGE};

use host_core::engine::Engine;
use host_core::framebuffer::{FramebufferArray, VISIBLE_SCREEN_HEIGHT, VISIBLE_SCREEN_WIDTH};
use host_core::key::{Button, KeyEvent, KeyLatch};
use host_core::logging::{log, LogCategory, LogLevel};

/// Indicator squares: one per button, left to right in [`Button::ALL`] order.
pub const INDICATOR_SIZE: usize = 16;
pub const INDICATOR_Y: usize = 216;
pub const INDICATOR_X0: usize = 16;
pub const INDICATOR_PITCH: usize = 28;

const INDICATOR_ON: [u8; 3] = [0xFF, 0xFF, 0xFF];
const INDICATOR_OFF: [u8; 3] = [0x20, 0x20, 0x20];

/// Top-left corner of the indicator for `button`.
pub fn indicator_origin(button: Button) -> (usize, usize) {
    (
        INDICATOR_X0 + button.bit() as usize * INDICATOR_PITCH,
        INDICATOR_Y,
    )
}

#[derive(Debug)]
struct Loaded {
    header: ImageHeader,
    seed: [u8; 2],
}

/// Engine state; `None` until initialized, like the singleton it stands in for.
#[derive(Debug, Default)]
struct State {
    loaded: Option<Loaded>,
    latch: KeyLatch,
    frame: u64,
}

#[derive(Debug)]
pub struct DemoEngine {
    image: Vec<u8>,
    state: Option<State>,
}

impl DemoEngine {
    /// Engine that will load `image` on `load()`.
    pub fn new(image: Vec<u8>) -> Self {
        Self { image, state: None }
    }

    /// Engine with the built-in program image.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_IMAGE.to_vec())
    }

    pub fn header(&self) -> Option<&ImageHeader> {
        self.state
            .as_ref()
            .and_then(|s| s.loaded.as_ref())
            .map(|l| &l.header)
    }

    /// Current input latch (empty before initialize).
    pub fn latch(&self) -> KeyLatch {
        self.state.as_ref().map(|s| s.latch).unwrap_or_default()
    }

    /// Frames rendered since load or reset.
    pub fn frame(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.frame)
    }

    fn draw_pattern(out: &mut FramebufferArray, seed: [u8; 2], frame: u64) {
        let t = frame as usize;
        for (y, row) in out.iter_mut().enumerate() {
            for (x, px) in row.iter_mut().enumerate() {
                *px = [
                    ((x + t) as u8) ^ seed[0],
                    (y + t / 2) as u8,
                    ((x ^ y) as u8).wrapping_add(seed[1]),
                ];
            }
        }
    }

    fn draw_indicators(out: &mut FramebufferArray, latch: KeyLatch) {
        for button in Button::ALL {
            let color = if latch.is_pressed(button) {
                INDICATOR_ON
            } else {
                INDICATOR_OFF
            };
            let (x0, y0) = indicator_origin(button);
            for row in &mut out[y0..y0 + INDICATOR_SIZE] {
                row[x0..x0 + INDICATOR_SIZE].fill(color);
            }
        }
    }
}

impl Engine for DemoEngine {
    fn initialize(&mut self) {
        self.state = Some(State::default());
    }

    fn load(&mut self) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        match ImageHeader::parse(&self.image) {
            Ok(header) => {
                let seed = image::seed(&self.image);
                log(LogCategory::Engine, LogLevel::Debug, || {
                    format!(
                        "image accepted: {} PRG / {} CHR banks, mapper {}",
                        header.prg_banks, header.chr_banks, header.mapper
                    )
                });
                state.loaded = Some(Loaded { header, seed });
                self.reset();
                true
            }
            Err(e) => {
                log(LogCategory::Engine, LogLevel::Warn, || {
                    format!("image rejected: {}", e)
                });
                false
            }
        }
    }

    fn reset(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.frame = 0;
            state.latch.clear();
        }
    }

    fn update_key(&mut self, event: KeyEvent) {
        if let Some(state) = self.state.as_mut() {
            state.latch.apply(event);
        }
    }

    fn render_into(&mut self, framebuffer: &mut FramebufferArray) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let Some(loaded) = state.loaded.as_ref() else {
            return;
        };
        Self::draw_pattern(framebuffer, loaded.seed, state.frame);
        Self::draw_indicators(framebuffer, state.latch);
        state.frame += 1;
    }
}

const _: () = assert!(INDICATOR_Y + INDICATOR_SIZE <= VISIBLE_SCREEN_HEIGHT);
const _: () = assert!(INDICATOR_X0 + 7 * INDICATOR_PITCH + INDICATOR_SIZE <= VISIBLE_SCREEN_WIDTH);
