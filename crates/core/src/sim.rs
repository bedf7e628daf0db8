//! In-memory peripherals for running the host pipeline off-target.
//!
//! Used by the `fbhost` frontend, the integration tests and the benchmarks.

use crate::peripherals::{
    Board, Display, ExternalMemory, PeripheralError, TextAlign, TextStyle, TouchPanel, TouchState,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Panel size of the reference board.
pub const PANEL_WIDTH: u32 = 800;
pub const PANEL_HEIGHT: u32 = 480;

/// Base of the SDRAM window on the reference board.
pub const SDRAM_BASE: u32 = 0xC000_0000;

/// Size of the SDRAM window on the reference board.
pub const SDRAM_SIZE: u32 = 16 * 1024 * 1024;

/// Width of one character cell used to centre text.
const CHAR_WIDTH: u32 = 17;

/// One `draw_text` call as seen by the simulated display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDraw {
    pub x: u32,
    pub y: u32,
    pub text: String,
    pub style: TextStyle,
}

/// ARGB8888 canvas. Text is recorded, not rasterised.
pub struct SimDisplay {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    texts: Vec<TextDraw>,
    pixel_writes: u64,
    fail_init: bool,
}

impl SimDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0xFF00_0000; (width * height) as usize],
            texts: Vec::new(),
            pixel_writes: 0,
            fail_init: false,
        }
    }

    /// Make `init` report a controller failure.
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Number of `draw_pixel` calls so far.
    pub fn pixel_writes(&self) -> u64 {
        self.pixel_writes
    }

    pub fn reset_counters(&mut self) {
        self.pixel_writes = 0;
    }

    pub fn texts(&self) -> &[TextDraw] {
        &self.texts
    }

    /// Text currently shown at `(x, y)`.
    pub fn text_at(&self, x: u32, y: u32) -> Option<&str> {
        self.texts
            .iter()
            .find(|t| t.x == x && t.y == y)
            .map(|t| t.text.as_str())
    }

    /// True if any recorded text contains `needle`.
    pub fn has_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|t| t.text.contains(needle))
    }
}

impl Display for SimDisplay {
    fn init(&mut self) -> Result<(), PeripheralError> {
        if self.fail_init {
            return Err(PeripheralError::Device(1));
        }
        Ok(())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self, argb: u32) {
        self.pixels.fill(argb);
        self.texts.clear();
    }

    #[inline]
    fn draw_pixel(&mut self, x: u32, y: u32, argb: u32) {
        self.pixels[(y * self.width + x) as usize] = argb;
        self.pixel_writes += 1;
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, argb: u32) {
        for row in y..(y + height).min(self.height) {
            let start = (row * self.width + x.min(self.width)) as usize;
            let end = (row * self.width + (x + width).min(self.width)) as usize;
            self.pixels[start..end].fill(argb);
        }
    }

    fn draw_text(&mut self, x: u32, y: u32, text: &str, style: TextStyle, align: TextAlign) {
        let x = match align {
            TextAlign::Left => x,
            TextAlign::Center => {
                let text_width = text.chars().count() as u32 * CHAR_WIDTH;
                (self.width.saturating_sub(text_width) / 2).saturating_add(x)
            }
        };
        let draw = TextDraw {
            x,
            y,
            text: text.to_string(),
            style,
        };
        // Text drawn at the same anchor overwrites what was there
        match self.texts.iter_mut().find(|t| t.x == x && t.y == y) {
            Some(existing) => *existing = draw,
            None => self.texts.push(draw),
        }
    }
}

/// Fault to inject into [`SimSdram`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdramFault {
    #[default]
    None,
    /// Controller bring-up fails; accesses still work.
    InitError,
    /// Data bit `bit` always reads back as 1.
    StuckBit { bit: u8 },
    /// Word-address bits outside `mask` are ignored, so distinct addresses
    /// share storage.
    AddressAlias { mask: u32 },
    WriteError,
    ReadError,
}

/// Word-addressed SDRAM window.
pub struct SimSdram {
    base: u32,
    words: Vec<u32>,
    fault: SdramFault,
    initialized: bool,
}

impl SimSdram {
    pub fn new(base: u32, size_bytes: u32) -> Self {
        Self {
            base,
            words: vec![0; (size_bytes / 4) as usize],
            fault: SdramFault::None,
            initialized: false,
        }
    }

    pub fn with_fault(mut self, fault: SdramFault) -> Self {
        self.fault = fault;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn word_index(&self, address: u32, words: usize) -> Result<usize, PeripheralError> {
        let out_of_range = PeripheralError::OutOfRange { address, words };
        if address < self.base || address % 4 != 0 {
            return Err(out_of_range);
        }
        let start = ((address - self.base) / 4) as usize;
        if start + words > self.words.len() {
            return Err(out_of_range);
        }
        Ok(start)
    }

    fn cell(&self, index: usize) -> usize {
        match self.fault {
            SdramFault::AddressAlias { mask } => index & mask as usize,
            _ => index,
        }
    }
}

impl ExternalMemory for SimSdram {
    fn init(&mut self) -> Result<(), PeripheralError> {
        self.initialized = true;
        if self.fault == SdramFault::InitError {
            return Err(PeripheralError::Device(2));
        }
        Ok(())
    }

    fn write_words(&mut self, address: u32, data: &[u32]) -> Result<(), PeripheralError> {
        if self.fault == SdramFault::WriteError {
            return Err(PeripheralError::Device(3));
        }
        let start = self.word_index(address, data.len())?;
        for (i, &word) in data.iter().enumerate() {
            let cell = self.cell(start + i);
            self.words[cell] = word;
        }
        Ok(())
    }

    fn read_words(&mut self, address: u32, data: &mut [u32]) -> Result<(), PeripheralError> {
        if self.fault == SdramFault::ReadError {
            return Err(PeripheralError::Device(4));
        }
        let start = self.word_index(address, data.len())?;
        for (i, word) in data.iter_mut().enumerate() {
            *word = self.words[self.cell(start + i)];
            if let SdramFault::StuckBit { bit } = self.fault {
                *word |= 1u32 << (bit % 32);
            }
        }
        Ok(())
    }
}

/// Touch panel that replays a script, one sample per poll.
///
/// After the script runs out the last sample repeats (or no touch if the
/// script was empty).
pub struct ScriptedTouch {
    script: VecDeque<TouchState>,
    last: TouchState,
    polls: u64,
    fail_init: bool,
}

impl ScriptedTouch {
    pub fn new<I: IntoIterator<Item = TouchState>>(script: I) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: TouchState::NONE,
            polls: 0,
            fail_init: false,
        }
    }

    pub fn idle() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl TouchPanel for ScriptedTouch {
    fn init(&mut self, _width: u32, _height: u32) -> Result<(), PeripheralError> {
        if self.fail_init {
            return Err(PeripheralError::Device(5));
        }
        Ok(())
    }

    fn poll(&mut self) -> TouchState {
        self.polls += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Board with simulated peripherals and a virtual clock.
pub struct SimBoard {
    pub display: SimDisplay,
    pub sdram: SimSdram,
    pub touch: ScriptedTouch,
    core_clock_hz: u32,
    performance_enabled: bool,
    elapsed_ms: u64,
}

impl SimBoard {
    /// Reference board: 800x480 panel, 16 MiB SDRAM, 216 MHz core.
    pub fn new() -> Self {
        Self::with_parts(
            SimDisplay::new(PANEL_WIDTH, PANEL_HEIGHT),
            SimSdram::new(SDRAM_BASE, SDRAM_SIZE),
            ScriptedTouch::idle(),
        )
    }

    pub fn with_parts(display: SimDisplay, sdram: SimSdram, touch: ScriptedTouch) -> Self {
        Self {
            display,
            sdram,
            touch,
            core_clock_hz: 216_000_000,
            performance_enabled: false,
            elapsed_ms: 0,
        }
    }

    pub fn performance_enabled(&self) -> bool {
        self.performance_enabled
    }

    /// Total time spent in `delay_ms`.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for SimBoard {
    type Display = SimDisplay;
    type Memory = SimSdram;
    type Touch = ScriptedTouch;

    fn enable_performance_features(&mut self) {
        self.performance_enabled = true;
    }

    fn core_clock_hz(&self) -> u32 {
        self.core_clock_hz
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
    }

    fn display(&mut self) -> &mut SimDisplay {
        &mut self.display
    }

    fn memory(&mut self) -> &mut SimSdram {
        &mut self.sdram
    }

    fn touch(&mut self) -> &mut ScriptedTouch {
        &mut self.touch
    }
}
