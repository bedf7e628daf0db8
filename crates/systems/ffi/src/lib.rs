//! Engine reached through its C binary interface.
//!
//! The engine is a separately compiled library exporting five
//! `EmbeddedEmulator_*` symbols. This crate only declares them; the final
//! binary has to link the library (for example with `-l static=...` in its
//! build script). All engine state lives behind those symbols, so there is at
//! most one engine per process and [`ExternEngine::take`] hands it out once.

use host_core::framebuffer::{FramebufferArray, NUM_OF_COLOR, VISIBLE_SCREEN_HEIGHT, VISIBLE_SCREEN_WIDTH};
use host_core::{Engine, KeyEvent};
use std::sync::atomic::{AtomicBool, Ordering};

pub const EMBEDDED_EMULATOR_NUM_OF_COLOR: usize = 3;
pub const EMBEDDED_EMULATOR_VISIBLE_SCREEN_WIDTH: usize = 256;
pub const EMBEDDED_EMULATOR_VISIBLE_SCREEN_HEIGHT: usize = 240;

// The engine writes through a raw pointer; any drift here corrupts memory.
const _: () = assert!(EMBEDDED_EMULATOR_NUM_OF_COLOR == NUM_OF_COLOR);
const _: () = assert!(EMBEDDED_EMULATOR_VISIBLE_SCREEN_WIDTH == VISIBLE_SCREEN_WIDTH);
const _: () = assert!(EMBEDDED_EMULATOR_VISIBLE_SCREEN_HEIGHT == VISIBLE_SCREEN_HEIGHT);
const _: () = assert!(std::mem::size_of::<KeyEvent>() == 1);
const _: () = assert!(
    std::mem::size_of::<FramebufferArray>()
        == EMBEDDED_EMULATOR_NUM_OF_COLOR
            * EMBEDDED_EMULATOR_VISIBLE_SCREEN_WIDTH
            * EMBEDDED_EMULATOR_VISIBLE_SCREEN_HEIGHT
);

extern "C" {
    fn EmbeddedEmulator_init();
    fn EmbeddedEmulator_load() -> bool;
    fn EmbeddedEmulator_reset();
    fn EmbeddedEmulator_update_key(key: KeyEvent);
    fn EmbeddedEmulator_update_screen(fb: *mut FramebufferArray);
}

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Handle to the process-wide engine behind the C interface.
#[derive(Debug)]
pub struct ExternEngine {
    _private: (),
}

impl ExternEngine {
    /// The engine handle, or `None` if it was already taken.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            log::warn!(target: "host::engine", "extern engine already taken");
            return None;
        }
        Some(Self { _private: () })
    }
}

// SAFETY for every call below: the symbols are only reachable through the
// single `ExternEngine`, which `&mut self` keeps from being used concurrently.
impl Engine for ExternEngine {
    fn initialize(&mut self) {
        unsafe { EmbeddedEmulator_init() }
    }

    fn load(&mut self) -> bool {
        unsafe { EmbeddedEmulator_load() }
    }

    fn reset(&mut self) {
        unsafe { EmbeddedEmulator_reset() }
    }

    fn update_key(&mut self, event: KeyEvent) {
        unsafe { EmbeddedEmulator_update_key(event) }
    }

    fn render_into(&mut self, framebuffer: &mut FramebufferArray) {
        // The borrow ends with the call; the engine does not keep the pointer
        unsafe { EmbeddedEmulator_update_screen(framebuffer as *mut FramebufferArray) }
    }
}
