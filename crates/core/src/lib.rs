//! Host driver primitives for running an external emulation engine on a
//! display board.
//!
//! - [`selftest`]: external memory write/read/compare check run at boot
//! - [`framebuffer`]: the fixed 256x240 RGB buffer shared with the engine
//! - [`blit`]: integer upscaling of the framebuffer onto the display
//! - [`engine`]: the engine's binary contract and its lifecycle adapter
//! - [`host`]: boot sequence and frame loop tying it all together
//!
//! Board drivers are reached only through the traits in [`peripherals`];
//! [`sim`] implements them in memory.

pub mod blit;
pub mod engine;
pub mod framebuffer;
pub mod host;
pub mod key;
pub mod logging;
pub mod peripherals;
pub mod selftest;
pub mod sim;
pub mod touch_pad;

pub use blit::{blit, BlitError, BlitGeometry};
pub use engine::{Engine, EngineAdapter, EngineState, LifecycleError};
pub use framebuffer::{
    pack_argb, Framebuffer, FramebufferArray, NUM_OF_COLOR, VISIBLE_SCREEN_HEIGHT,
    VISIBLE_SCREEN_WIDTH,
};
pub use host::{BootReport, CancelToken, HostConfig, HostContext, HostError, RunLimit, RunOutcome};
pub use key::{Button, KeyEvent, KeyLatch};
pub use peripherals::{
    Board, Display, ExternalMemory, PeripheralError, TextAlign, TextStyle, TouchPanel, TouchState,
};
