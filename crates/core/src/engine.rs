//! The emulation engine contract and its lifecycle adapter.
//!
//! [`Engine`] mirrors the engine's binary interface one call per entry point:
//! no `Result`, no panics, `load` is the only operation that reports failure.
//! [`EngineAdapter`] owns an engine and enforces the lifecycle
//!
//! ```text
//! Uninitialized --initialize--> Initialized --load--> Loaded --render_into--> Running
//!                                                      ^ reset keeps the state ^
//! ```
//!
//! turning calls made out of order into [`LifecycleError`] values instead of
//! reaching the engine.

use crate::framebuffer::{Framebuffer, FramebufferArray};
use crate::key::KeyEvent;
use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The engine's binary interface.
///
/// Implementations must not retain the framebuffer reference passed to
/// `render_into` beyond the call.
pub trait Engine {
    /// Create the engine state. Called once, before anything else.
    fn initialize(&mut self);

    /// Accept the program image. `true` on success.
    fn load(&mut self) -> bool;

    /// Reset execution state; the loaded program image is kept.
    fn reset(&mut self);

    /// Apply one key event to the input latch.
    fn update_key(&mut self, event: KeyEvent);

    /// Advance exactly one visible frame and write its pixels.
    fn render_into(&mut self, framebuffer: &mut FramebufferArray);
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn initialize(&mut self) {
        (**self).initialize()
    }

    fn load(&mut self) -> bool {
        (**self).load()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn update_key(&mut self, event: KeyEvent) {
        (**self).update_key(event)
    }

    fn render_into(&mut self, framebuffer: &mut FramebufferArray) {
        (**self).render_into(framebuffer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    Loaded,
    Running,
}

impl EngineState {
    /// A program image has been accepted.
    pub fn is_loaded(self) -> bool {
        matches!(self, EngineState::Loaded | EngineState::Running)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initialized => "initialized",
            EngineState::Loaded => "loaded",
            EngineState::Running => "running",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("engine rejected the program image")]
    LoadFailed,
    #[error("cannot {operation} while the engine is {state}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },
}

/// Owns an [`Engine`] and tracks its lifecycle state.
pub struct EngineAdapter<E: Engine> {
    engine: E,
    state: EngineState,
    frames: u64,
}

impl<E: Engine> EngineAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: EngineState::Uninitialized,
            frames: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Frames rendered since the last successful load or reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_inner(self) -> E {
        self.engine
    }

    fn require(&self, operation: &'static str, ok: bool) -> Result<(), LifecycleError> {
        if ok {
            Ok(())
        } else {
            log(LogCategory::Engine, LogLevel::Error, || {
                format!("refused {} while {}", operation, self.state)
            });
            Err(LifecycleError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// First call creates the engine state; later calls are no-ops.
    pub fn initialize(&mut self) -> Result<(), LifecycleError> {
        if self.state != EngineState::Uninitialized {
            log(LogCategory::Engine, LogLevel::Warn, || {
                format!("initialize called again while {}, ignored", self.state)
            });
            return Ok(());
        }
        self.engine.initialize();
        self.state = EngineState::Initialized;
        log(LogCategory::Engine, LogLevel::Debug, || "initialized".to_string());
        Ok(())
    }

    /// Hand the program image to the engine.
    ///
    /// On failure the state stays `Initialized` and rendering remains refused.
    pub fn load(&mut self) -> Result<(), LifecycleError> {
        self.require("load", self.state == EngineState::Initialized)?;
        if !self.engine.load() {
            log(LogCategory::Engine, LogLevel::Error, || {
                "program image rejected".to_string()
            });
            return Err(LifecycleError::LoadFailed);
        }
        self.state = EngineState::Loaded;
        self.frames = 0;
        log(LogCategory::Engine, LogLevel::Info, || "program image loaded".to_string());
        Ok(())
    }

    /// Reset execution state, keeping the program image.
    pub fn reset(&mut self) -> Result<(), LifecycleError> {
        self.require("reset", self.state.is_loaded())?;
        self.engine.reset();
        self.frames = 0;
        log(LogCategory::Engine, LogLevel::Info, || "reset".to_string());
        Ok(())
    }

    pub fn update_key(&mut self, event: KeyEvent) -> Result<(), LifecycleError> {
        self.require("update_key", self.state != EngineState::Uninitialized)?;
        self.engine.update_key(event);
        log(LogCategory::Input, LogLevel::Debug, || format!("{:?}", event));
        Ok(())
    }

    /// Render one frame into `framebuffer`. Requires a successful load.
    pub fn render_into(&mut self, framebuffer: &mut Framebuffer) -> Result<(), LifecycleError> {
        self.require("render", self.state.is_loaded())?;
        self.engine.render_into(framebuffer.as_array_mut());
        self.state = EngineState::Running;
        self.frames += 1;
        Ok(())
    }
}

impl<E: Engine> fmt::Debug for EngineAdapter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineAdapter")
            .field("state", &self.state)
            .field("frames", &self.frames)
            .finish()
    }
}
