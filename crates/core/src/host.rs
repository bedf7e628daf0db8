//! Boot sequence and per-frame loop.
//!
//! `HostContext` owns everything that the firmware would otherwise keep in
//! globals: the board (and through it the display, SDRAM and touch drivers),
//! the engine behind its lifecycle adapter, and the framebuffer. Boot runs
//! once and is linear; every failure on the way is shown on the status screen
//! and recorded in the [`BootReport`], never fatal by itself.

use crate::blit::{blit, BlitError, BlitGeometry};
use crate::engine::{Engine, EngineAdapter, LifecycleError};
use crate::framebuffer::Framebuffer;
use crate::key::KeyEvent;
use crate::logging::{log, LogCategory, LogLevel};
use crate::peripherals::{Board, Display, ExternalMemory, TextAlign, TextStyle, TouchPanel};
use crate::selftest::{run_self_test, SelfTestConfig, SelfTestReport, StepStatus};
use crate::touch_pad::{KeypadError, TouchKeypad, TouchKeypadLayout};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const WHITE: u32 = 0xFFFF_FFFF;
const BLACK: u32 = 0xFF00_0000;
const TITLE_BAR_HEIGHT: u32 = 40;
const TITLE_STYLE: TextStyle = TextStyle::new(WHITE, BLACK);
const STATUS_STYLE: TextStyle = TextStyle::new(BLACK, WHITE);
const COUNTER_STYLE: TextStyle = TextStyle::new(WHITE, BLACK);

/// Left edge and first baseline of the boot status lines.
pub const STATUS_X: u32 = 20;
pub const STATUS_Y: u32 = 100;
pub const STATUS_LINE_HEIGHT: u32 = 30;

/// Position of the frame counter overlay.
pub const COUNTER_POS: (u32, u32) = (5, 5);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("invalid blit geometry: {0}")]
    Blit(#[from] BlitError),
    #[error("invalid keypad layout: {0}")]
    Keypad(#[from] KeypadError),
    #[error("engine lifecycle: {0}")]
    Lifecycle(#[from] LifecycleError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Text in the title bar of the boot screen
    pub title: String,
    pub blit: BlitGeometry,
    pub self_test: SelfTestConfig,
    /// How long the boot status screen stays up
    pub splash_ms: u32,
    /// Draw the running frame number in the top-left corner
    pub frame_counter: bool,
    /// Poll the touch panel every frame and feed the keypad
    pub touch_input: bool,
    pub keypad: TouchKeypadLayout,
    /// Enter the frame loop even when the program image was rejected
    pub run_on_load_failure: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            title: "fbhost".to_string(),
            blit: BlitGeometry::default(),
            self_test: SelfTestConfig::default(),
            splash_ms: 3000,
            frame_counter: true,
            touch_input: true,
            keypad: TouchKeypadLayout::default(),
            run_on_load_failure: false,
        }
    }
}

/// What happened during boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootReport {
    pub sdram_init: StepStatus,
    pub self_test: SelfTestReport,
    pub display_init: StepStatus,
    pub touch_init: StepStatus,
    pub engine_load: StepStatus,
    pub core_clock_hz: u32,
}

impl BootReport {
    pub fn all_passed(&self) -> bool {
        self.sdram_init.is_passed()
            && self.self_test.passed()
            && self.display_init.is_passed()
            && self.touch_init.is_passed()
            && self.engine_load.is_passed()
    }
}

/// How many frames [`HostContext::run`] renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLimit {
    /// Until power-off (or cancellation).
    Forever,
    Frames(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed { frames: u64 },
    Cancelled { frames: u64 },
    /// The program image was rejected, so no frame was rendered.
    SkippedLoadFailed,
}

/// Stops a running loop at the next frame boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fn status_text(label: &str, status: &StepStatus) -> String {
    match status {
        StepStatus::Passed => format!("{} : OK", label),
        StepStatus::Failed(_) => format!("{} : FAILED", label),
    }
}

fn driver_status<T>(result: Result<(), T>) -> StepStatus
where
    T: std::fmt::Display,
{
    match result {
        Ok(()) => StepStatus::Passed,
        Err(e) => StepStatus::Failed(e.to_string()),
    }
}

pub struct HostContext<B: Board, E: Engine> {
    board: B,
    engine: EngineAdapter<E>,
    framebuffer: Framebuffer,
    config: HostConfig,
    keypad: TouchKeypad,
    frame_counter: u64,
    boot_report: Option<BootReport>,
    cancel: Option<CancelToken>,
}

impl<B: Board, E: Engine> HostContext<B, E> {
    /// Validates that the configured blit and keypad fit the board's display.
    pub fn new(mut board: B, engine: E, config: HostConfig) -> Result<Self, HostError> {
        {
            let display = board.display();
            let (width, height) = (display.width(), display.height());
            config.blit.check_fits(width, height)?;
            if config.touch_input {
                config.keypad.check_fits(width, height, &config.blit)?;
            }
        }
        Ok(Self {
            board,
            engine: EngineAdapter::new(engine),
            framebuffer: Framebuffer::new(),
            keypad: TouchKeypad::new(config.keypad.clone()),
            config,
            frame_counter: 0,
            boot_report: None,
            cancel: None,
        })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn engine(&self) -> &EngineAdapter<E> {
        &self.engine
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn boot_report(&self) -> Option<&BootReport> {
        self.boot_report.as_ref()
    }

    /// Frames rendered and shown since boot.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Boot → self-test → display → touch → engine init/load → status screen.
    ///
    /// Runs once; later calls return the first report untouched.
    pub fn boot(&mut self) -> &BootReport {
        let report = match self.boot_report.take() {
            Some(report) => {
                log(LogCategory::Boot, LogLevel::Warn, || {
                    "boot called again, keeping the first report".to_string()
                });
                report
            }
            None => self.boot_sequence(),
        };
        self.boot_report.insert(report)
    }

    fn boot_sequence(&mut self) -> BootReport {
        self.board.enable_performance_features();
        log(LogCategory::Boot, LogLevel::Info, || {
            "caches and flash prefetch enabled".to_string()
        });

        let sdram_init = driver_status(self.board.memory().init());
        let self_test = run_self_test(self.board.memory(), &self.config.self_test);

        let display_init = driver_status(self.board.display().init());
        if let StepStatus::Failed(reason) = &display_init {
            log(LogCategory::Display, LogLevel::Warn, || {
                format!("display init failed: {}", reason)
            });
        }
        self.draw_title();

        let (width, height) = {
            let display = self.board.display();
            (display.width(), display.height())
        };
        let touch_init = driver_status(self.board.touch().init(width, height));

        let engine_load = self.start_engine();
        let core_clock_hz = self.board.core_clock_hz();

        let report = BootReport {
            sdram_init,
            self_test,
            display_init,
            touch_init,
            engine_load,
            core_clock_hz,
        };
        self.draw_status(&report);
        log(LogCategory::Boot, LogLevel::Info, || {
            format!(
                "boot finished ({}), core clock {} Hz",
                if report.all_passed() { "all ok" } else { "with failures" },
                core_clock_hz
            )
        });

        self.board.delay_ms(self.config.splash_ms);
        self.board.display().clear(BLACK);
        if self.config.touch_input {
            self.keypad.draw(self.board.display());
        }
        report
    }

    fn start_engine(&mut self) -> StepStatus {
        let result = self.engine.initialize().and_then(|()| self.engine.load());
        driver_status(result)
    }

    fn draw_title(&mut self) {
        let display = self.board.display();
        let width = display.width();
        display.clear(WHITE);
        display.fill_rect(0, 0, width, TITLE_BAR_HEIGHT, BLACK);
        display.draw_text(0, 5, &self.config.title, TITLE_STYLE, TextAlign::Center);
    }

    fn draw_status(&mut self, report: &BootReport) {
        let self_test = match report.self_test.first_failure() {
            None => "SDRAM Self Test : OK".to_string(),
            Some(step) => format!("SDRAM Self Test : FAILED ({})", step),
        };
        let lines = [
            status_text("SDRAM Initialization", &report.sdram_init),
            self_test,
            status_text("Touchscreen Initialization", &report.touch_init),
            status_text("Emulator ROM Load", &report.engine_load),
            format!("Core Clock: {} Hz", report.core_clock_hz),
        ];
        let display = self.board.display();
        for (i, line) in lines.iter().enumerate() {
            let y = STATUS_Y + i as u32 * STATUS_LINE_HEIGHT;
            display.draw_text(STATUS_X, y, line, STATUS_STYLE, TextAlign::Left);
        }
    }

    /// Forward one key event to the engine.
    pub fn update_key(&mut self, event: KeyEvent) -> Result<(), HostError> {
        Ok(self.engine.update_key(event)?)
    }

    /// Reset the engine's execution state, keeping the program image.
    pub fn reset(&mut self) -> Result<(), HostError> {
        Ok(self.engine.reset()?)
    }

    /// One iteration of the frame loop: input, render, blit, overlay.
    pub fn step_frame(&mut self) -> Result<(), HostError> {
        if self.config.touch_input {
            let touch = self.board.touch().poll();
            for event in self.keypad.update(touch) {
                self.engine.update_key(event)?;
            }
        }

        self.engine.render_into(&mut self.framebuffer)?;
        blit(self.board.display(), &self.framebuffer, &self.config.blit);

        if self.config.frame_counter {
            let (x, y) = COUNTER_POS;
            let text = self.frame_counter.to_string();
            self.board
                .display()
                .draw_text(x, y, &text, COUNTER_STYLE, TextAlign::Left);
        }

        log(LogCategory::Frame, LogLevel::Trace, || {
            format!("frame {} shown", self.frame_counter)
        });
        self.frame_counter += 1;
        Ok(())
    }

    /// Run the frame loop.
    ///
    /// Without a loaded program image the loop is skipped unless
    /// `run_on_load_failure` is set, in which case the first render is
    /// refused by the engine adapter.
    pub fn run(&mut self, limit: RunLimit) -> Result<RunOutcome, HostError> {
        if !self.engine.state().is_loaded() && !self.config.run_on_load_failure {
            log(LogCategory::Boot, LogLevel::Warn, || {
                format!("engine is {}, frame loop skipped", self.engine.state())
            });
            return Ok(RunOutcome::SkippedLoadFailed);
        }

        let mut frames = 0u64;
        loop {
            if let RunLimit::Frames(n) = limit {
                if frames >= n {
                    return Ok(RunOutcome::Completed { frames });
                }
            }
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                log(LogCategory::Boot, LogLevel::Info, || {
                    format!("frame loop cancelled after {} frames", frames)
                });
                return Ok(RunOutcome::Cancelled { frames });
            }
            self.step_frame()?;
            frames += 1;
        }
    }

    /// Production entry: render until power-off.
    pub fn run_forever(&mut self) -> Result<RunOutcome, HostError> {
        self.run(RunLimit::Forever)
    }

    /// Snapshot of the host state for debugging output.
    pub fn debug_state(&self) -> serde_json::Value {
        serde_json::json!({
            "engine_state": self.engine.state(),
            "engine_frames": self.engine.frames(),
            "frame_counter": self.frame_counter,
            "held_button": self.keypad.held(),
            "blit": self.config.blit,
            "framebuffer_blank": self.framebuffer.is_blank(),
            "boot": self.boot_report,
        })
    }
}
