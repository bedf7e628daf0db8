//! Category-based log filtering for the host pipeline.
//!
//! Every message goes through [`log`], which checks a per-category level
//! (falling back to a global level) before the message closure runs, so a
//! disabled category costs one atomic load. Enabled messages are handed to
//! the `log` crate facade under the target `host::<category>`; the frontend
//! decides where they end up (`env_logger` in `fbhost`).
//!
//! Per-frame categories can fire thousands of times per second, so each
//! category is also rate limited (60 messages per second by default). Dropped
//! messages are summarised once the window frees up.
//!
//! ```rust
//! use host_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::SelfTest, LogLevel::Info, || {
//!     format!("self-test passed at {:#010X}", 0xC020_0000u32)
//! });
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }

    /// Filter for the `log` backend that lets this level through.
    pub fn to_level_filter(self) -> log::LevelFilter {
        self.to_log()
            .map_or(log::LevelFilter::Off, |level| level.to_level_filter())
    }

    fn to_log(self) -> Option<log::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(log::Level::Error),
            LogLevel::Warn => Some(log::Level::Warn),
            LogLevel::Info => Some(log::Level::Info),
            LogLevel::Debug => Some(log::Level::Debug),
            LogLevel::Trace => Some(log::Level::Trace),
        }
    }
}

/// Which part of the host pipeline a message comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Boot sequence and board bring-up
    Boot,
    /// External memory self-test
    SelfTest,
    /// Display controller and status screen
    Display,
    /// Engine lifecycle transitions
    Engine,
    /// Touch sampling and key events
    Input,
    /// Per-frame render/blit
    Frame,
}

const CATEGORY_COUNT: usize = 6;

impl LogCategory {
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::Boot,
        LogCategory::SelfTest,
        LogCategory::Display,
        LogCategory::Engine,
        LogCategory::Input,
        LogCategory::Frame,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::Boot => 0,
            LogCategory::SelfTest => 1,
            LogCategory::Display => 2,
            LogCategory::Engine => 3,
            LogCategory::Input => 4,
            LogCategory::Frame => 5,
        }
    }

    /// `log` crate target for this category
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::Boot => "host::boot",
            LogCategory::SelfTest => "host::selftest",
            LogCategory::Display => "host::display",
            LogCategory::Engine => "host::engine",
            LogCategory::Input => "host::input",
            LogCategory::Frame => "host::frame",
        }
    }
}

/// Sliding one-second window per category
struct RateLimiter {
    max_per_second: AtomicUsize,
    windows: Mutex<[VecDeque<Instant>; CATEGORY_COUNT]>,
    dropped: Mutex<[usize; CATEGORY_COUNT]>,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            windows: Mutex::new(Default::default()),
            dropped: Mutex::new([0; CATEGORY_COUNT]),
        }
    }

    /// Returns whether the message may be emitted, and how many earlier
    /// messages were dropped if this is the first one through after a drop.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let idx = category.index();
        let (Ok(mut windows), Ok(mut dropped)) = (self.windows.lock(), self.dropped.lock()) else {
            // A poisoned lock only means another thread panicked mid-log
            return (true, None);
        };

        let window = &mut windows[idx];
        while let Some(&front) = window.front() {
            if now.duration_since(front) > Duration::from_secs(1) {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.max_per_second.load(Ordering::Relaxed) {
            window.push_back(now);
            let count = std::mem::take(&mut dropped[idx]);
            (true, (count > 0).then_some(count))
        } else {
            dropped[idx] += 1;
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; CATEGORY_COUNT],
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// All categories Off, global level Warn, 60 messages/second per category
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Warn as u8),
            category_levels: Default::default(),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    /// Override the level for one category; `Off` removes the override
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// Category override wins when set, otherwise the global level applies
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    pub fn set_rate_limit(&self, max_per_second: usize) {
        self.rate_limiter
            .max_per_second
            .store(max_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_per_second.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.set_global_level(LogLevel::Warn);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }
}

/// Log a message with the specified category and level.
///
/// The closure only runs when the category is enabled at `level` and the
/// rate limiter lets the message through.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }
    let Some(log_level) = level.to_log() else {
        return;
    };

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped {
        log::log!(
            target: category.target(),
            log::Level::Warn,
            "rate limit exceeded, {} message(s) dropped",
            count
        );
    }
    if allowed {
        log::log!(target: category.target(), log_level, "{}", message_fn());
    }
}
