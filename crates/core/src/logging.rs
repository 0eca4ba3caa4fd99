//! Centralized logging configuration for the cartridge bus engine.
//!
//! # Architecture
//!
//! - **LogConfig**: thread-safe global configuration using atomic operations
//! - **LogLevel**: hierarchical log levels (Off < Error < Warn < Info < Debug < Trace)
//! - **LogCategory**: per-subsystem categories (Arena, Flash, Loader, Menu, Scheme, Dispatcher, Ace)
//!
//! # Usage
//!
//! ```rust
//! use cart_core::logging::{LogConfig, LogLevel, LogCategory};
//!
//! LogConfig::global().set_level(LogCategory::Scheme, LogLevel::Debug);
//!
//! if LogConfig::global().should_log(LogCategory::Scheme, LogLevel::Info) {
//!     eprintln!("Scheme: bank switch");
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Log level for controlling verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
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

    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(val: u8) -> Self {
        match val {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category for the bus engine's major subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCategory {
    /// Memory arena placement and bank-pointer resolution.
    Arena,
    /// Flash erase/program state machine.
    Flash,
    /// Image loader staging.
    Loader,
    /// Menu/firmware cartridge mailbox and command handling.
    Menu,
    /// Scheme engine bank switches and decode decisions.
    Scheme,
    /// Boot-time dispatcher classification.
    Dispatcher,
    /// ACE header validation and native driver load.
    Ace,
}

/// Global logging configuration.
pub struct LogConfig {
    global_level: AtomicU8,
    arena_level: AtomicU8,
    flash_level: AtomicU8,
    loader_level: AtomicU8,
    menu_level: AtomicU8,
    scheme_level: AtomicU8,
    dispatcher_level: AtomicU8,
    ace_level: AtomicU8,
}

impl LogConfig {
    const fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            arena_level: AtomicU8::new(LogLevel::Off as u8),
            flash_level: AtomicU8::new(LogLevel::Off as u8),
            loader_level: AtomicU8::new(LogLevel::Off as u8),
            menu_level: AtomicU8::new(LogLevel::Off as u8),
            scheme_level: AtomicU8::new(LogLevel::Off as u8),
            dispatcher_level: AtomicU8::new(LogLevel::Off as u8),
            ace_level: AtomicU8::new(LogLevel::Off as u8),
        }
    }

    /// Get the global singleton instance.
    pub fn global() -> &'static Self {
        static INSTANCE: LogConfig = LogConfig::new();
        &INSTANCE
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level.to_u8(), Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    fn atomic_for(&self, category: LogCategory) -> &AtomicU8 {
        match category {
            LogCategory::Arena => &self.arena_level,
            LogCategory::Flash => &self.flash_level,
            LogCategory::Loader => &self.loader_level,
            LogCategory::Menu => &self.menu_level,
            LogCategory::Scheme => &self.scheme_level,
            LogCategory::Dispatcher => &self.dispatcher_level,
            LogCategory::Ace => &self.ace_level,
        }
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.atomic_for(category).store(level.to_u8(), Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.atomic_for(category).load(Ordering::Relaxed))
    }

    /// True if a message at `level` for `category` should be logged:
    /// a category-specific level, if set, takes precedence; otherwise
    /// the global level applies.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off.
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in [
            LogCategory::Arena,
            LogCategory::Flash,
            LogCategory::Loader,
            LogCategory::Menu,
            LogCategory::Scheme,
            LogCategory::Dispatcher,
            LogCategory::Ace,
        ] {
            self.set_level(category, LogLevel::Off);
        }
    }
}

/// Convenience macro for category-gated logging.
#[macro_export]
macro_rules! log {
    ($category:expr, $level:expr, $($arg:tt)*) => {
        if $crate::logging::LogConfig::global().should_log($category, $level) {
            eprintln!($($arg)*);
        }
    };
}
