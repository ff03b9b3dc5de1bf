#![deny(missing_docs)]
//! Shared logging utilities for the tasksync workspace.
//!
//! Every crate logs through the `sync_*` macros below so that log records
//! carry the common `tasksync` target, which keeps third-party noise
//! (reqwest, hyper) filterable from the app's logger configuration.

/// Target prefix used by all `sync_*` macros.
pub const TARGET_PREFIX: &str = "tasksync";

/// Logs a trace-level message under the workspace target.
#[macro_export]
macro_rules! sync_trace {
    ($($arg:tt)*) => {{
        log::trace!(target: $crate::TARGET_PREFIX, $($arg)*);
    }};
}

/// Logs a debug-level message under the workspace target.
#[macro_export]
macro_rules! sync_debug {
    ($($arg:tt)*) => {{
        log::debug!(target: $crate::TARGET_PREFIX, $($arg)*);
    }};
}

/// Logs an info-level message under the workspace target.
#[macro_export]
macro_rules! sync_info {
    ($($arg:tt)*) => {{
        log::info!(target: $crate::TARGET_PREFIX, $($arg)*);
    }};
}

/// Logs a warn-level message under the workspace target.
#[macro_export]
macro_rules! sync_warn {
    ($($arg:tt)*) => {{
        log::warn!(target: $crate::TARGET_PREFIX, $($arg)*);
    }};
}

/// Logs an error-level message under the workspace target.
#[macro_export]
macro_rules! sync_error {
    ($($arg:tt)*) => {{
        log::error!(target: $crate::TARGET_PREFIX, $($arg)*);
    }};
}

/// Initializes a terminal logger for use in tests.
///
/// Safe to call from every test: it no-ops if a logger is already installed.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str(TARGET_PREFIX)
        .build();

    // Another test may have won the race; that logger is just as good.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
