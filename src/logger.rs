//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro gated on the global verbose flag
//! - `WatchStatus` for single-line status display in watch mode
//!
//! # Example
//!
//! ```ignore
//! log!("bundle"; "compiling {} targets", count);
//! debug!("watch"; "raw event: {:?}", event);
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" | "reload" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Watch Status (single-line status with overwrite)
// ============================================================================

/// Get current time formatted as HH:MM:SS (UTC)
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Single-line status display for watch mode
///
/// Displays status messages that overwrite the previous output,
/// keeping the terminal clean during long watch sessions.
pub struct WatchStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

/// Global watch status display shared across watch-mode subsystems.
///
/// Rebuild/reload/supervisor phases overwrite each other's status block
/// instead of leaving stale error blocks in the terminal.
static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    /// Create a new watch status display.
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display(format!("{}", "✗".red()), &message);
    }

    /// Internal display logic with line overwriting.
    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        let line = format!("{timestamp} {symbol} {message}");

        writeln!(stdout, "{line}").ok();
        stdout.flush().ok();

        // Track actual line count (including newlines in message)
        self.last_lines = message.matches('\n').count() + 1;
    }
}

/// Global watch status: success
pub fn status_success(message: &str) {
    WATCH_STATUS.lock().success(message);
}

/// Global watch status: error
pub fn status_error(summary: &str, detail: &str) {
    WATCH_STATUS.lock().error(summary, detail);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_status_new() {
        let status = WatchStatus::new();
        assert_eq!(status.last_lines, 0);
    }

    #[test]
    fn test_watch_status_line_count_multiline() {
        let message = "failed: style\nerror: undefined variable\n  --> line 5";
        let count = message.matches('\n').count() + 1;
        assert_eq!(count, 3);
    }

    #[test]
    fn test_now_shape() {
        let t = now();
        assert_eq!(t.len(), 8);
        assert_eq!(t.as_bytes()[2], b':');
        assert_eq!(t.as_bytes()[5], b':');
    }
}
