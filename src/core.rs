//! Build mode and process-wide run state.
//!
//! Two globals live here:
//! - `SHUTDOWN`: set by the Ctrl+C handler, observed by every long-running
//!   loop (watcher, supervisor, reload debouncer)
//! - the build mode is NOT global - it is carried by the configuration
//!   struct so stages stay pure functions of their inputs

use std::sync::atomic::{AtomicBool, Ordering};

/// Production vs development build mode.
///
/// Production selects minified bundler output and compressed style output;
/// development keeps source maps and expanded styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    Production,
    #[default]
    Development,
}

impl BuildMode {
    /// True in production mode.
    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }
}

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// Long-running loops poll `is_shutdown()` with bounded timeouts, so the
/// process winds down within one poll interval of the signal.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            // Second Ctrl+C: the user means it
            std::process::exit(130);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering for performance - worst case is processing
/// a few more events before stopping, which is acceptable
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
