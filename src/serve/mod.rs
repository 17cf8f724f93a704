//! Server supervision and browser live reload.
//!
//! Three cooperating pieces:
//! - `supervisor`: restarts the server process when its output tree changes
//! - `debounce`: coalesces restart bursts into one reload signal
//! - `reload`: the websocket channel browsers listen on

mod debounce;
mod reload;
pub mod supervisor;

pub use debounce::RestartDebouncer;
pub use reload::ReloadServer;
