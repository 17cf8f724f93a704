//! Server process supervision.
//!
//! Spawns the configured server command, watches the distribution tree
//! and restarts the process when its files change. Each restart feeds the
//! reload debouncer; once restarts settle, connected browsers are told to
//! reload.
//!
//! A crashed server is not respawned eagerly - like the change-driven
//! contract everywhere else, the next output change restarts it.

use std::process::{Child, Command};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver};
use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashMap;

use crate::config::PipelineConfig;
use crate::core::is_shutdown;
use crate::log;
use crate::logger::status_success;
use crate::serve::{ReloadServer, RestartDebouncer};
use crate::utils::glob::Glob;
use crate::utils::path::unix_rel;
use crate::watch::{ChangeKind, Debouncer};

/// Upper bound on one poll interval, so shutdown is observed promptly.
const POLL_MS: u64 = 500;

/// Spawn the supervisor on its own thread.
pub fn spawn(
    config: &PipelineConfig,
    reload: ReloadServer,
) -> Result<std::thread::JoinHandle<()>> {
    let command = config.server_command();
    let root = config.root.clone();
    let glob = config.watch_glob();
    let window = Duration::from_millis(config.serve.livereload_timeout_ms);

    // Make sure the watch root exists before the first build produced it
    std::fs::create_dir_all(glob.root())
        .with_context(|| format!("Failed to create {}", glob.root().display()))?;

    let handle = std::thread::Builder::new()
        .name("supervisor".into())
        .spawn(move || run_loop(command, root, glob, window, reload))
        .context("Failed to spawn supervisor thread")?;
    Ok(handle)
}

/// Supervisor loop body.
fn run_loop(
    command: Vec<String>,
    root: std::path::PathBuf,
    glob: Glob,
    window: Duration,
    reload: ReloadServer,
) {
    let reload_debounce = RestartDebouncer::start(window, move || {
        status_success("reloading browsers");
        reload.broadcast_reload();
    });

    let (_watcher, events) = match start_watcher(&glob) {
        Ok(pair) => pair,
        Err(e) => {
            log!("error"; "supervisor watch failed: {:#}", e);
            return;
        }
    };

    let mut child = launch(&command, &root);
    let mut debouncer = Debouncer::new();

    while !is_shutdown() {
        let timeout = debouncer
            .sleep_duration()
            .min(Duration::from_millis(POLL_MS));

        match events.recv_timeout(timeout) {
            Ok(event) => debouncer.add_event(&event),
            Err(channel::RecvTimeoutError::Timeout) => {}
            Err(channel::RecvTimeoutError::Disconnected) => break,
        }

        let Some(batch) = debouncer.take_if_ready() else {
            continue;
        };

        if !batch_matches(&batch, &glob) {
            continue;
        }

        log!("serve"; "output changed, restarting server");
        stop(&mut child);
        child = launch(&command, &root);
        reload_debounce.signal();
    }

    stop(&mut child);
}

/// Start the server process; failure is logged, not fatal - the next
/// output change tries again.
fn launch(command: &[String], root: &std::path::Path) -> Option<Child> {
    let (program, args) = command.split_first()?;
    match Command::new(program).args(args).current_dir(root).spawn() {
        Ok(child) => {
            log!("serve"; "started `{}` (pid {})", command.join(" "), child.id());
            Some(child)
        }
        Err(e) => {
            log!("error"; "failed to start `{}`: {}", command.join(" "), e);
            None
        }
    }
}

/// Kill and reap the server process.
fn stop(child: &mut Option<Child>) {
    if let Some(mut child) = child.take() {
        let _ = child.kill();
        let _ = child.wait();
    }
}

/// Check whether any changed path in the batch falls under the watch glob.
fn batch_matches(batch: &FxHashMap<std::path::PathBuf, ChangeKind>, glob: &Glob) -> bool {
    batch.keys().any(|path| {
        path.strip_prefix(glob.root())
            .is_ok_and(|rel| glob.matches(&unix_rel(rel)))
    })
}

/// Watch the glob root, bridging notify events into a crossbeam channel.
///
/// The returned watcher must stay alive for events to keep flowing.
fn start_watcher(glob: &Glob) -> Result<(notify::RecommendedWatcher, Receiver<notify::Event>)> {
    let (tx, rx) = channel::unbounded();

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        if let Ok(event) = result {
            let _ = tx.send(event);
        }
    })
    .context("Failed to create supervisor watcher")?;

    watcher
        .watch(glob.root(), RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", glob.root().display()))?;

    Ok((watcher, rx))
}
