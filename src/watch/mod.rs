//! Rebuild-on-change orchestration.
//!
//! One notify watcher covers the union of the registered watch roots.
//! Events flow through the debouncer, settled batches are classified to
//! the stages whose input globs contain the changed paths, and those
//! stages re-run through the same actions the task runner uses.
//!
//! Failure semantics: a failed rebuild logs, leaves the previous output
//! intact and flags the stage; the next settled batch clears the flag and
//! forces a fresh run of the flagged stage regardless of what changed
//! (single immediate retry on next trigger, no backoff).

mod debounce;

pub use debounce::{ChangeKind, Debouncer};

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver};
use notify::{RecursiveMode, Watcher};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::PipelineConfig;
use crate::core::is_shutdown;
use crate::log;
use crate::logger::{status_error, status_success};
use crate::task::{Action, execute_action};
use crate::utils::glob::Glob;
use crate::utils::path::unix_rel;

/// Upper bound on one poll interval, so shutdown is observed promptly.
const POLL_MS: u64 = 500;

/// A registered rebuild rule: changes matching `glob` re-run `action`.
pub struct WatchRule {
    pub glob: Glob,
    pub action: Action,
}

/// Derive the watch rules for a set of registered watch actions.
pub fn rules_for(config: &PipelineConfig, watches: &[Action]) -> Vec<WatchRule> {
    watches
        .iter()
        .filter_map(|watch| {
            let action = watch.rebuild_target()?;
            let glob = match action {
                Action::Compile => {
                    Glob::parse(&format!("{}/**/*", config.resolved.js_src), &config.root)
                }
                Action::Style => config.sass_glob(),
                Action::Statics => config.statics_glob(),
                Action::Dist => config.dist_glob(),
                _ => return None,
            };
            Some(WatchRule { glob, action })
        })
        .collect()
}

/// Run the watch loop until shutdown. Blocks the calling thread.
pub fn run(config: &PipelineConfig, rules: Vec<WatchRule>) -> Result<()> {
    if rules.is_empty() {
        return Ok(());
    }

    let (_watcher, events) = start_watcher(&rules)?;

    for rule in &rules {
        log!("watch"; "{} ← {}", rule.action.label(), rule.glob.root().display());
    }

    let mut debouncer = Debouncer::new();
    // Stages whose last run failed; retried on the next settled batch
    let mut unhealthy: FxHashSet<Action> = FxHashSet::default();

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

        let mut triggered = classify(&batch, &rules);
        // Self-healing retry: clear the error flags and fold the flagged
        // stages into this run
        triggered.extend(unhealthy.drain());

        for action in ordered(&triggered) {
            match execute_action(config, action) {
                Ok(()) => status_success(&format!("rebuilt: {}", action.label())),
                Err(e) => {
                    status_error(&format!("failed: {}", action.label()), &format!("{e:#}"));
                    unhealthy.insert(action);
                }
            }
        }
    }

    Ok(())
}

/// Start the notify watcher over the deduplicated rule roots and bridge
/// its callback into a crossbeam channel.
fn start_watcher(rules: &[WatchRule]) -> Result<(notify::RecommendedWatcher, Receiver<notify::Event>)> {
    let (tx, rx) = channel::unbounded();

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        match result {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => log!("watch"; "notify error: {}", e),
        }
    })
    .context("Failed to create file watcher")?;

    let mut roots: Vec<&Path> = rules.iter().map(|r| r.glob.root()).collect();
    roots.sort();
    roots.dedup();

    for root in roots {
        // A missing root (e.g. staging before the first build) is fine;
        // the producing stage creates it and the next dev run attaches it
        if root.exists() {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch {}", root.display()))?;
        } else {
            log!("watch"; "skipping missing root {}", root.display());
        }
    }

    Ok((watcher, rx))
}

/// Map a settled batch of changed paths to the set of stages to re-run.
fn classify(batch: &FxHashMap<PathBuf, ChangeKind>, rules: &[WatchRule]) -> FxHashSet<Action> {
    let mut actions = FxHashSet::default();
    for path in batch.keys() {
        for rule in rules {
            if actions.contains(&rule.action) {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(rule.glob.root())
                && rule.glob.matches(&unix_rel(rel))
            {
                actions.insert(rule.action);
            }
        }
    }
    actions
}

/// Fixed execution order: producing stages before the revisioner, so a
/// batch touching both source and staging revisions fresh output.
fn ordered(actions: &FxHashSet<Action>) -> Vec<Action> {
    [Action::Compile, Action::Style, Action::Statics, Action::Dist]
        .into_iter()
        .filter(|a| actions.contains(a))
        .collect()
}
