//! Command-line interface module.

mod args;

pub use args::{Cli, Commands};

use anyhow::{Result, bail};

use crate::config::PipelineConfig;
use crate::core::is_shutdown;
use crate::log;
use crate::serve::{ReloadServer, supervisor};
use crate::task::{self, RunSummary};
use crate::watch;

/// `stamp build`: full pipeline into the distribution tree.
///
/// Producing-stage failures are tolerated during the run so the remaining
/// stages still report, but they surface as a non-zero exit here.
pub fn run_build(config: &PipelineConfig) -> Result<()> {
    config.validate(false)?;

    let summary = task::run_tasks(config, &["build"])?;
    if !summary.is_clean() {
        bail!(
            "build completed with failed stage(s): {}",
            summary.failed.join(", ")
        );
    }
    log!("build"; "done");
    Ok(())
}

/// `stamp dev`: watchers + server supervision + live reload.
pub fn run_dev(config: &PipelineConfig) -> Result<()> {
    config.validate(true)?;

    let summary = task::run_tasks(config, &["dev"])?;
    enter_watch_mode(config, summary)
}

/// `stamp clean`: remove staging and/or distribution trees.
pub fn run_clean(config: &PipelineConfig, staging: bool, dist: bool) -> Result<()> {
    let targets: &[&str] = match (staging, dist) {
        (true, false) => &["clean:staging"],
        (false, true) => &["clean:dist"],
        _ => &["clean"],
    };
    task::run_tasks(config, targets)?;
    log!("clean"; "done");
    Ok(())
}

/// `stamp run <task>...`: arbitrary pipeline tasks. When any `:watch`
/// task was requested the command stays resident like `dev`.
pub fn run_named(config: &PipelineConfig, tasks: &[String]) -> Result<()> {
    let wants_serve = tasks.iter().any(|t| t == "serve:watch" || t == "dev");
    config.validate(wants_serve)?;

    let targets: Vec<&str> = tasks.iter().map(String::as_str).collect();
    let summary = task::run_tasks(config, &targets)?;

    if summary.serve || !summary.watches.is_empty() {
        return enter_watch_mode(config, summary);
    }

    if !summary.is_clean() {
        bail!("failed task(s): {}", summary.failed.join(", "));
    }
    Ok(())
}

/// `stamp tasks`: list the pipeline's task names.
pub fn list_tasks() {
    for name in task::pipeline().names() {
        println!("{name}");
    }
}

/// Stay resident: start supervision if requested, then run the watch
/// loop (or just idle until Ctrl+C when watching is disabled).
fn enter_watch_mode(config: &PipelineConfig, summary: RunSummary) -> Result<()> {
    let _supervisor = if summary.serve {
        let (reload, port) = ReloadServer::start(config.serve.reload_port)?;
        log!("serve"; "reload clients on ws://127.0.0.1:{port}");
        Some(supervisor::spawn(config, reload)?)
    } else {
        None
    };

    if config.serve.watch && !summary.watches.is_empty() {
        let rules = watch::rules_for(config, &summary.watches);
        watch::run(config, rules)?;
    } else {
        while !is_shutdown() {
            std::thread::sleep(std::time::Duration::from_millis(200));
        }
    }
    Ok(())
}
