//! Compile stage: the external module bundler.
//!
//! One source directory, two targets:
//! - client: bundled for the browser into the staging public tree
//! - server: bundled for node next to the staging root
//!
//! The bundler itself is whatever `[bundler] command` says; this stage only
//! derives the per-target variables, appends the mode arguments and runs it.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;

use crate::config::PipelineConfig;
use crate::log;
use crate::utils::exec::Cmd;

use super::resolve_args;

/// A single bundler invocation.
struct Target {
    name: &'static str,
    entry: PathBuf,
    outfile: PathBuf,
    platform: &'static str,
}

/// Derive the client and server targets from the resolved paths.
fn targets(config: &PipelineConfig) -> [Target; 2] {
    let paths = &config.resolved;
    [
        Target {
            name: "client",
            entry: config.js_entry(&paths.client_file),
            outfile: config.root_join(&paths.client_dest).join(&paths.client_file),
            platform: "browser",
        },
        Target {
            name: "server",
            entry: config.js_entry(&paths.server_file),
            outfile: config.root_join(&paths.server_dest).join(&paths.server_file),
            platform: "node",
        },
    ]
}

/// Run the bundler for both targets.
///
/// Each target is attempted even if the other failed; the stage reports a
/// combined error afterwards so the task runner can apply its failure
/// policy.
pub fn run(config: &PipelineConfig) -> Result<()> {
    let mut failures = Vec::new();

    for target in targets(config) {
        match run_target(config, &target) {
            Ok(()) => log!("bundle"; "{} → {}", target.name, target.outfile.display()),
            Err(e) => {
                log!("error"; "bundle {} failed: {:#}", target.name, e);
                failures.push(target.name);
            }
        }
    }

    if !failures.is_empty() {
        bail!("bundler failed for: {}", failures.join(", "));
    }
    Ok(())
}

/// Run the bundler for one target.
fn run_target(config: &PipelineConfig, target: &Target) -> Result<()> {
    if let Some(parent) = target.outfile.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut vars = FxHashMap::default();
    vars.insert(
        "STAMP_ENTRY".to_string(),
        target.entry.to_string_lossy().into_owned(),
    );
    vars.insert(
        "STAMP_OUTFILE".to_string(),
        target.outfile.to_string_lossy().into_owned(),
    );
    vars.insert("STAMP_PLATFORM".to_string(), target.platform.to_string());

    let mut resolved = resolve_args(&config.bundler.command, &vars);
    let mode_args = if config.mode.is_production() {
        &config.bundler.production_args
    } else {
        &config.bundler.dev_args
    };
    resolved.extend(resolve_args(mode_args, &vars));

    Cmd::from_slice(&resolved)
        .cwd(&config.root)
        .envs(vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .run()?;
    Ok(())
}
