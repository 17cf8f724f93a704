//! Named build tasks and the fixed pipeline topology.
//!
//! The pipeline exposes string-named tasks (`compile`, `style`, `statics`,
//! `dist`, their `:watch` variants, the clean tasks, `build`, `dev`) wired
//! into one explicit dependency graph. There is exactly one topology;
//! nothing here is a general build system.
//!
//! Failure policy (`tolerant`): the producing stages log their failure and
//! still signal completion - a broken bundle must not tear down a watch
//! session. The revisioning and clean tasks propagate failure.

pub mod graph;

pub use graph::TaskGraph;

use anyhow::Result;
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::{log, rev, stage};

/// Typed leaf actions.
///
/// Tasks carry an `Action` instead of a boxed closure so the registry is a
/// plain static table and the watch loop can re-run actions by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Compile,
    Style,
    Statics,
    Dist,
    CleanStaging,
    CleanDist,
    /// Register a rebuild watch for the compile stage.
    WatchCompile,
    /// Register a rebuild watch for the style stage.
    WatchStyle,
    /// Register a rebuild watch for the statics stage.
    WatchStatics,
    /// Register a rebuild watch for the revisioning stage.
    WatchDist,
    /// Register server supervision + browser reload.
    Serve,
}

impl Action {
    /// The stage an event-triggered watch re-runs, if this is a watch action.
    pub fn rebuild_target(self) -> Option<Action> {
        match self {
            Action::WatchCompile => Some(Action::Compile),
            Action::WatchStyle => Some(Action::Style),
            Action::WatchStatics => Some(Action::Statics),
            Action::WatchDist => Some(Action::Dist),
            _ => None,
        }
    }

    /// True for registration-only actions (watch variants and serve).
    pub fn is_registration(self) -> bool {
        self == Action::Serve || self.rebuild_target().is_some()
    }

    /// Short label for status output.
    pub fn label(self) -> &'static str {
        match self {
            Action::Compile | Action::WatchCompile => "compile",
            Action::Style | Action::WatchStyle => "style",
            Action::Statics | Action::WatchStatics => "statics",
            Action::Dist | Action::WatchDist => "dist",
            Action::CleanStaging => "clean:staging",
            Action::CleanDist => "clean:dist",
            Action::Serve => "serve",
        }
    }
}

/// A named unit of work: a leaf action or a composite dependency list.
#[derive(Debug)]
pub struct Task {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub action: Option<Action>,
    /// Log-and-continue on failure instead of aborting the run.
    pub tolerant: bool,
}

impl Task {
    const fn leaf(name: &'static str, action: Action, tolerant: bool) -> Self {
        Self {
            name,
            deps: &[],
            action: Some(action),
            tolerant,
        }
    }

    const fn composite(name: &'static str, deps: &'static [&'static str]) -> Self {
        Self {
            name,
            deps,
            action: None,
            tolerant: false,
        }
    }
}

/// Build the fixed pipeline graph.
pub fn pipeline() -> TaskGraph {
    TaskGraph::new(vec![
        Task::leaf("compile", Action::Compile, true),
        Task::leaf("compile:watch", Action::WatchCompile, true),
        Task::leaf("style", Action::Style, true),
        Task::leaf("style:watch", Action::WatchStyle, true),
        Task::leaf("statics", Action::Statics, true),
        Task::leaf("statics:watch", Action::WatchStatics, true),
        // The revisioner must never read a staging tree mid-write; that
        // ordering lives here, in the graph, not in any lock.
        Task {
            name: "dist",
            deps: &["compile", "style", "statics"],
            action: Some(Action::Dist),
            tolerant: false,
        },
        Task::leaf("dist:watch", Action::WatchDist, true),
        Task::leaf("clean:staging", Action::CleanStaging, false),
        Task::leaf("clean:dist", Action::CleanDist, false),
        Task::composite("clean", &["clean:staging", "clean:dist"]),
        Task::leaf("serve:watch", Action::Serve, true),
        Task::composite("build", &["compile", "style", "statics", "dist"]),
        Task::composite(
            "dev",
            &[
                "serve:watch",
                "compile:watch",
                "style:watch",
                "statics:watch",
                "dist:watch",
            ],
        ),
    ])
    .expect("fixed pipeline topology is valid")
}

/// Outcome of a task run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Tolerant tasks that failed (already logged).
    pub failed: Vec<&'static str>,
    /// Watch registrations collected from `:watch` tasks.
    pub watches: Vec<Action>,
    /// Whether `serve:watch` was requested.
    pub serve: bool,
}

impl RunSummary {
    /// True when every executed task succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Execute a stage action. Registration actions are no-ops here; the
/// runner records them in the summary instead.
pub fn execute_action(config: &PipelineConfig, action: Action) -> Result<()> {
    match action {
        Action::Compile => stage::compile::run(config),
        Action::Style => stage::style::run(config),
        Action::Statics => stage::statics::run(config).map(|_| ()),
        Action::Dist => rev::run(config).map(|_| ()),
        Action::CleanStaging => stage::clean::clean_staging(config),
        Action::CleanDist => stage::clean::clean_dist(config),
        _ => Ok(()),
    }
}

/// Run the given targets through the pipeline graph.
///
/// Waves run in dependency order; tasks within a wave run in parallel.
/// A tolerant task's failure is logged and recorded; any other failure
/// aborts the run.
pub fn run_tasks(config: &PipelineConfig, targets: &[&str]) -> Result<RunSummary> {
    let graph = pipeline();
    let waves = graph.execution_waves(targets)?;

    let mut summary = RunSummary::default();

    for wave in waves {
        let results: Vec<(&'static str, Result<()>)> = wave
            .par_iter()
            .map(|&name| {
                let task = graph.get(name).expect("wave names come from the graph");
                let result = match task.action {
                    Some(action) if !action.is_registration() => {
                        execute_action(config, action)
                    }
                    _ => Ok(()),
                };
                (name, result)
            })
            .collect();

        for (name, result) in results {
            let task = graph.get(name).expect("wave names come from the graph");

            match task.action {
                Some(Action::Serve) => summary.serve = true,
                Some(action) if action.rebuild_target().is_some() => {
                    summary.watches.push(action);
                }
                _ => {}
            }

            if let Err(e) = result {
                if task.tolerant {
                    log!("error"; "task `{}` failed: {:#}", name, e);
                    summary.failed.push(name);
                } else {
                    return Err(e.context(format!("task `{name}` failed")));
                }
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_with_stub_tools(dir: &TempDir) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.root = dir.path().to_path_buf();
        config.bundler.command = vec!["true".into()];
        config.bundler.production_args.clear();
        config.bundler.dev_args.clear();
        config.style.command = vec!["true".into()];
        config.style.production_args.clear();
        config.style.dev_args.clear();
        config
    }

    #[test]
    fn test_pipeline_is_valid() {
        let graph = pipeline();
        assert!(graph.get("build").is_some());
        assert!(graph.get("dev").is_some());
    }

    #[test]
    fn test_build_wave_order() {
        let graph = pipeline();
        let waves = graph.execution_waves(&["build"]).unwrap();

        assert_eq!(waves[0], vec!["compile", "style", "statics"]);
        assert_eq!(waves[1], vec!["dist"]);
        assert_eq!(waves[2], vec!["build"]);
    }

    #[test]
    fn test_dev_collects_watches_and_serve() {
        let dir = TempDir::new().unwrap();
        let config = config_with_stub_tools(&dir);

        let summary = run_tasks(&config, &["dev"]).unwrap();
        assert!(summary.serve);
        assert_eq!(summary.watches.len(), 4);
        assert!(summary.watches.contains(&Action::WatchDist));
    }

    #[test]
    fn test_tolerant_failure_recorded_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let mut config = config_with_stub_tools(&dir);
        config.bundler.command = vec!["false".into()];

        // compile fails (tolerant), the rest of the build still runs and
        // the revisioner consumes whatever staging contains
        let summary = run_tasks(&config, &["build"]).unwrap();
        assert_eq!(summary.failed, vec!["compile"]);
        assert!(!summary.is_clean());
        assert!(dir.path().join("dist").is_dir());
    }

    #[test]
    fn test_strict_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let mut config = config_with_stub_tools(&dir);
        // A file where the staging directory should be: the producing
        // stages fail tolerantly, then the revisioner fails hard
        fs::write(dir.path().join("tmp_build"), "not a directory").unwrap();

        assert!(run_tasks(&config, &["build"]).is_err());
    }

    #[test]
    fn test_clean_runs_both_removals() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("tmp_build")).unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        let config = config_with_stub_tools(&dir);

        let summary = run_tasks(&config, &["clean"]).unwrap();
        assert!(summary.is_clean());
        assert!(!dir.path().join("tmp_build").exists());
        assert!(!dir.path().join("dist").exists());
    }

    #[test]
    fn test_rebuild_target_mapping() {
        assert_eq!(Action::WatchCompile.rebuild_target(), Some(Action::Compile));
        assert_eq!(Action::WatchDist.rebuild_target(), Some(Action::Dist));
        assert_eq!(Action::Dist.rebuild_target(), None);
        assert!(Action::Serve.is_registration());
        assert!(!Action::Compile.is_registration());
    }
}
