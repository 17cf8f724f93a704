//! Style stage: the external stylesheet compiler.
//!
//! Compiles every non-partial source matched by the sass glob into the
//! staging css directory, preserving relative layout. A failing source is
//! logged and skipped; the remaining files still compile. When a
//! vendor-prefixer is configured, each produced stylesheet is piped
//! through it on stdin.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::PipelineConfig;
use crate::{debug, log};
use crate::utils::exec::Cmd;

use super::resolve_args;

/// Run the style stage over all matched sources.
pub fn run(config: &PipelineConfig) -> Result<()> {
    let sources: Vec<(PathBuf, PathBuf)> = config
        .sass_glob()
        .list()
        .into_iter()
        .filter(|(_, rel)| !is_partial(rel))
        .collect();

    if sources.is_empty() {
        debug!("style"; "no style sources matched {}", config.resolved.sass_glob);
        return Ok(());
    }

    let dest = config.root_join(&config.resolved.sass_dest);
    let failures = AtomicUsize::new(0);

    sources.par_iter().for_each(|(abs, rel)| {
        if let Err(e) = compile_file(config, abs, rel, &dest) {
            // Per-file error hook: log and keep compiling the rest
            log!("error"; "style {} failed: {:#}", rel.display(), e);
            failures.fetch_add(1, Ordering::Relaxed);
        }
    });

    let failed = failures.load(Ordering::Relaxed);
    if failed > 0 {
        bail!("{failed} of {} style sources failed", sources.len());
    }

    log!("style"; "{} stylesheets → {}", sources.len(), dest.display());
    Ok(())
}

/// Partials (leading underscore) are import-only; the compiler inlines
/// them into their importers.
fn is_partial(rel: &Path) -> bool {
    rel.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Compile one source file into `dest`, preserving its relative directory.
fn compile_file(config: &PipelineConfig, abs: &Path, rel: &Path, dest: &Path) -> Result<()> {
    let output = dest.join(rel.with_extension("css"));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut vars = FxHashMap::default();
    vars.insert(
        "STAMP_INPUT".to_string(),
        abs.to_string_lossy().into_owned(),
    );
    vars.insert(
        "STAMP_OUTPUT".to_string(),
        output.to_string_lossy().into_owned(),
    );

    let mut resolved = resolve_args(&config.style.command, &vars);
    for include in &config.style.include_paths {
        resolved.push(format!("--load-path={include}"));
    }
    let mode_args = if config.mode.is_production() {
        &config.style.production_args
    } else {
        &config.style.dev_args
    };
    resolved.extend(resolve_args(mode_args, &vars));

    Cmd::from_slice(&resolved).cwd(&config.root).run()?;

    if let Some(prefixer) = &config.style.autoprefixer {
        apply_prefixer(prefixer, &output)?;
    }

    Ok(())
}

/// Pipe a compiled stylesheet through the vendor-prefixer command.
fn apply_prefixer(prefixer: &[String], output: &Path) -> Result<()> {
    let css =
        fs::read(output).with_context(|| format!("Failed to read {}", output.display()))?;
    let prefixed = Cmd::from_slice(prefixer).stdin(css).run()?;
    fs::write(output, prefixed.stdout)
        .with_context(|| format!("Failed to write {}", output.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(sources: &[(&str, &str)]) -> (TempDir, PipelineConfig) {
        let dir = TempDir::new().unwrap();
        for (rel, content) in sources {
            let path = dir.path().join("src/css").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let mut config = PipelineConfig::default();
        config.root = dir.path().to_path_buf();
        (dir, config)
    }

    #[test]
    fn test_is_partial() {
        assert!(is_partial(Path::new("_variables.scss")));
        assert!(is_partial(Path::new("nested/_mixins.scss")));
        assert!(!is_partial(Path::new("app.scss")));
    }

    #[test]
    fn test_partials_skipped_and_layout_preserved() {
        // A fake compiler that copies input to output exercises the full
        // stage without requiring sass on the test machine.
        let (dir, mut config) = setup(&[
            ("app.scss", "body {}"),
            ("_variables.scss", "$x: 1;"),
            ("nested/theme.scss", "h1 {}"),
        ]);
        config.style.command = vec!["cp".into(), "$STAMP_INPUT".into(), "$STAMP_OUTPUT".into()];
        config.style.production_args.clear();
        config.style.dev_args.clear();

        run(&config).unwrap();

        let out = dir.path().join("tmp_build/public/css");
        assert!(out.join("app.css").is_file());
        assert!(out.join("nested/theme.css").is_file());
        assert!(!out.join("_variables.css").exists());
    }

    #[test]
    fn test_no_sources_is_ok() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.root = dir.path().to_path_buf();
        run(&config).unwrap();
    }

    #[test]
    fn test_failures_counted_but_all_attempted() {
        let (dir, mut config) = setup(&[("a.scss", "x"), ("b.scss", "y")]);
        config.style.command = vec!["false".into()];
        config.style.production_args.clear();
        config.style.dev_args.clear();

        let err = run(&config).unwrap_err().to_string();
        assert!(err.contains("2 of 2"), "unexpected error: {err}");
        drop(dir);
    }

    #[test]
    fn test_prefixer_pipe_replaces_output() {
        let (dir, mut config) = setup(&[("app.scss", "body{}")]);
        config.style.command = vec!["cp".into(), "$STAMP_INPUT".into(), "$STAMP_OUTPUT".into()];
        config.style.production_args.clear();
        config.style.dev_args.clear();
        // `tr` as a stand-in prefixer: uppercases the css on stdout
        config.style.autoprefixer = Some(vec!["tr".into(), "a-z".into(), "A-Z".into()]);

        run(&config).unwrap();

        let css = fs::read_to_string(dir.path().join("tmp_build/public/css/app.css")).unwrap();
        assert_eq!(css, "BODY{}");
    }
}
