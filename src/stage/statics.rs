//! Statics copy stage.
//!
//! Copies every non-script, non-style asset matched by the statics glob
//! into the staging public tree, preserving relative layout. A missing
//! source tree yields zero files, not an error.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::{debug, log};

/// Copy all matched statics; returns the number of files copied.
pub fn run(config: &PipelineConfig) -> Result<usize> {
    let files: Vec<(PathBuf, PathBuf)> = config.statics_glob().list();
    if files.is_empty() {
        debug!("statics"; "nothing matched {}", config.resolved.statics_glob);
        return Ok(0);
    }

    let dest = config.root_join(&config.resolved.statics_dest);

    files.par_iter().try_for_each(|(abs, rel)| {
        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::copy(abs, &target)
            .with_context(|| format!("Failed to copy {} → {}", abs.display(), target.display()))?;
        Ok::<(), anyhow::Error>(())
    })?;

    log!("statics"; "{} files → {}", files.len(), dest.display());
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> (TempDir, PipelineConfig) {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = dir.path().join("src").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let mut config = PipelineConfig::default();
        config.root = dir.path().to_path_buf();
        (dir, config)
    }

    #[test]
    fn test_copies_non_script_assets() {
        let (dir, config) = setup(&[
            ("images/logo.png", "png"),
            ("fonts/deep/font.woff2", "woff"),
            ("js/client.js", "skip"),
            ("css/plain.css", "skip"),
        ]);

        let count = run(&config).unwrap();
        assert_eq!(count, 2);

        let out = dir.path().join("tmp_build/public");
        assert!(out.join("images/logo.png").is_file());
        assert!(out.join("fonts/deep/font.woff2").is_file());
        assert!(!out.join("js/client.js").exists());
        assert!(!out.join("css/plain.css").exists());
    }

    #[test]
    fn test_style_sources_are_statics_too() {
        // The default glob only excludes compiled script/style extensions;
        // raw .scss sources ride along into staging.
        let (dir, config) = setup(&[("css/theme.scss", "$a: 1;")]);
        let count = run(&config).unwrap();
        assert_eq!(count, 1);
        assert!(dir.path().join("tmp_build/public/css/theme.scss").is_file());
    }

    #[test]
    fn test_missing_source_tree_is_zero() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.root = dir.path().to_path_buf();
        assert_eq!(run(&config).unwrap(), 0);
    }
}
