//! Cleanup tasks: remove the staging and distribution trees.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::debug;

/// Remove the staging tree.
pub fn clean_staging(config: &PipelineConfig) -> Result<()> {
    remove_tree(&config.staging_dir())
}

/// Remove the distribution tree.
pub fn clean_dist(config: &PipelineConfig) -> Result<()> {
    remove_tree(&config.dist_dir())
}

/// Remove a directory tree. An absent tree is already clean.
fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("clean"; "removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_tree() {
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("tmp_build/public/js");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("client.js"), "x").unwrap();

        let mut config = PipelineConfig::default();
        config.root = dir.path().to_path_buf();

        clean_staging(&config).unwrap();
        assert!(!dir.path().join("tmp_build").exists());
    }

    #[test]
    fn test_clean_absent_tree_is_ok() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.root = dir.path().to_path_buf();

        clean_staging(&config).unwrap();
        clean_dist(&config).unwrap();
    }
}
