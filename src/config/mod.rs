//! Pipeline configuration management for `stamp.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError, ConfigDiagnostics
//! ├── paths      # PathsConfig overrides → ResolvedPaths (the path resolver)
//! ├── section    # [bundler], [style], [rev], [serve]
//! └── mod.rs     # PipelineConfig (this file)
//! ```
//!
//! The configuration is built exactly once at startup and passed by
//! reference to every stage; there is no global mutable config state.

mod error;
pub mod paths;
mod section;

pub use error::{ConfigDiagnostics, ConfigError};
pub use paths::{PathsConfig, ResolvedPaths};
pub use section::{BundlerConfig, RevConfig, ServeConfig, StyleConfig};

use crate::core::BuildMode;
use crate::log;
use crate::utils::glob::Glob;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing stamp.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Production vs development mode (internal use only)
    #[serde(skip)]
    pub mode: BuildMode,

    /// Path overrides
    pub paths: PathsConfig,

    /// External bundler settings
    pub bundler: BundlerConfig,

    /// External stylesheet compiler settings
    pub style: StyleConfig,

    /// Revisioning settings
    pub rev: RevConfig,

    /// Server supervision and live reload settings
    pub serve: ServeConfig,

    /// Resolved path set (internal use only)
    #[serde(skip)]
    pub resolved: ResolvedPaths,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let paths = PathsConfig::default();
        let resolved = ResolvedPaths::resolve(&paths);
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            mode: BuildMode::default(),
            paths,
            bundler: BundlerConfig::default(),
            style: StyleConfig::default(),
            rev: RevConfig::default(),
            serve: ServeConfig::default(),
            resolved,
        }
    }
}

impl PipelineConfig {
    /// Load configuration, searching upward from cwd for the config file.
    ///
    /// The project root is the config file's parent directory. A missing
    /// config file is not an error - every field has a default - but the
    /// root is then the current directory.
    pub fn load(config_name: &Path, mode: BuildMode) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(config_name, &cwd) {
            Some(path) => {
                let loaded = Self::from_path(&path)?;
                Self {
                    config_path: path,
                    ..loaded
                }
            }
            None => Self::default(),
        };

        config.mode = mode;
        config.finalize(&cwd);
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
            if !Self::prompt_continue()? {
                bail!("Aborted due to unknown config fields");
            }
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        eprintln!();
        log!("warning"; "unknown fields in {}:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
        eprintln!();
    }

    /// Prompt user to continue. Returns true only if user explicitly confirms.
    fn prompt_continue() -> Result<bool> {
        use std::io::{self, Write};

        eprint!("Continue? [y/N] ");
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let input = input.trim().to_lowercase();
        Ok(input == "y" || input == "yes")
    }

    /// Finalize configuration after loading: set root, resolve paths.
    fn finalize(&mut self, cwd: &Path) {
        self.root = if self.config_path.as_os_str().is_empty() {
            cwd.to_path_buf()
        } else {
            self.config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf())
        };
        self.root = crate::utils::path::normalize_path(&self.root);
        self.resolved = ResolvedPaths::resolve(&self.paths);
    }

    /// Override the asset URL prefix (CLI `--prefix`).
    pub fn set_asset_url_prefix(&mut self, prefix: Option<String>) {
        if let Some(prefix) = prefix {
            self.rev.asset_url_prefix = prefix;
        }
    }

    /// Validate configuration for the current command.
    ///
    /// Collects all validation errors and returns them at once. The serve
    /// section is only checked when the supervisor will actually run.
    pub fn validate(&self, dev: bool) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.bundler.validate(&mut diag);
        self.style.validate(&mut diag);
        self.rev.validate(&mut diag);
        if dev {
            self.serve.validate(&mut diag);
        }

        diag.print_hints();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    // ========================================================================
    // path accessors
    // ========================================================================

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Staging directory (pre-revisioning build output).
    pub fn staging_dir(&self) -> PathBuf {
        self.root_join(&self.resolved.tmp)
    }

    /// Final distribution directory.
    pub fn dist_dir(&self) -> PathBuf {
        self.root_join(&self.resolved.dist_dest)
    }

    /// Bundler entry file for a given source filename.
    pub fn js_entry(&self, file: &str) -> PathBuf {
        self.root_join(&self.resolved.js_src).join(file)
    }

    /// Style sources glob.
    pub fn sass_glob(&self) -> Glob {
        Glob::parse(&self.resolved.sass_glob, &self.root)
    }

    /// Statics glob.
    pub fn statics_glob(&self) -> Glob {
        Glob::parse(&self.resolved.statics_glob, &self.root)
    }

    /// Revisioning input glob (the staging tree).
    pub fn dist_glob(&self) -> Glob {
        Glob::parse(&self.resolved.dist_glob, &self.root)
    }

    /// Tree the server supervisor watches for restarts.
    pub fn watch_glob(&self) -> Glob {
        Glob::parse(&self.resolved.watch_glob, &self.root)
    }

    /// Server launch command: `[serve] command` or the derived default.
    pub fn server_command(&self) -> Vec<String> {
        if !self.serve.command.is_empty() {
            return self.serve.command.clone();
        }
        let script = self.dist_dir().join(&self.resolved.server_file);
        vec!["node".into(), script.to_string_lossy().into_owned()]
    }
}

// ============================================================================
// Config file discovery
// ============================================================================

/// Search upward from `start` for a config file with the given name.
fn find_config_file(name: &Path, start: &Path) -> Option<PathBuf> {
    if name.is_absolute() {
        return name.exists().then(|| name.to_path_buf());
    }
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_parse_config`)
// ============================================================================

/// Parse config from a TOML snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PipelineConfig {
    let (mut parsed, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed.resolved = ResolvedPaths::resolve(&parsed.paths);
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        let result: Result<PipelineConfig, _> = toml::from_str("[paths\nbase = \"app/\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.resolved.tmp, "tmp_build/");
        assert_eq!(config.rev.public_dir, "public");
        assert_eq!(config.serve.reload_port, 35729);
        assert_eq!(config.mode, BuildMode::Development);
    }

    #[test]
    fn test_paths_section_cascades() {
        let config = test_parse_config("[paths]\ntmp = \"stage/\"");
        assert_eq!(config.resolved.client_dest, "stage/public/js");
        assert_eq!(config.resolved.dist_glob, "stage/**/*");
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[rev]\nasset_url_prefix = \"/cdn/\"\n[unknown_section]\nfield = 1";
        let (config, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.rev.asset_url_prefix, "/cdn/");
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let content = "[serve]\nreload_port = 4000";
        let (_, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_find_config_file_upward() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        File::create(dir.path().join("stamp.toml")).unwrap();

        let found = find_config_file(Path::new("stamp.toml"), &nested).unwrap();
        assert_eq!(found, dir.path().join("stamp.toml"));
    }

    #[test]
    fn test_find_config_file_missing() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_file(Path::new("no-such-config.toml"), dir.path()).is_none());
    }

    #[test]
    fn test_server_command_derived_default() {
        let mut config = test_parse_config("[paths]\ndist_dest = \"out\"");
        config.root = PathBuf::from("/project");
        let cmd = config.server_command();
        assert_eq!(cmd[0], "node");
        assert!(cmd[1].ends_with("out/server.js"));
    }

    #[test]
    fn test_server_command_override() {
        let config = test_parse_config("[serve]\ncommand = [\"deno\", \"run\", \"main.ts\"]");
        assert_eq!(config.server_command(), vec!["deno", "run", "main.ts"]);
    }
}
