//! Tool and stage configuration sections.
//!
//! External tools are configured as command arrays with `$STAMP_*` variable
//! substitution, resolved at invocation time by the stages:
//!
//! ```toml
//! [bundler]
//! command = ["esbuild", "--bundle", "$STAMP_ENTRY", "--outfile=$STAMP_OUTFILE", "--platform=$STAMP_PLATFORM"]
//! production_args = ["--minify"]
//!
//! [style]
//! command = ["sass", "$STAMP_INPUT", "$STAMP_OUTPUT"]
//! include_paths = ["node_modules/foundation-sites/scss"]
//!
//! [rev]
//! asset_url_prefix = "https://cdn.example.com/"
//!
//! [serve]
//! reload_port = 35729
//! livereload_timeout_ms = 800
//! ```

use serde::{Deserialize, Serialize};

use super::error::ConfigDiagnostics;

/// Commands that download packages at runtime; their targets cannot be
/// which-checked ahead of time.
const PACKAGE_RUNNERS: &[&str] = &["npx", "bunx", "pnpx", "yarn", "dlx"];

/// Validate that a configured command's program exists on PATH.
fn validate_command(command: &[String], field: &'static str, diag: &mut ConfigDiagnostics) {
    let Some(cmd) = command.first() else {
        diag.error(field, "command is empty");
        return;
    };

    if which::which(cmd).is_err() {
        if PACKAGE_RUNNERS.contains(&cmd.as_str()) {
            if command.len() > 1 {
                diag.hint(
                    field,
                    format!("`{}` via `{}` — ensure package is installed", command[1], cmd),
                );
            }
        } else {
            diag.error_with_hint(
                field,
                format!("`{cmd}` not found"),
                format!("install the command or update {field}"),
            );
        }
    }
}

// ============================================================================
// Bundler Section
// ============================================================================

/// `[bundler]` - the external module bundler (compile stage).
///
/// The stage runs this command once per target (client: browser platform,
/// server: node platform), substituting `$STAMP_ENTRY`, `$STAMP_OUTFILE`
/// and `$STAMP_PLATFORM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Command and arguments to execute.
    pub command: Vec<String>,
    /// Extra arguments in production mode.
    pub production_args: Vec<String>,
    /// Extra arguments in development mode.
    pub dev_args: Vec<String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "esbuild".into(),
                "--bundle".into(),
                "$STAMP_ENTRY".into(),
                "--outfile=$STAMP_OUTFILE".into(),
                "--platform=$STAMP_PLATFORM".into(),
            ],
            production_args: vec!["--minify".into()],
            dev_args: vec!["--sourcemap".into()],
        }
    }
}

impl BundlerConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_command(&self.command, "bundler.command", diag);
    }
}

// ============================================================================
// Style Section
// ============================================================================

/// `[style]` - the external stylesheet compiler (style stage).
///
/// Runs once per non-partial style source, substituting `$STAMP_INPUT` and
/// `$STAMP_OUTPUT`. `include_paths` become `--load-path` arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Command and arguments to execute.
    pub command: Vec<String>,
    /// Import resolution paths passed to the compiler.
    pub include_paths: Vec<String>,
    /// Extra arguments in production mode.
    pub production_args: Vec<String>,
    /// Extra arguments in development mode.
    pub dev_args: Vec<String>,
    /// Optional vendor-prefixer command. When set, each compiled stylesheet
    /// is piped through it on stdin and replaced by its stdout.
    pub autoprefixer: Option<Vec<String>>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            command: vec!["sass".into(), "$STAMP_INPUT".into(), "$STAMP_OUTPUT".into()],
            include_paths: Vec::new(),
            production_args: vec!["--style=compressed".into()],
            dev_args: vec!["--style=expanded".into()],
            autoprefixer: None,
        }
    }
}

impl StyleConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_command(&self.command, "style.command", diag);
        if let Some(prefixer) = &self.autoprefixer {
            validate_command(prefixer, "style.autoprefixer", diag);
        }
    }
}

// ============================================================================
// Rev Section
// ============================================================================

/// `[rev]` - revisioning stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevConfig {
    /// URL prefix applied to references of revisioned files
    /// (empty string to serve normally).
    pub asset_url_prefix: String,
    /// Name of the staging subtree eligible for hash renaming.
    pub public_dir: String,
}

impl Default for RevConfig {
    fn default() -> Self {
        Self {
            asset_url_prefix: String::new(),
            public_dir: "public".into(),
        }
    }
}

impl RevConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.public_dir.is_empty() || self.public_dir.contains('/') {
            diag.error(
                "rev.public_dir",
                "must be a single directory name directly under the staging root",
            );
        }
    }
}

// ============================================================================
// Serve Section
// ============================================================================

/// `[serve]` - server supervision and live reload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Server launch command. Empty means the derived default
    /// (`node {dist_dest}/{server_file}`).
    pub command: Vec<String>,
    /// WebSocket port for browser reload clients.
    pub reload_port: u16,
    /// Debounce window between a server restart and the reload broadcast,
    /// so browsers don't reconnect before the new process listens.
    pub livereload_timeout_ms: u64,
    /// Enable file watching in dev mode.
    pub watch: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            reload_port: 35729,
            livereload_timeout_ms: 800,
            watch: true,
        }
    }
}

impl ServeConfig {
    /// Validate (dev mode only - the supervisor needs a runnable command).
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.command.is_empty() {
            validate_command(&self.command, "serve.command", diag);
        }
        if self.livereload_timeout_ms == 0 {
            diag.hint(
                "serve.livereload_timeout_ms",
                "0 disables the restart debounce; browsers may reload before the server listens",
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundler_defaults() {
        let bundler = BundlerConfig::default();
        assert_eq!(bundler.command[0], "esbuild");
        assert_eq!(bundler.production_args, vec!["--minify"]);
        assert_eq!(bundler.dev_args, vec!["--sourcemap"]);
    }

    #[test]
    fn test_style_defaults() {
        let style = StyleConfig::default();
        assert_eq!(style.command[0], "sass");
        assert!(style.include_paths.is_empty());
        assert!(style.autoprefixer.is_none());
    }

    #[test]
    fn test_rev_defaults() {
        let rev = RevConfig::default();
        assert_eq!(rev.asset_url_prefix, "");
        assert_eq!(rev.public_dir, "public");
    }

    #[test]
    fn test_serve_defaults() {
        let serve = ServeConfig::default();
        assert!(serve.command.is_empty());
        assert_eq!(serve.reload_port, 35729);
        assert_eq!(serve.livereload_timeout_ms, 800);
        assert!(serve.watch);
    }

    #[test]
    fn test_empty_command_is_error() {
        let mut diag = ConfigDiagnostics::new();
        validate_command(&[], "bundler.command", &mut diag);
        assert!(diag.into_result().is_err());
    }

    #[test]
    fn test_missing_command_is_error() {
        let mut diag = ConfigDiagnostics::new();
        validate_command(
            &["definitely-not-a-real-tool-7f3a".into()],
            "style.command",
            &mut diag,
        );
        assert!(diag.into_result().is_err());
    }

    #[test]
    fn test_package_runner_is_hint_only() {
        let mut diag = ConfigDiagnostics::new();
        validate_command(
            &["npx".into(), "some-package".into()],
            "style.command",
            &mut diag,
        );
        // npx may or may not be installed; either way this must never be fatal
        if which::which("npx").is_err() {
            assert!(diag.into_result().is_ok());
        }
    }

    #[test]
    fn test_nested_public_dir_rejected() {
        let rev = RevConfig {
            public_dir: "static/public".into(),
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        rev.validate(&mut diag);
        assert!(diag.into_result().is_err());
    }
}
