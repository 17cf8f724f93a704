//! Path resolution for the pipeline.
//!
//! Every directory and glob the stages touch derives from a small set of
//! optional overrides in `[paths]`. Defaults are composed from earlier
//! RESOLVED values, never recomputed from `base` directly - overriding an
//! intermediate path (say `tmp`) cascades into every dependent default
//! (`client_dest`, `sass_dest`, `dist_glob`, ...) that was not itself
//! overridden.
//!
//! Directory-ish values keep a trailing slash so composition is plain
//! string concatenation; `PathBuf::join` normalizes them at use sites.
//! Nothing here touches the filesystem - invalid paths surface when a
//! stage tries to read or write them.

use serde::{Deserialize, Serialize};

/// Raw `[paths]` overrides from `stamp.toml`. All optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Base directory (empty unless everything lives in a subdirectory).
    pub base: Option<String>,
    /// Location of source files.
    pub src: Option<String>,
    /// Intermediate staging directory (pre-revisioning output).
    pub tmp: Option<String>,
    /// Location of JavaScript sources.
    pub js_src: Option<String>,
    pub server_dest: Option<String>,
    pub server_file: Option<String>,
    pub client_dest: Option<String>,
    pub client_file: Option<String>,
    /// Style sources and destination.
    pub sass_glob: Option<String>,
    pub sass_dest: Option<String>,
    /// Non-script, non-style assets source and destination.
    pub statics_glob: Option<String>,
    pub statics_dest: Option<String>,
    /// Revisioning source and destination.
    pub dist_glob: Option<String>,
    pub dist_dest: Option<String>,
    /// Tree the server supervisor watches for restarts.
    pub watch_glob: Option<String>,
}

/// Fully resolved path set consumed by every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub base: String,
    pub src: String,
    pub tmp: String,
    pub js_src: String,
    pub server_dest: String,
    pub server_file: String,
    pub client_dest: String,
    pub client_file: String,
    pub sass_glob: String,
    pub sass_dest: String,
    pub statics_glob: String,
    pub statics_dest: String,
    pub dist_glob: String,
    pub dist_dest: String,
    pub watch_glob: String,
}

impl Default for ResolvedPaths {
    fn default() -> Self {
        Self::resolve(&PathsConfig::default())
    }
}

impl ResolvedPaths {
    /// Resolve overrides into the full path set.
    pub fn resolve(overrides: &PathsConfig) -> Self {
        let or = |value: &Option<String>, default: String| -> String {
            value.clone().unwrap_or(default)
        };

        let base = overrides
            .base
            .as_deref()
            .map(|b| shellexpand::tilde(b).into_owned())
            .unwrap_or_default();
        let src = or(&overrides.src, format!("{base}src/"));
        let tmp = or(&overrides.tmp, format!("{base}tmp_build/"));
        let js_src = or(&overrides.js_src, format!("{src}js"));
        let server_dest = or(&overrides.server_dest, tmp.clone());
        let server_file = or(&overrides.server_file, "server.js".into());
        let client_dest = or(&overrides.client_dest, format!("{tmp}public/js"));
        let client_file = or(&overrides.client_file, "client.js".into());
        let sass_glob = or(&overrides.sass_glob, format!("{src}css/**/*.scss"));
        let sass_dest = or(&overrides.sass_dest, format!("{tmp}public/css"));
        let statics_glob = or(&overrides.statics_glob, format!("{src}**/*.!(js|css)"));
        let statics_dest = or(&overrides.statics_dest, format!("{tmp}public"));
        let dist_glob = or(&overrides.dist_glob, format!("{tmp}**/*"));
        let dist_dest = or(&overrides.dist_dest, format!("{base}dist"));
        let watch_glob = or(&overrides.watch_glob, format!("{dist_dest}/**/*"));

        Self {
            base,
            src,
            tmp,
            js_src,
            server_dest,
            server_file,
            client_dest,
            client_file,
            sass_glob,
            sass_dest,
            statics_glob,
            statics_dest,
            dist_glob,
            dist_dest,
            watch_glob,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let paths = ResolvedPaths::resolve(&PathsConfig::default());

        assert_eq!(paths.base, "");
        assert_eq!(paths.src, "src/");
        assert_eq!(paths.tmp, "tmp_build/");
        assert_eq!(paths.js_src, "src/js");
        assert_eq!(paths.server_dest, "tmp_build/");
        assert_eq!(paths.server_file, "server.js");
        assert_eq!(paths.client_dest, "tmp_build/public/js");
        assert_eq!(paths.client_file, "client.js");
        assert_eq!(paths.sass_glob, "src/css/**/*.scss");
        assert_eq!(paths.sass_dest, "tmp_build/public/css");
        assert_eq!(paths.statics_glob, "src/**/*.!(js|css)");
        assert_eq!(paths.statics_dest, "tmp_build/public");
        assert_eq!(paths.dist_glob, "tmp_build/**/*");
        assert_eq!(paths.dist_dest, "dist");
        assert_eq!(paths.watch_glob, "dist/**/*");
    }

    #[test]
    fn test_base_cascades_everywhere() {
        let overrides = PathsConfig {
            base: Some("app/".into()),
            ..Default::default()
        };
        let paths = ResolvedPaths::resolve(&overrides);

        assert_eq!(paths.src, "app/src/");
        assert_eq!(paths.tmp, "app/tmp_build/");
        assert_eq!(paths.dist_dest, "app/dist");
        assert_eq!(paths.sass_glob, "app/src/css/**/*.scss");
    }

    #[test]
    fn test_intermediate_override_cascades() {
        // Overriding tmp must flow into every default composed from it,
        // without touching defaults composed from src.
        let overrides = PathsConfig {
            tmp: Some("build/stage/".into()),
            ..Default::default()
        };
        let paths = ResolvedPaths::resolve(&overrides);

        assert_eq!(paths.server_dest, "build/stage/");
        assert_eq!(paths.client_dest, "build/stage/public/js");
        assert_eq!(paths.sass_dest, "build/stage/public/css");
        assert_eq!(paths.statics_dest, "build/stage/public");
        assert_eq!(paths.dist_glob, "build/stage/**/*");
        assert_eq!(paths.sass_glob, "src/css/**/*.scss");
    }

    #[test]
    fn test_explicit_override_wins_over_cascade() {
        let overrides = PathsConfig {
            tmp: Some("build/stage/".into()),
            sass_dest: Some("styles/out".into()),
            ..Default::default()
        };
        let paths = ResolvedPaths::resolve(&overrides);

        assert_eq!(paths.sass_dest, "styles/out");
        assert_eq!(paths.client_dest, "build/stage/public/js");
    }

    #[test]
    fn test_watch_glob_follows_dist_dest() {
        let overrides = PathsConfig {
            dist_dest: Some("out".into()),
            ..Default::default()
        };
        let paths = ResolvedPaths::resolve(&overrides);

        assert_eq!(paths.watch_glob, "out/**/*");
    }
}
