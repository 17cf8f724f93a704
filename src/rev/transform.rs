//! The path transform applied to every reference value.
//!
//! Two rules, applied in order:
//! 1. A literal leading public-subtree segment (`public/` by default) is
//!    stripped - the public subtree is served from the web root, so
//!    references never carry it.
//! 2. A path ending in `.map` collapses to its final segment - source maps
//!    are resolved relative to the file that names them, so a
//!    directory-qualified map reference would break the moment the
//!    consuming tool resolves it.
//!
//! The transform is pure and idempotent.

/// Strip a leading `{public_dir}/` segment, if present.
///
/// The prefix must be a whole path segment: `publicity/app.js` is not
/// under `public/`.
pub fn strip_public<'a>(filename: &'a str, public_dir: &str) -> &'a str {
    filename
        .strip_prefix(public_dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(filename)
}

/// Transform a slash-separated relative path into its reference form.
pub fn transform(filename: &str, public_dir: &str) -> String {
    let stripped = strip_public(filename, public_dir);

    if stripped.ends_with(".map") {
        return stripped.rsplit('/').next().unwrap_or(stripped).to_string();
    }

    stripped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(filename: &str) -> String {
        transform(filename, "public")
    }

    #[test]
    fn test_strips_public_prefix() {
        assert_eq!(t("public/js/client.js"), "js/client.js");
        assert_eq!(t("public/css/app.css"), "css/app.css");
    }

    #[test]
    fn test_leaves_non_public_paths() {
        assert_eq!(t("server.js"), "server.js");
        assert_eq!(t("lib/util.js"), "lib/util.js");
    }

    #[test]
    fn test_prefix_must_be_a_whole_segment() {
        assert_eq!(t("publicity/app.js"), "publicity/app.js");
    }

    #[test]
    fn test_custom_public_dir() {
        assert_eq!(transform("assets/js/app.js", "assets"), "js/app.js");
        assert_eq!(transform("public/js/app.js", "assets"), "public/js/app.js");
    }

    #[test]
    fn test_map_collapses_to_basename() {
        assert_eq!(t("public/css/app.css.map"), "app.css.map");
        assert_eq!(t("css/deep/app.css.map"), "app.css.map");
        assert_eq!(t("app.css.map"), "app.css.map");
    }

    #[test]
    fn test_idempotent() {
        for path in [
            "public/js/client.js",
            "public/css/app.css.map",
            "server.js",
            "js/client-0123456789.js",
        ] {
            let once = t(path);
            assert_eq!(t(&once), once);
        }
    }
}
