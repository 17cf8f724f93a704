//! Glob pattern interpretation for the path resolver.
//!
//! The resolver (`config::paths`) hands every stage its inputs as glob
//! strings (`src/css/**/*.scss`, `src/**/*.!(js|css)`). This module splits
//! such a pattern into a concrete walk root plus a relative match pattern,
//! and implements the subset of glob syntax those patterns use:
//!
//! - `**` matches any number of path components (including none)
//! - `*` matches any run of characters within one component
//! - `!(a|b)` matches any run of characters that is none of the listed
//!   alternatives (extglob negation, used for extension exclusion)
//!
//! Matching is purely textual; no filesystem access happens until `list()`.

use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use crate::utils::path::unix_rel;

/// A parsed glob: walk root + relative match pattern.
#[derive(Debug, Clone)]
pub struct Glob {
    root: PathBuf,
    /// Pattern components relative to `root`. Empty means the root itself
    /// names a single file.
    pattern: Vec<String>,
}

impl Glob {
    /// Parse a pattern relative to `base`.
    ///
    /// Components before the first wildcard become the walk root, joined
    /// onto `base` (absolute patterns ignore `base`); the remainder is the
    /// match pattern.
    pub fn parse(pattern: &str, base: &Path) -> Self {
        let mut root = if pattern.starts_with('/') {
            PathBuf::from("/")
        } else {
            base.to_path_buf()
        };
        let mut components = pattern.split('/').filter(|c| !c.is_empty()).peekable();

        while let Some(component) = components.peek() {
            if has_wildcard(component) {
                break;
            }
            root.push(component);
            components.next();
        }

        Self {
            root,
            pattern: components.map(str::to_string).collect(),
        }
    }

    /// The directory (or single file) this glob walks.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Match a root-relative, slash-separated path.
    pub fn matches(&self, rel: &str) -> bool {
        if self.pattern.is_empty() {
            return rel.is_empty();
        }
        let comps: Vec<&str> = rel.split('/').filter(|c| !c.is_empty()).collect();
        let pats: Vec<&str> = self.pattern.iter().map(String::as_str).collect();
        match_components(&pats, &comps)
    }

    /// Walk the root and collect matching files as `(absolute, root-relative)`
    /// pairs, sorted for deterministic stage output.
    pub fn list(&self) -> Vec<(PathBuf, PathBuf)> {
        if self.pattern.is_empty() {
            if self.root.is_file() {
                return vec![(self.root.clone(), PathBuf::new())];
            }
            return Vec::new();
        }
        if !self.root.is_dir() {
            return Vec::new();
        }

        let mut files: Vec<_> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let abs = e.path();
                let rel = abs.strip_prefix(&self.root).ok()?.to_path_buf();
                self.matches(&unix_rel(&rel)).then_some((abs, rel))
            })
            .collect();
        files.sort();
        files
    }
}

/// Check whether a pattern component contains wildcard syntax.
fn has_wildcard(component: &str) -> bool {
    component.contains(['*', '?', '!', '['])
}

/// Match pattern components against path components, expanding `**`.
fn match_components(pats: &[&str], comps: &[&str]) -> bool {
    match pats.first() {
        None => comps.is_empty(),
        Some(&"**") => (0..=comps.len()).any(|skip| match_components(&pats[1..], &comps[skip..])),
        Some(pat) => {
            !comps.is_empty()
                && match_component(&pat.chars().collect::<Vec<_>>(), &comps[0].chars().collect::<Vec<_>>())
                && match_components(&pats[1..], &comps[1..])
        }
    }
}

/// Match a single component: literals, `*`, and `!(a|b)` negation.
fn match_component(pat: &[char], s: &[char]) -> bool {
    match pat.first() {
        None => s.is_empty(),
        Some('*') => (0..=s.len()).any(|i| match_component(&pat[1..], &s[i..])),
        Some('!') if pat.get(1) == Some(&'(') => {
            let Some(close) = pat.iter().position(|&c| c == ')') else {
                // Unbalanced group: treat '!' as a literal
                return s.first() == Some(&'!') && match_component(&pat[1..], &s[1..]);
            };
            let body: String = pat[2..close].iter().collect();
            let alternatives: Vec<&str> = body.split('|').collect();
            let rest = &pat[close + 1..];
            (0..=s.len()).any(|i| {
                let consumed: String = s[..i].iter().collect();
                !alternatives.contains(&consumed.as_str()) && match_component(rest, &s[i..])
            })
        }
        Some(&c) => s.first() == Some(&c) && match_component(&pat[1..], &s[1..]),
    }
}
