//! Textual reference rewriting.
//!
//! Given the full set of scan keys (original paths and their transformed
//! forms), builds one alternation regex and rewrites a file in a single
//! pass. Two properties fall out of that structure:
//!
//! - Keys are sorted longest-first, and the regex engine prefers earlier
//!   alternatives at the same position, so `sub/app.js` always wins over
//!   `app.js` (longest-match-first precedence between overlapping paths).
//! - Replacement output is never re-scanned, so a rewritten reference can
//!   not match another key.

use std::borrow::Cow;

use regex::Regex;
use rustc_hash::FxHashMap;

/// Single-pass replacer for a fixed set of path keys.
#[derive(Debug)]
pub struct ReferenceRewriter {
    pattern: Option<Regex>,
    replacements: FxHashMap<String, String>,
}

impl ReferenceRewriter {
    /// Build from `(key, replacement)` pairs.
    ///
    /// Pairs whose replacement equals the key are dropped (nothing to do);
    /// when two pairs share a key, the first one wins.
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut replacements = FxHashMap::default();
        for (key, replacement) in entries {
            if key.is_empty() || key == replacement {
                continue;
            }
            replacements.entry(key).or_insert(replacement);
        }

        let pattern = if replacements.is_empty() {
            None
        } else {
            let mut keys: Vec<&String> = replacements.keys().collect();
            // Longest first; ties broken lexically for determinism
            keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

            let alternation = keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            // Keys are escaped literals; the pattern cannot fail to compile
            Regex::new(&alternation).ok()
        };

        Self {
            pattern,
            replacements,
        }
    }

    /// True when no key would ever match.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    /// Rewrite every key occurrence in `text`.
    pub fn rewrite<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let Some(pattern) = &self.pattern else {
            return Cow::Borrowed(text);
        };

        pattern.replace_all(text, |caps: &regex::Captures<'_>| {
            let matched = &caps[0];
            self.replacements
                .get(matched)
                .cloned()
                .unwrap_or_else(|| matched.to_string())
        })
    }
}
