//! Revision records: original path → content-hashed path.
//!
//! One record per file under the public subtree, recomputed from current
//! content on every run and discarded at the next. The full mapping is also
//! persisted as `rev-manifest.json` at the dist root so downstream servers
//! can resolve unrevisioned names.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::utils::hash;

/// Filename of the persisted manifest at the dist root.
pub const MANIFEST_FILE: &str = "rev-manifest.json";

/// Mapping from original staging-relative paths to revisioned ones.
///
/// Sorted storage keeps both iteration order and the persisted JSON
/// deterministic for identical input trees.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RevisionManifest {
    records: BTreeMap<String, String>,
}

impl RevisionManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a renamed file.
    pub fn insert(&mut self, original: String, revised: String) {
        self.records.insert(original, revised);
    }

    /// Look up the revisioned path for an original path.
    pub fn revised(&self, original: &str) -> Option<&str> {
        self.records.get(original).map(String::as_str)
    }

    /// Iterate records as `(original, revised)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize to the manifest JSON shape (a flat, sorted object).
    pub fn to_json(&self) -> String {
        // BTreeMap keeps keys sorted; serde_json preserves insertion order
        serde_json::to_string_pretty(&self.records).unwrap_or_else(|_| "{}".into())
    }

    /// Write `rev-manifest.json` into the given directory.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, self.to_json())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Build the revisioned filename for a path: `dir/stem-<hash>.ext`.
///
/// The hash is a pure function of the content, so unchanged files keep
/// their revisioned name across runs.
pub fn revised_path(original: &str, content: &[u8]) -> String {
    let fingerprint = hash::fingerprint(content);

    let (dir, name) = match original.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, original),
    };

    let revised_name = match name.split_once('.') {
        Some((stem, ext)) => format!("{stem}-{fingerprint}.{ext}"),
        None => format!("{name}-{fingerprint}"),
    };

    match dir {
        Some(dir) => format!("{dir}/{revised_name}"),
        None => revised_name,
    }
}
