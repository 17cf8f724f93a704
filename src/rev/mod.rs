//! The revisioning stage: content-hash renaming + reference rewriting.
//!
//! Transforms the staged build tree into the final distributable tree:
//!
//! 1. Partition staged files into the public subtree and everything else.
//! 2. Hash each public file's content and derive its revisioned name;
//!    record the mapping.
//! 3. Non-public files stay un-renamed but remain rewrite candidates.
//! 4. Scan every script/stylesheet/style-source/map output for occurrences
//!    of any original path and rewrite it to its final reference form.
//! 5. Write the tree to the dist directory, public prefix stripped from
//!    file locations, plus `rev-manifest.json`.
//!
//! Hashes are taken from staged content BEFORE rewriting, so a file's
//! revisioned name is a pure function of what the producing stage wrote.
//! Any unreadable staged file fails the whole stage.

mod manifest;
mod rewrite;
mod transform;

pub use manifest::{MANIFEST_FILE, RevisionManifest, revised_path};
pub use rewrite::ReferenceRewriter;
pub use transform::{strip_public, transform};

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use dashmap::DashMap;
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::log;
use crate::utils::path::unix_rel;

/// File extensions whose contents are scanned for references.
const REWRITE_EXTENSIONS: &[&str] = &["js", "css", "scss", "map"];

/// A staged file loaded into memory for hashing and rewriting.
struct StagedFile {
    /// Staging-relative path, slash-separated.
    rel: String,
    content: Vec<u8>,
}

/// Run the revisioning stage; returns the manifest of renamed files.
pub fn run(config: &PipelineConfig) -> Result<RevisionManifest> {
    let staging = config.staging_dir();
    if !staging.is_dir() {
        return Err(anyhow!(
            "staging directory not found: {} (run the compile stages first)",
            staging.display()
        ));
    }

    let files = load_staged_files(config)?;
    let public_dir = config.rev.public_dir.as_str();

    // Hash public-subtree files concurrently
    let revised: DashMap<String, String> = DashMap::new();
    files
        .par_iter()
        .filter(|f| is_public(&f.rel, public_dir))
        .for_each(|f| {
            revised.insert(f.rel.clone(), revised_path(&f.rel, &f.content));
        });

    let mut manifest = RevisionManifest::new();
    for (original, new) in revised {
        manifest.insert(original, new);
    }

    let rewriter = build_rewriter(&files, &manifest, config);

    let dist = config.dist_dir();
    fs::create_dir_all(&dist).with_context(|| format!("Failed to create {}", dist.display()))?;
    files
        .par_iter()
        .try_for_each(|f| write_output(f, &manifest, &rewriter, &dist, public_dir))?;

    manifest.write(&dist)?;

    log!(
        "dist";
        "{} files written, {} revisioned → {}",
        files.len(),
        manifest.len(),
        dist.display()
    );
    Ok(manifest)
}

/// Read every staged file into memory (parallel).
fn load_staged_files(config: &PipelineConfig) -> Result<Vec<StagedFile>> {
    config
        .dist_glob()
        .list()
        .par_iter()
        .map(|(abs, rel)| {
            let content = fs::read(abs)
                .with_context(|| format!("Failed to read staged file {}", abs.display()))?;
            Ok(StagedFile {
                rel: unix_rel(rel),
                content,
            })
        })
        .collect()
}

/// Check whether a staging-relative path lies under the public subtree.
fn is_public(rel: &str, public_dir: &str) -> bool {
    strip_public(rel, public_dir) != rel
}

/// Build the scan-key → replacement table for every staged file.
///
/// Each original path contributes two keys: the literal path as the
/// producing stage wrote it, and its transformed form when that differs
/// (which is what lets a bare `app.css.map` source-map comment match).
/// Exact originals are inserted first so they win key collisions against
/// another file's transformed form.
fn build_rewriter(
    files: &[StagedFile],
    manifest: &RevisionManifest,
    config: &PipelineConfig,
) -> ReferenceRewriter {
    let public_dir = config.rev.public_dir.as_str();
    let prefix = config.rev.asset_url_prefix.as_str();

    let replacement_for = |rel: &str| -> String {
        match manifest.revised(rel) {
            Some(new) => format!("{prefix}{}", transform(new, public_dir)),
            None => transform(rel, public_dir),
        }
    };

    let exact = files
        .iter()
        .map(|f| (f.rel.clone(), replacement_for(&f.rel)));
    let transformed = files.iter().filter_map(|f| {
        let key = transform(&f.rel, public_dir);
        (key != f.rel).then(|| (key, replacement_for(&f.rel)))
    });

    ReferenceRewriter::new(exact.chain(transformed).collect::<Vec<_>>())
}

/// Write one staged file into the dist tree, rewriting references in
/// text outputs.
fn write_output(
    file: &StagedFile,
    manifest: &RevisionManifest,
    rewriter: &ReferenceRewriter,
    dist: &std::path::Path,
    public_dir: &str,
) -> Result<()> {
    let named = manifest.revised(&file.rel).unwrap_or(&file.rel);
    let out_rel = strip_public(named, public_dir);
    let out_path: PathBuf = dist.join(out_rel);

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let written = if should_rewrite(&file.rel)
        && let Ok(text) = std::str::from_utf8(&file.content)
    {
        fs::write(&out_path, rewriter.rewrite(text).as_bytes())
    } else {
        fs::write(&out_path, &file.content)
    };
    written.with_context(|| format!("Failed to write {}", out_path.display()))
}

/// Check whether a file's contents are scanned for references.
fn should_rewrite(rel: &str) -> bool {
    rel.rsplit('.')
        .next()
        .is_some_and(|ext| REWRITE_EXTENSIONS.contains(&ext))
}

// ============================================================================
// Tests
// ============================================================================
