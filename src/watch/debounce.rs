//! Pure debouncing for file-system events.
//!
//! Only timing and deduplication live here - no stage knowledge, no
//! global state. Events settle for `DEBOUNCE_MS` before a batch is
//! released, and batches are spaced by `REBUILD_COOLDOWN_MS` so a rebuild
//! that itself touches watched trees cannot ping-pong.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::utils::path::normalize_path;

pub(super) const DEBOUNCE_MS: u64 = 300;
pub(super) const REBUILD_COOLDOWN_MS: u64 = 800;

/// What happened to a path within the settle window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        }
    }
}

/// Event debouncer: path → effective change, plus settle/cooldown timing.
pub struct Debouncer {
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<std::time::Instant>,
    last_release: Option<std::time::Instant>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_release: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Removed + Created/Modified → the restore event wins
    /// - Modified + Removed → upgrade to Removed
    /// - Created + Removed → discard (appeared then vanished)
    /// - Same kind: first event wins
    pub fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // Ignore metadata-only changes (mtime/atime/chmod noise)
                // may trigger endless rebuild loops
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.add_change(normalize_path(path), kind);
        }
    }

    /// Record one change, merging with an earlier event for the same path.
    fn add_change(&mut self, path: PathBuf, kind: ChangeKind) {
        if let Some(&existing) = self.changes.get(&path) {
            match (existing, kind) {
                (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                    crate::debug!("watch"; "restore {}→{}: {}", existing.label(), kind.label(), path.display());
                    self.changes.insert(path, kind);
                }
                (ChangeKind::Modified, ChangeKind::Removed) => {
                    crate::debug!("watch"; "upgrade modified→removed: {}", path.display());
                    self.changes.insert(path, ChangeKind::Removed);
                }
                (ChangeKind::Created, ChangeKind::Removed) => {
                    crate::debug!("watch"; "discard created+removed: {}", path.display());
                    self.changes.remove(&path);
                }
                _ => return,
            }
            self.last_event = Some(std::time::Instant::now());
            return;
        }

        crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
        self.changes.insert(path, kind);
        self.last_event = Some(std::time::Instant::now());
    }

    /// Take the settled batch if debounce + cooldown elapsed.
    pub fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;

        if changes.is_empty() {
            return None;
        }

        self.last_release = Some(std::time::Instant::now());
        Some(changes)
    }

    fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }

        if let Some(last_release) = self.last_release
            && last_release.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS)
        {
            return false;
        }

        !self.changes.is_empty()
    }

    /// Precise sleep duration until the next possible ready time.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce_remaining =
            Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());

        let cooldown_remaining = self
            .last_release
            .map(|t| Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn test_same_kind_first_wins() {
        let mut d = Debouncer::new();
        d.add_change(path("/a"), ChangeKind::Modified);
        d.add_change(path("/a"), ChangeKind::Modified);
        assert_eq!(d.changes.len(), 1);
    }

    #[test]
    fn test_removed_then_restored() {
        let mut d = Debouncer::new();
        d.add_change(path("/a"), ChangeKind::Removed);
        d.add_change(path("/a"), ChangeKind::Created);
        assert_eq!(d.changes.get(&path("/a")), Some(&ChangeKind::Created));
    }

    #[test]
    fn test_modified_then_removed_upgrades() {
        let mut d = Debouncer::new();
        d.add_change(path("/a"), ChangeKind::Modified);
        d.add_change(path("/a"), ChangeKind::Removed);
        assert_eq!(d.changes.get(&path("/a")), Some(&ChangeKind::Removed));
    }

    #[test]
    fn test_created_then_removed_discards() {
        let mut d = Debouncer::new();
        d.add_change(path("/a"), ChangeKind::Created);
        d.add_change(path("/a"), ChangeKind::Removed);
        assert!(d.changes.is_empty());
    }

    #[test]
    fn test_not_ready_within_debounce_window() {
        let mut d = Debouncer::new();
        d.add_change(path("/a"), ChangeKind::Modified);
        assert!(d.take_if_ready().is_none());
    }

    #[test]
    fn test_ready_after_settle() {
        let mut d = Debouncer::new();
        d.add_change(path("/a"), ChangeKind::Modified);
        // Backdate the last event past the settle window
        d.last_event = Some(std::time::Instant::now() - Duration::from_millis(DEBOUNCE_MS + 50));

        let batch = d.take_if_ready().unwrap();
        assert_eq!(batch.len(), 1);
        assert!(d.changes.is_empty());
    }

    #[test]
    fn test_cooldown_blocks_next_batch() {
        let mut d = Debouncer::new();
        d.add_change(path("/a"), ChangeKind::Modified);
        d.last_event = Some(std::time::Instant::now() - Duration::from_millis(DEBOUNCE_MS + 50));
        assert!(d.take_if_ready().is_some());

        d.add_change(path("/b"), ChangeKind::Modified);
        d.last_event = Some(std::time::Instant::now() - Duration::from_millis(DEBOUNCE_MS + 50));
        // Cooldown from the first release still applies
        assert!(d.take_if_ready().is_none());
    }

    #[test]
    fn test_idle_sleep_is_long() {
        let d = Debouncer::new();
        assert!(d.sleep_duration() >= Duration::from_secs(3600));
    }

    #[test]
    fn test_temp_files_filtered() {
        assert!(is_temp_file(Path::new("/src/.app.scss.swp")));
        assert!(is_temp_file(Path::new("/src/app.scss~")));
        assert!(is_temp_file(Path::new("/src/app.bak")));
        assert!(!is_temp_file(Path::new("/src/app.scss")));
    }
}
