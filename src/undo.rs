/// Undo engine: reverses every recorded move, newest first.
///
/// The engine drains the move history LIFO. Each record is either fully
/// reversed and removed, removed as stale (destination gone), or left in
/// place for a future retry when the move-back itself fails. The ledger
/// only ever shrinks during a run, so re-running undo is always safe.
use crate::history::{HistoryResult, MoveHistory, MoveRecord};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{error, info, warn};

/// Result of an undo run.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Records whose move was reversed.
    pub reverted: usize,
    /// Stale records removed because the destination no longer existed.
    pub stale_removed: usize,
    /// Records left in the ledger because the move-back failed, with the
    /// failure reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Category folders removed because the reversal emptied them.
    pub folders_removed: usize,
}

impl UndoReport {
    /// True if every record was cleared from the ledger.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of records processed.
    pub fn total_processed(&self) -> usize {
        self.reverted + self.stale_removed + self.failed.len()
    }
}

/// Reverses recorded moves and cleans up folders left empty.
pub struct UndoEngine;

impl UndoEngine {
    /// Undoes every move recorded in the ledger at `history_path`.
    ///
    /// A missing ledger file is not an error: there is simply nothing to
    /// undo. Per-record failures are contained; the affected record stays
    /// in the ledger for a later attempt.
    ///
    /// # Errors
    ///
    /// Returns an error only when the ledger itself cannot be opened or
    /// read.
    pub fn undo_all(history_path: &Path) -> HistoryResult<UndoReport> {
        if !history_path.exists() {
            info!(
                ledger = %history_path.display(),
                "No move history found; nothing to undo"
            );
            return Ok(UndoReport::default());
        }

        let mut history = MoveHistory::open(history_path)?;
        let records = history.newest_first()?;

        if records.is_empty() {
            info!("Move history is empty; nothing to undo");
            return Ok(UndoReport::default());
        }

        info!(moves = records.len(), "Reverting recorded moves");

        let mut report = UndoReport::default();
        for record in &records {
            Self::undo_record(&mut history, record, &mut report)?;
        }

        info!(
            reverted = report.reverted,
            stale = report.stale_removed,
            failed = report.failed.len(),
            "Undo run complete"
        );
        Ok(report)
    }

    /// Processes a single record; only ledger I/O errors propagate.
    fn undo_record(
        history: &mut MoveHistory,
        record: &MoveRecord,
        report: &mut UndoReport,
    ) -> HistoryResult<()> {
        let destination = Path::new(&record.destination_path);
        let source = Path::new(&record.source_path);

        if !destination.exists() {
            warn!(
                file = %destination.display(),
                "File no longer at destination; removing stale record"
            );
            history.delete(record.id)?;
            report.stale_removed += 1;
            return Ok(());
        }

        match Self::restore_file(source, destination) {
            Ok(restored_to) => {
                info!(
                    file = %destination.display(),
                    restored_to = %restored_to.display(),
                    "Reverted move"
                );
                if Self::remove_if_empty(destination) {
                    report.folders_removed += 1;
                }
                history.delete(record.id)?;
                report.reverted += 1;
            }
            Err(reason) => {
                // The record stays in the ledger for a future retry.
                error!(
                    file = %destination.display(),
                    error = %reason,
                    "Could not revert move; record retained"
                );
                report.failed.push((destination.to_path_buf(), reason));
            }
        }

        Ok(())
    }

    /// Moves `destination` back into the directory that originally held
    /// `source`.
    ///
    /// If a same-named file has appeared there since the move, the file is
    /// restored under a unique suffixed name rather than overwriting it.
    fn restore_file(source: &Path, destination: &Path) -> Result<PathBuf, String> {
        let original_dir = source
            .parent()
            .ok_or_else(|| "recorded source path has no parent directory".to_string())?;

        let file_name = destination
            .file_name()
            .ok_or_else(|| "recorded destination path has no file name".to_string())?;

        let mut restore_path = original_dir.join(file_name);
        if restore_path.exists() {
            restore_path = unique_destination(&restore_path);
            warn!(
                original = %original_dir.join(file_name).display(),
                renamed_to = %restore_path.display(),
                "Name already taken in original directory; restoring under a new name"
            );
        }

        fs::rename(destination, &restore_path).map_err(|e| e.to_string())?;
        Ok(restore_path)
    }

    /// Removes the parent folder of a reversed destination if the reversal
    /// left it empty. Failure is logged but never fatal.
    fn remove_if_empty(destination: &Path) -> bool {
        let Some(folder) = destination.parent() else {
            return false;
        };

        let is_empty = match fs::read_dir(folder) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) => {
                warn!(dir = %folder.display(), error = %e, "Could not inspect category folder");
                return false;
            }
        };

        if !is_empty {
            return false;
        }

        match fs::remove_dir(folder) {
            Ok(()) => {
                info!(dir = %folder.display(), "Removed empty category folder");
                true
            }
            Err(e) => {
                warn!(
                    dir = %folder.display(),
                    error = %e,
                    "Could not remove empty category folder"
                );
                false
            }
        }
    }
}

/// Generates a path that does not collide with an existing file by
/// appending an epoch-millis/pid suffix to the file stem.
fn unique_destination(candidate: &Path) -> PathBuf {
    let epoch = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let pid = std::process::id();

    let stem = candidate
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let ext = candidate
        .extension()
        .and_then(|s| s.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    candidate.with_file_name(format!("{}-{}-{}{}", stem, epoch, pid, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryRules;
    use crate::organizer::{FileOutcome, Organizer};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_rules() -> CategoryRules {
        let mut categories = BTreeMap::new();
        categories.insert("Documents".to_string(), vec![".txt".to_string()]);
        categories.insert("Images".to_string(), vec![".jpg".to_string()]);
        CategoryRules::new(categories)
    }

    fn ledger_path(dir: &TempDir) -> PathBuf {
        dir.path().join(".tidywatch_history.db")
    }

    fn organize(dir: &TempDir, names: &[&str]) {
        let history = MoveHistory::open(&ledger_path(dir)).expect("Failed to open history");
        let mut organizer = Organizer::new(dir.path(), test_rules(), history)
            .expect("Failed to create organizer")
            .with_settle_delay(Duration::ZERO);

        for name in names {
            let path = dir.path().join(name);
            fs::write(&path, *name).expect("Failed to write test file");
            assert!(matches!(
                organizer.handle_new_file(&path),
                FileOutcome::Moved { .. }
            ));
        }
    }

    #[test]
    fn test_undo_without_ledger_is_noop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let report = UndoEngine::undo_all(&ledger_path(&temp_dir)).expect("Undo failed");
        assert_eq!(report.total_processed(), 0);
        assert!(report.is_complete());
    }

    #[test]
    fn test_undo_round_trip_restores_file_and_removes_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        organize(&temp_dir, &["a.txt"]);

        assert!(temp_dir.path().join("Documents").join("a.txt").exists());

        let report = UndoEngine::undo_all(&ledger_path(&temp_dir)).expect("Undo failed");
        assert_eq!(report.reverted, 1);
        assert_eq!(report.folders_removed, 1);
        assert!(report.is_complete());

        assert!(temp_dir.path().join("a.txt").exists());
        assert!(!temp_dir.path().join("Documents").exists());

        let history = MoveHistory::open(&ledger_path(&temp_dir)).expect("open");
        assert!(history.is_empty().unwrap());
    }

    #[test]
    fn test_undo_twice_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        organize(&temp_dir, &["a.txt"]);

        let first = UndoEngine::undo_all(&ledger_path(&temp_dir)).expect("Undo failed");
        assert_eq!(first.reverted, 1);

        let second = UndoEngine::undo_all(&ledger_path(&temp_dir)).expect("Undo failed");
        assert_eq!(second.total_processed(), 0);
        assert!(temp_dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_undo_stale_record_removed_without_crash() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        organize(&temp_dir, &["a.txt"]);

        // Delete the organized file out-of-band.
        fs::remove_file(temp_dir.path().join("Documents").join("a.txt"))
            .expect("Failed to delete file");

        let report = UndoEngine::undo_all(&ledger_path(&temp_dir)).expect("Undo failed");
        assert_eq!(report.stale_removed, 1);
        assert_eq!(report.reverted, 0);

        let history = MoveHistory::open(&ledger_path(&temp_dir)).expect("open");
        assert!(history.is_empty().unwrap());
    }

    #[test]
    fn test_undo_folder_removed_only_after_last_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        organize(&temp_dir, &["a.txt", "b.txt"]);

        let report = UndoEngine::undo_all(&ledger_path(&temp_dir)).expect("Undo failed");
        assert_eq!(report.reverted, 2);
        // One shared folder, removed exactly once (after the second
        // reversal emptied it, not after the first).
        assert_eq!(report.folders_removed, 1);

        assert!(temp_dir.path().join("a.txt").exists());
        assert!(temp_dir.path().join("b.txt").exists());
        assert!(!temp_dir.path().join("Documents").exists());
    }

    #[test]
    fn test_undo_restore_collision_does_not_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        organize(&temp_dir, &["a.txt"]);

        // A new same-named file appears where the original used to be.
        fs::write(temp_dir.path().join("a.txt"), "newer content")
            .expect("Failed to write conflicting file");

        let report = UndoEngine::undo_all(&ledger_path(&temp_dir)).expect("Undo failed");
        assert_eq!(report.reverted, 1);

        // The newer file is untouched and the restored one got a fresh name.
        let newer = fs::read_to_string(temp_dir.path().join("a.txt")).unwrap();
        assert_eq!(newer, "newer content");

        let restored: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .flatten()
            .filter(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.starts_with("a-") && name.ends_with(".txt")
            })
            .collect();
        assert_eq!(restored.len(), 1);
        let content = fs::read_to_string(restored[0].path()).unwrap();
        assert_eq!(content, "a.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_undo_move_back_failure_retains_record() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let watched = temp_dir.path().join("watched");
        fs::create_dir(&watched).unwrap();

        // Ledger lives outside the watched directory so it stays writable
        // once the watched directory is locked down.
        let ledger = temp_dir.path().join("history.db");
        let history = MoveHistory::open(&ledger).expect("Failed to open history");
        let mut organizer = Organizer::new(&watched, test_rules(), history)
            .expect("Failed to create organizer")
            .with_settle_delay(Duration::ZERO);

        let file_path = watched.join("a.txt");
        fs::write(&file_path, "content").unwrap();
        assert!(matches!(
            organizer.handle_new_file(&file_path),
            FileOutcome::Moved { .. }
        ));
        drop(organizer);

        // Make the original directory unwritable so the move-back fails.
        fs::set_permissions(&watched, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits don't bind root; nothing to test in that case.
        if fs::write(watched.join(".probe"), b"x").is_ok() {
            let _ = fs::remove_file(watched.join(".probe"));
            fs::set_permissions(&watched, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let report = UndoEngine::undo_all(&ledger);

        // Restore permissions before asserting so TempDir cleanup works.
        fs::set_permissions(&watched, fs::Permissions::from_mode(0o755)).unwrap();

        let report = report.expect("Undo run itself should not error");
        assert_eq!(report.reverted, 0);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_complete());

        // File still at destination, record still in the ledger.
        assert!(watched.join("Documents").join("a.txt").exists());
        let history = MoveHistory::open(&ledger).expect("open");
        assert_eq!(history.len().unwrap(), 1);
    }

    #[test]
    fn test_unique_destination_appends_suffix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let existing = temp_dir.path().join("a.txt");
        fs::write(&existing, "x").unwrap();

        let fresh = unique_destination(&existing);
        assert_ne!(fresh, existing);
        assert!(fresh.to_string_lossy().ends_with(".txt"));
    }
}
