/// File organization engine.
///
/// The organizer takes "a file appeared in the watched directory" events,
/// classifies the file by extension, ensures the category subdirectory
/// exists, moves the file, and records the move in the history store.
/// Every per-file fault is contained here: a bad file is logged and
/// skipped, never aborting the sweep or the watch loop.
///
/// The result guarantee for [`Organizer::handle_new_file`] is strict:
/// after a successful call the file sits at its new location and a
/// matching ledger record exists, or the file is untouched and no record
/// was written. The ledger insert happens synchronously, immediately
/// after the rename, before the call returns.
use crate::category::{CategoryRules, Classification};
use crate::history::{HistoryError, MoveHistory};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Errors that can occur while constructing or running an organizer.
#[derive(Debug)]
pub enum OrganizeError {
    /// The watched directory path is invalid or doesn't exist.
    InvalidWatchDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to enumerate the watched directory.
    ReadDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// History store failure.
    History(HistoryError),
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidWatchDir { path, source } => {
                write!(f, "Invalid watch directory {}: {}", path.display(), source)
            }
            Self::ReadDirFailed { path, source } => {
                write!(f, "Failed to read directory {}: {}", path.display(), source)
            }
            Self::History(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OrganizeError {}

impl From<HistoryError> for OrganizeError {
    fn from(e: HistoryError) -> Self {
        Self::History(e)
    }
}

/// Result type for organizer operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Outcome of processing a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file was moved into the named category folder and recorded.
    Moved { category: String },
    /// The file was left in place (vanished, hidden, ledger file, no
    /// extension, or uncategorized).
    Skipped,
    /// The move failed; the file stays put and no record was written.
    Failed,
}

/// Summary of an initial sweep over pre-existing files.
#[derive(Debug, Default)]
pub struct SweepSummary {
    /// Files moved, counted per category.
    pub moved: HashMap<String, usize>,
    /// Files left in place.
    pub skipped: usize,
    /// Files whose move failed.
    pub failed: usize,
}

impl SweepSummary {
    /// Total number of files moved across all categories.
    pub fn total_moved(&self) -> usize {
        self.moved.values().sum()
    }

    /// Folds one file outcome into the summary.
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Moved { category } => {
                *self.moved.entry(category.clone()).or_insert(0) += 1;
            }
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Failed => self.failed += 1,
        }
    }
}

/// Moves newly appeared files into category subdirectories and records
/// every move in the history store.
pub struct Organizer {
    watched_dir: PathBuf,
    rules: CategoryRules,
    history: MoveHistory,
    settle_delay: Duration,
}

impl Organizer {
    /// Creates an organizer for `watched_dir`.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidWatchDir` if the directory does not
    /// exist.
    pub fn new(
        watched_dir: &Path,
        rules: CategoryRules,
        history: MoveHistory,
    ) -> OrganizeResult<Self> {
        if !watched_dir.is_dir() {
            return Err(OrganizeError::InvalidWatchDir {
                path: watched_dir.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "watch directory does not exist",
                ),
            });
        }

        Ok(Self {
            watched_dir: watched_dir.to_path_buf(),
            rules,
            history,
            settle_delay: Duration::from_secs(1),
        })
    }

    /// Sets the settle delay applied before a newly created file is
    /// inspected. Large copies create the file handle before the content
    /// has fully arrived; the delay lets the producer finish. Zero
    /// disables the wait.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Directory this organizer watches.
    pub fn watched_dir(&self) -> &Path {
        &self.watched_dir
    }

    /// Processes one file-appeared event.
    ///
    /// All errors are contained and logged; the outcome tells the caller
    /// what happened without ever propagating a per-file failure.
    pub fn handle_new_file(&mut self, path: &Path) -> FileOutcome {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %path.display(), "Skipped: no usable file name");
            return FileOutcome::Skipped;
        };

        if self.is_internal_file(path, file_name) {
            debug!(file = %file_name, "Skipped: internal or hidden file");
            return FileOutcome::Skipped;
        }

        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }

        // Re-check after the settle delay: the file may have been renamed
        // or deleted by another process in the meantime.
        if !path.is_file() {
            debug!(file = %file_name, "Skipped: vanished or not a regular file");
            return FileOutcome::Skipped;
        }

        let category = match self.rules.classify(file_name) {
            Classification::Category(category) => category,
            Classification::NoExtension => {
                warn!(file = %file_name, "Skipped: no extension");
                return FileOutcome::Skipped;
            }
            Classification::Unmatched => {
                warn!(file = %file_name, "Skipped: uncategorized");
                return FileOutcome::Skipped;
            }
        };

        let dest_dir = self.watched_dir.join(&category);
        if !dest_dir.exists() {
            if let Err(e) = fs::create_dir(&dest_dir) {
                error!(
                    dir = %dest_dir.display(),
                    error = %e,
                    "Could not create category folder"
                );
                return FileOutcome::Failed;
            }
            info!(dir = %dest_dir.display(), "Created category folder");
        }

        let dest_path = dest_dir.join(file_name);
        if let Err(e) = fs::rename(path, &dest_path) {
            error!(file = %file_name, error = %e, "Could not move file");
            return FileOutcome::Failed;
        }

        // The move succeeded; the ledger write must follow before we
        // return so undo never misses a performed move.
        if let Err(e) = self.history.record_move(path, &dest_path) {
            error!(
                file = %file_name,
                error = %e,
                "Move performed but could not be recorded; undo will not cover it"
            );
        }

        info!(file = %file_name, category = %category, "Moved file");
        FileOutcome::Moved { category }
    }

    /// Takes a one-shot listing of regular files currently in the watched
    /// directory, excluding hidden files and the history database.
    ///
    /// The listing is captured before any file is processed, so category
    /// folders created mid-sweep are never treated as input.
    pub fn sweep_targets(&self) -> OrganizeResult<Vec<PathBuf>> {
        let entries =
            fs::read_dir(&self.watched_dir).map_err(|source| OrganizeError::ReadDirFailed {
                path: self.watched_dir.clone(),
                source,
            })?;

        let mut files = Vec::new();
        for entry in entries.flatten() {
            if let Ok(file_type) = entry.file_type()
                && file_type.is_file()
            {
                let path = entry.path();
                let internal = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_none_or(|name| self.is_internal_file(&path, name));
                if !internal {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }

    /// Organizes every file already present in the watched directory.
    pub fn initial_sweep(&mut self) -> OrganizeResult<SweepSummary> {
        let targets = self.sweep_targets()?;
        info!(
            dir = %self.watched_dir.display(),
            files = targets.len(),
            "Performing initial sweep of existing files"
        );

        let mut summary = SweepSummary::default();
        for path in &targets {
            let outcome = self.handle_new_file(path);
            summary.record(&outcome);
        }

        info!(
            moved = summary.total_moved(),
            skipped = summary.skipped,
            failed = summary.failed,
            "Initial sweep complete"
        );
        Ok(summary)
    }

    /// True for files the organizer must never touch: hidden files and the
    /// history database (including its SQLite `-wal`/`-shm` siblings).
    fn is_internal_file(&self, path: &Path, file_name: &str) -> bool {
        if file_name.starts_with('.') {
            return true;
        }
        if let Some(ledger_name) = self.history.path().file_name().and_then(|n| n.to_str())
            && file_name.starts_with(ledger_name)
            && path.parent() == self.history.path().parent()
        {
            return true;
        }
        false
    }
}
