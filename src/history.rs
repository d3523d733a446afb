/// Durable move history store backed by SQLite.
///
/// Every successful move is recorded as a `MoveRecord` row in the
/// `move_history` table. The table is append-only during normal operation
/// and is drained newest-first by the undo engine. Each insert or delete
/// runs in its own committed transaction so a crash mid-operation can never
/// leave a torn record behind.
use chrono::Utc;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

/// A single recorded move, immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    /// Monotonically assigned identifier (SQLite rowid).
    pub id: i64,
    /// Where the file was before the move.
    pub source_path: String,
    /// Where the file was moved to.
    pub destination_path: String,
    /// RFC 3339 timestamp of the move.
    pub timestamp: String,
}

/// Errors that can occur while reading or writing the history store.
#[derive(Debug)]
pub enum HistoryError {
    /// Failed to open or initialize the database file.
    OpenFailed {
        path: PathBuf,
        source: rusqlite::Error,
    },
    /// Failed to create the directory that should hold the database file.
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A query or statement against the ledger failed.
    Sql { source: rusqlite::Error },
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenFailed { path, source } => {
                write!(
                    f,
                    "Failed to open history database {}: {}",
                    path.display(),
                    source
                )
            }
            Self::CreateDirFailed { path, source } => {
                write!(
                    f,
                    "Failed to create history directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::Sql { source } => write!(f, "History database error: {}", source),
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<rusqlite::Error> for HistoryError {
    fn from(source: rusqlite::Error) -> Self {
        Self::Sql { source }
    }
}

/// Result type for history store operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Append-only ledger of performed moves.
pub struct MoveHistory {
    conn: Connection,
    path: PathBuf,
}

impl MoveHistory {
    /// Opens (creating if necessary) the history database at `path`.
    ///
    /// The `move_history` table is created if absent. WAL journaling and
    /// full synchronous commits are enabled so committed records survive a
    /// crash.
    pub fn open(path: &Path) -> HistoryResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|source| HistoryError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| HistoryError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS move_history (
                id INTEGER PRIMARY KEY,
                source_path TEXT NOT NULL,
                destination_path TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records a performed move and returns the assigned id.
    pub fn record_move(&mut self, source: &Path, destination: &Path) -> HistoryResult<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO move_history (source_path, destination_path, timestamp)
             VALUES (?1, ?2, ?3)",
            params![
                source.to_string_lossy(),
                destination.to_string_lossy(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    /// Returns every record, most recent move first.
    pub fn newest_first(&self) -> HistoryResult<Vec<MoveRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_path, destination_path, timestamp
             FROM move_history ORDER BY id DESC",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(MoveRecord {
                    id: row.get(0)?,
                    source_path: row.get(1)?,
                    destination_path: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Deletes the record with the given id.
    pub fn delete(&mut self, id: i64) -> HistoryResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM move_history WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    /// Number of records currently in the ledger.
    pub fn len(&self) -> HistoryResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM move_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// True if the ledger holds no records.
    pub fn is_empty(&self) -> HistoryResult<bool> {
        Ok(self.len()? == 0)
    }
}
