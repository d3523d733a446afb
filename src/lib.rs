//! tidywatch - real-time directory organization with undo
//!
//! This library watches a directory for newly created files, moves each
//! one into a category subfolder chosen by its extension, and records
//! every move in a durable SQLite ledger so a whole run can be reversed.

pub mod category;
pub mod cli;
pub mod config;
pub mod history;
pub mod organizer;
pub mod output;
pub mod undo;
pub mod watcher;

pub use category::{CategoryRules, Classification};
pub use config::{ConfigError, WatchConfig};
pub use history::{MoveHistory, MoveRecord};
pub use organizer::{FileOutcome, Organizer, SweepSummary};
pub use undo::{UndoEngine, UndoReport};

pub use cli::{Cli, run};
