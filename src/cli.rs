//! Command-line interface module for tidywatch.
//!
//! This module handles all CLI-related functionality:
//! - Argument parsing and validation
//! - Watch-mode orchestration (config, initial sweep, live watch)
//! - Undo operation handling and reporting

use crate::config::WatchConfig;
use crate::organizer::{Organizer, SweepSummary};
use crate::output::OutputFormatter;
use crate::undo::UndoEngine;
use crate::watcher;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// Organize a directory in real time, with every move recorded so it can
/// be undone later.
#[derive(Debug, Parser)]
#[command(name = "tidywatch", version)]
pub struct Cli {
    /// Directory to watch and organize.
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Revert every recorded move and exit.
    #[arg(long)]
    pub undo: bool,

    /// YAML file mapping categories to file extensions.
    #[arg(long, value_name = "FILE", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Move history database (defaults to the platform data directory).
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Milliseconds to wait after a create event before processing a file.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub settle_ms: u64,
}

impl Cli {
    /// Resolved ledger location: the explicit `--history` path or the
    /// per-user default.
    pub fn history_path(&self) -> PathBuf {
        self.history.clone().unwrap_or_else(default_history_path)
    }
}

/// Default ledger location under the platform's local data directory.
pub fn default_history_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tidywatch")
        .join("history.db")
}

/// Runs the selected mode. Returns an error string for fatal startup
/// conditions; per-file problems are handled (and logged) further down.
pub fn run(cli: &Cli) -> Result<(), String> {
    if cli.undo {
        run_undo(&cli.history_path())
    } else if let Some(source) = cli.source.clone() {
        run_watch(cli, &source)
    } else {
        // main prints usage before calling run; nothing to do here.
        Ok(())
    }
}

/// Watch mode: load configuration, sweep pre-existing files, then watch
/// for new ones until interrupted.
fn run_watch(cli: &Cli, source: &Path) -> Result<(), String> {
    let config = WatchConfig::load(&cli.config)
        .map_err(|e| format!("Cannot start watching: {}", e))?;
    let rules = config.compile();

    let history = crate::history::MoveHistory::open(&cli.history_path())
        .map_err(|e| e.to_string())?;

    let mut organizer = Organizer::new(source, rules, history)
        .map_err(|e| e.to_string())?
        .with_settle_delay(Duration::from_millis(cli.settle_ms));

    info!(dir = %source.display(), "Starting tidywatch on directory");
    OutputFormatter::info(&format!("Organizing contents of: {}", source.display()));

    // Initial sweep over whatever is already there, listing taken once.
    let targets = organizer.sweep_targets().map_err(|e| e.to_string())?;
    let progress = OutputFormatter::create_progress_bar(targets.len() as u64);
    let mut summary = SweepSummary::default();
    for path in &targets {
        summary.record(&organizer.handle_new_file(path));
        progress.inc(1);
    }
    progress.finish_and_clear();
    OutputFormatter::summary_table(&summary.moved, summary.total_moved());
    if summary.failed > 0 {
        OutputFormatter::warning(&format!(
            "{} file(s) could not be organized; see the log for details",
            summary.failed
        ));
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })
    .map_err(|e| format!("Could not install interrupt handler: {}", e))?;

    OutputFormatter::info("Watching for new files. Press Ctrl-C to stop.");
    watcher::watch_until_stopped(source, &stop, |path| {
        organizer.handle_new_file(&path);
    })
    .map_err(|e| format!("Watcher failed: {}", e))?;

    OutputFormatter::success("Shut down cleanly.");
    Ok(())
}

/// Undo mode: replay the whole ledger backwards and report the result.
fn run_undo(history_path: &Path) -> Result<(), String> {
    OutputFormatter::info("Undoing recorded moves...");

    let report = UndoEngine::undo_all(history_path).map_err(|e| e.to_string())?;

    if report.total_processed() == 0 {
        OutputFormatter::info("Nothing to undo.");
        return Ok(());
    }

    OutputFormatter::success(&format!("Reverted: {}", report.reverted));
    if report.folders_removed > 0 {
        OutputFormatter::info(&format!(
            "Removed {} empty category folder(s)",
            report.folders_removed
        ));
    }
    if report.stale_removed > 0 {
        OutputFormatter::warning(&format!(
            "Removed {} stale record(s) whose files had already moved on",
            report.stale_removed
        ));
    }
    if !report.failed.is_empty() {
        OutputFormatter::error(&format!("Failed: {}", report.failed.len()));
        for (path, reason) in &report.failed {
            OutputFormatter::error(&format!("  {}: {}", path.display(), reason));
        }
        OutputFormatter::warning("Failed records were kept; run --undo again after fixing them.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_path_prefers_explicit_flag() {
        let cli = Cli {
            source: None,
            undo: true,
            config: PathBuf::from("config.yaml"),
            history: Some(PathBuf::from("/tmp/custom.db")),
            settle_ms: 0,
        };
        assert_eq!(cli.history_path(), PathBuf::from("/tmp/custom.db"));
    }

    #[test]
    fn test_default_history_path_is_namespaced() {
        let path = default_history_path();
        assert!(path.ends_with(Path::new("tidywatch").join("history.db")));
    }

    #[test]
    fn test_run_without_mode_is_noop() {
        let cli = Cli {
            source: None,
            undo: false,
            config: PathBuf::from("config.yaml"),
            history: None,
            settle_ms: 0,
        };
        assert!(run(&cli).is_ok());
    }
}
