//! Filesystem event source for watch mode.
//!
//! Thin collaborator around the `notify` crate: it watches a single
//! directory non-recursively, filters for create events, and hands each
//! created path to a plain callback. The loop polls a stop flag between
//! channel receives so an interrupt halts event processing promptly
//! without touching in-flight ledger writes.

use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tracing::{info, warn};

/// How long the loop blocks on the event channel before re-checking the
/// stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Watches `dir` for newly created files until `stop` is set.
///
/// Each created path is passed to `on_created`. Events are delivered and
/// processed serially; there are never concurrent in-flight callbacks.
///
/// # Errors
///
/// Returns a `notify::Error` if the watcher cannot be created or attached
/// to the directory. Errors reported by the watcher after startup are
/// logged and do not end the loop.
pub fn watch_until_stopped(
    dir: &Path,
    stop: &AtomicBool,
    mut on_created: impl FnMut(PathBuf),
) -> notify::Result<()> {
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();

    let mut watcher = notify::recommended_watcher(move |result| {
        // The receiver disappears on shutdown; a failed send is fine.
        let _ = tx.send(result);
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    info!(dir = %dir.display(), "Watching for new files");

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                if matches!(event.kind, EventKind::Create(_)) {
                    for path in event.paths {
                        on_created(path);
                    }
                }
            }
            Ok(Err(e)) => warn!(error = %e, "Watcher reported an error"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Watcher channel closed unexpectedly");
                break;
            }
        }
    }

    info!(dir = %dir.display(), "Stopped watching");
    Ok(())
}
