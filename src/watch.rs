//! Rebuild on change.
//!
//! Watches the docs directory recursively and calls back once per burst of
//! changes: every event restarts a quiet period, and the callback runs only
//! after [`DEBOUNCE`] passes without another event. Events on ignored paths
//! (the generated `book.json`, a build output directory) never trigger a
//! rebuild, so writing the output cannot loop.

use notify::{RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;

pub const DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch error: {0}")]
    Notify(#[from] notify::Error),
}

/// Whether `path` is, or lies under, one of the ignored paths.
pub fn is_ignored(path: &Path, ignore: &[PathBuf]) -> bool {
    ignore.iter().any(|ignored| path.starts_with(ignored))
}

/// Whether a path relative to the watched root passes through a dot entry.
pub fn is_hidden(rel: &Path) -> bool {
    rel.components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Absolute form of a path that may not exist yet.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(path) = path.canonicalize() {
        return path;
    }
    match (path.parent().map(Path::canonicalize), path.file_name()) {
        (Some(Ok(parent)), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}

/// Block until a burst of changes has settled and return its paths.
///
/// Returns `None` once the sender side is gone.
pub fn next_batch(rx: &Receiver<PathBuf>, quiet: Duration) -> Option<Vec<PathBuf>> {
    let first = rx.recv().ok()?;
    let mut batch = vec![first];
    loop {
        match rx.recv_timeout(quiet) {
            Ok(path) => {
                if !batch.contains(&path) {
                    batch.push(path);
                }
            }
            Err(RecvTimeoutError::Timeout) => return Some(batch),
            Err(RecvTimeoutError::Disconnected) => return Some(batch),
        }
    }
}

/// Watch `dir` and call `on_change` after every settled burst of changes.
///
/// Runs until the watcher stops delivering events.
pub fn watch(
    dir: &Path,
    ignore: &[PathBuf],
    mut on_change: impl FnMut(&[PathBuf]),
) -> Result<(), WatchError> {
    let ignore: Vec<PathBuf> = ignore.iter().map(|p| absolute(p)).collect();
    let root = absolute(dir);
    let (tx, rx) = mpsc::channel();

    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("watch: {e}");
                return;
            }
        };
        if !(event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()) {
            return;
        }
        for path in event.paths {
            let hidden = path.strip_prefix(&root).is_ok_and(is_hidden);
            if !hidden && !is_ignored(&path, &ignore) {
                // The receiver only goes away when watching ends.
                let _ = tx.send(path);
            }
        }
    })?;
    watcher.watch(dir, RecursiveMode::Recursive)?;
    tracing::info!("watching {}", dir.display());

    while let Some(batch) = next_batch(&rx, DEBOUNCE) {
        tracing::debug!("{} changed paths", batch.len());
        on_change(&batch);
    }
    Ok(())
}
