//! Re-run the script stages whenever a configured script changes.
//!
//! The parent directories are watched rather than the files themselves:
//! editors commonly save by writing a temp file and renaming it over the
//! original, which a per-file watch would lose track of. Events are grouped
//! over a short quiet period so one save triggers one rebuild.

use crate::config::ScriptsConfig;
use crate::scripts::lint_and_minify;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

const QUIET_PERIOD: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),
    #[error("watched file has no parent directory: {0}")]
    NoParent(PathBuf),
}

/// `path` with a canonical parent, so event paths and configured paths
/// compare equal. The file itself may be missing mid-save.
fn normalize(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => dir
            .canonicalize()
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Watched files written or created by `event`.
fn changed_files(event: &Event, watched: &BTreeSet<PathBuf>) -> Vec<PathBuf> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .map(|p| normalize(p))
        .filter(|p| watched.contains(p))
        .collect()
}

/// Block and call `on_change` with the changed files after each burst of
/// events. Returns once `on_change` returns `false`.
pub fn watch_files(
    files: &[PathBuf],
    mut on_change: impl FnMut(&[PathBuf]) -> bool,
) -> Result<(), WatchError> {
    let watched: BTreeSet<PathBuf> = files.iter().map(|f| normalize(f)).collect();
    let dirs = watched
        .iter()
        .map(|f| {
            f.parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| WatchError::NoParent(f.clone()))
        })
        .collect::<Result<BTreeSet<PathBuf>, _>>()?;

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx)?;
    for dir in &dirs {
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
    }

    while let Ok(first) = rx.recv() {
        let mut changed = BTreeSet::new();
        let mut collect = |result: notify::Result<Event>| match result {
            Ok(event) => changed.extend(changed_files(&event, &watched)),
            Err(e) => tracing::warn!(error = %e, "watch error"),
        };
        collect(first);
        while let Ok(more) = rx.recv_timeout(QUIET_PERIOD) {
            collect(more);
        }
        if changed.is_empty() {
            continue;
        }

        let changed: Vec<PathBuf> = changed.into_iter().collect();
        if !on_change(&changed) {
            break;
        }
        // Writes made by the rebuild itself (eslint --fix) must not retrigger it
        while rx.try_recv().is_ok() {}
    }
    Ok(())
}

/// Lint and minify the configured scripts on every change, until killed.
///
/// With no scripts configured there is nothing to watch and this returns.
pub fn watch_scripts(config: &ScriptsConfig, root: &Path) -> Result<(), WatchError> {
    if config.src.is_empty() {
        tracing::info!("no scripts configured, nothing to watch");
        return Ok(());
    }
    let files: Vec<PathBuf> = config.src.iter().map(|src| root.join(src)).collect();
    tracing::info!(files = files.len(), "watching scripts for changes");

    watch_files(&files, |changed| {
        for file in changed {
            tracing::info!(file = %file.display(), "changed");
        }
        match lint_and_minify(config, root) {
            Ok(report) => tracing::info!(%report, "scripts rebuilt"),
            Err(e) => tracing::warn!(error = %e, "scripts not rebuilt"),
        }
        true
    })
}
