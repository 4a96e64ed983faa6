//! Modification-time based staleness checks.
//!
//! Repeated runs are incremental: an output that is at least as new as its
//! source is left alone. The comparison is always between one source and
//! the output of the *same* variant in one specific directory. A variant
//! that fans out to several directories is stale when any of them is, since
//! the executor rewrites all of them from a single transform.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// True if `destination_dir/output_name` is missing or older than `source`.
///
/// An unreadable modification time on either side counts as stale.
pub fn is_stale(source: &Path, destination_dir: &Path, output_name: &str) -> bool {
    let output = destination_dir.join(output_name);
    match (modified(source), modified(&output)) {
        (Some(src), Some(out)) => out < src,
        _ => true,
    }
}

/// True if the output is stale in at least one of `destinations`.
pub fn is_stale_anywhere(source: &Path, destinations: &[PathBuf], output_name: &str) -> bool {
    destinations
        .iter()
        .any(|dir| is_stale(source, dir, output_name))
}
