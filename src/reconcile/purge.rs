//! Removal of undersized files ahead of a reconcile pass.

use seqport_common::paths::has_extension;
use seqport_convert::artifact::remove_with_retry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::scanner::readable;

/// What a purge removed and what it could not.
#[derive(Debug, Default, Serialize)]
pub struct PurgeReport {
    pub found: usize,
    pub deleted: usize,
    pub freed_bytes: u64,
    /// Files that survived every delete attempt, with the last error.
    pub failed: Vec<(PathBuf, String)>,
}

/// Delete every file under `root` with extension `suffix` smaller than
/// `below_bytes`.
pub fn purge_small_files(root: &Path, suffix: &str, below_bytes: u64) -> PurgeReport {
    let mut report = PurgeReport::default();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(readable)
    {
        if !entry.file_type().is_file() || !has_extension(entry.path(), suffix) {
            continue;
        }
        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!("Cannot stat {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if size >= below_bytes {
            continue;
        }

        report.found += 1;
        match remove_with_retry(entry.path()) {
            Ok(()) => {
                report.deleted += 1;
                report.freed_bytes += size;
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", entry.path().display(), e);
                report.failed.push((entry.path().to_path_buf(), e.to_string()));
            }
        }
    }

    info!(
        "Deleted {}/{} files below {} bytes under {}",
        report.deleted,
        report.found,
        below_bytes,
        root.display()
    );
    report
}
