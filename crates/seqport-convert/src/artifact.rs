//! Export artifact validation and naming.
//!
//! An artifact is valid when it exists and is at least the configured
//! minimum size. Names follow `base.ext`, then `base_1.ext`, `base_2.ext`,
//! and so on; an existing name is never overwritten.

use seqport_common::ContainerFormat;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Highest numbered variant inspected when looking for an existing export.
pub const MAX_EXISTING_SUFFIX: u32 = 99;

/// Numbered names tried before giving up on a destination.
pub const NAME_CAP: u32 = 1000;

/// Attempts made to delete a locked file.
pub const DELETE_ATTEMPTS: u32 = 3;

/// Pause between delete attempts.
pub const DELETE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// File name for `base` with an optional numeric suffix.
pub fn artifact_name(base: &str, suffix: Option<u32>, format: ContainerFormat) -> String {
    match suffix {
        Some(n) => format!("{}_{}.{}", base, n, format.tag()),
        None => format!("{}.{}", base, format.tag()),
    }
}

/// Size of a regular file, or `None` if it is missing or not a file.
pub fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Whether `path` is a file of at least `min_bytes`.
pub fn is_valid(path: &Path, min_bytes: u64) -> bool {
    file_size(path).map(|size| size >= min_bytes).unwrap_or(false)
}

/// Find the first valid export of `base` in `dir`.
///
/// For each format in order, checks the bare name then suffixes
/// `1..=MAX_EXISTING_SUFFIX`.
pub fn find_existing(
    dir: &Path,
    base: &str,
    formats: &[ContainerFormat],
    min_bytes: u64,
) -> Option<PathBuf> {
    for &format in formats {
        let suffixes = std::iter::once(None).chain((1..=MAX_EXISTING_SUFFIX).map(Some));
        for suffix in suffixes {
            let candidate = dir.join(artifact_name(base, suffix, format));
            if is_valid(&candidate, min_bytes) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Whether `file_name` is `base.ext` or `base_<digits>.ext`.
fn is_candidate_name(file_name: &str, base: &str, format: ContainerFormat) -> bool {
    let Some((stem, ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    if !ext.eq_ignore_ascii_case(format.tag()) {
        return false;
    }
    match stem.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('_')
            .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false),
        None => false,
    }
}

/// Delete every bare or numbered export of `base` in `dir` that fails validation.
///
/// Best-effort: files that cannot be removed are logged and skipped.
/// Returns the number of files deleted.
pub fn clean_invalid(
    dir: &Path,
    base: &str,
    formats: &[ContainerFormat],
    min_bytes: u64,
) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!("Cannot list {} for cleanup: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !formats.iter().any(|&f| is_candidate_name(name, base, f)) {
            continue;
        }

        let path = entry.path();
        if is_valid(&path, min_bytes) || !path.is_file() {
            continue;
        }

        match remove_with_retry(&path) {
            Ok(()) => {
                tracing::info!("Removed invalid export {}", path.display());
                removed += 1;
            }
            Err(e) => tracing::warn!("Could not remove invalid export: {}", e),
        }
    }
    removed
}

/// First unused output path for `base` in `dir`.
///
/// # Errors
///
/// Returns [`Error::NamesExhausted`] when the bare name and every suffix
/// below [`NAME_CAP`] are taken.
pub fn next_available_name(dir: &Path, base: &str, format: ContainerFormat) -> Result<PathBuf> {
    let suffixes = std::iter::once(None).chain((1..NAME_CAP).map(Some));
    for suffix in suffixes {
        let candidate = dir.join(artifact_name(base, suffix, format));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(Error::NamesExhausted {
        base: base.to_string(),
        cap: NAME_CAP,
    })
}

/// Delete a file, retrying transient failures such as sharing locks.
///
/// A file that is already gone counts as removed. Sleeps between attempts;
/// async callers should run it on the blocking pool.
pub fn remove_with_retry(path: &Path) -> Result<()> {
    let mut attempt = 1;
    loop {
        match std::fs::remove_file(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) if attempt < DELETE_ATTEMPTS => {
                tracing::debug!(
                    "Delete attempt {}/{} failed for {}: {}",
                    attempt,
                    DELETE_ATTEMPTS,
                    path.display(),
                    e
                );
                std::thread::sleep(DELETE_RETRY_DELAY);
                attempt += 1;
            }
            Err(e) => return Err(Error::filesystem(path, e)),
        }
    }
}
