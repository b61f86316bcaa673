//! Filesystem walk over `DATA_YY-MM-DD/CaseN/<channel>` trees.

use anyhow::{bail, Result};
use seqport_common::paths::has_extension;
use seqport_common::{CaseId, Channel};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// A recognized case directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDir {
    pub case: CaseId,
    pub path: PathBuf,
}

/// Aggregate of the files matching a suffix in one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
    pub count: usize,
    pub total_bytes: u64,
    /// Largest matching file and its size.
    pub largest: Option<(PathBuf, u64)>,
}

impl FileStats {
    pub fn largest_size(&self) -> Option<u64> {
        self.largest.as_ref().map(|(_, size)| *size)
    }

    /// Fold another directory's statistics into these.
    pub fn merge(&mut self, other: FileStats) {
        self.count += other.count;
        self.total_bytes += other.total_bytes;
        if let Some((path, size)) = other.largest {
            if self.largest_size().map(|largest| size > largest).unwrap_or(true) {
                self.largest = Some((path, size));
            }
        }
    }
}

/// Keep readable walk entries, logging the rest.
pub fn readable(entry: walkdir::Result<DirEntry>) -> Option<DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Skipping unreadable entry: {}", e);
            None
        }
    }
}

/// One (case, channel) slot of the tree. The directory may not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelScan {
    pub case: CaseId,
    pub channel: Channel,
    pub dir: PathBuf,
    pub stats: FileStats,
}

/// List case directories two levels below `root`, in case order.
///
/// Directories that look like `DATA_*`/`Case*` but do not decode to a valid
/// case are logged and skipped.
pub fn case_dirs(root: &Path) -> Result<Vec<CaseDir>> {
    if !root.is_dir() {
        bail!("Root path not found: {}", root.display());
    }

    let mut cases = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_type().is_dir())
        .filter_map(readable)
    {
        let path = entry.path();
        let (Some(data_name), Some(case_name)) = (
            path.parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str()),
            path.file_name().and_then(|n| n.to_str()),
        ) else {
            continue;
        };

        match CaseId::from_dir_names(data_name, case_name) {
            Ok(case) => cases.push(CaseDir {
                case,
                path: path.to_path_buf(),
            }),
            Err(e) => {
                let anchored = data_name.to_ascii_uppercase().starts_with("DATA_")
                    && case_name.to_ascii_lowercase().starts_with("case");
                if anchored {
                    warn!("Skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    cases.sort_by(|a, b| a.case.cmp(&b.case).then_with(|| a.path.cmp(&b.path)));
    debug!("Found {} case directories under {}", cases.len(), root.display());
    Ok(cases)
}

/// Collect size statistics for files with extension `suffix` in `dir`.
///
/// With `recursive` the whole subtree is searched; otherwise only direct
/// children. A missing directory yields empty statistics.
pub fn file_stats(dir: &Path, suffix: &str, recursive: bool) -> FileStats {
    let mut stats = FileStats::default();
    if !dir.is_dir() {
        return stats;
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    for entry in walker.into_iter().filter_map(readable) {
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
        stats.count += 1;
        stats.total_bytes += size;
        if stats.largest_size().map(|largest| size > largest).unwrap_or(true) {
            stats.largest = Some((entry.path().to_path_buf(), size));
        }
    }
    stats
}

/// Scan every fixed channel of every case under `root`.
///
/// Yields exactly one slot per (case, channel). Directories that decode to
/// the same case (`Case1` and `Case01`) are merged into the first one.
pub fn scan_channels(root: &Path, suffix: &str, recursive: bool) -> Result<Vec<ChannelScan>> {
    let mut scans: Vec<ChannelScan> = Vec::new();
    let mut previous: Option<CaseDir> = None;

    for case_dir in case_dirs(root)? {
        match previous.as_ref().filter(|p| p.case == case_dir.case) {
            Some(first) => {
                warn!(
                    "{} and {} are both case {}; merging",
                    first.path.display(),
                    case_dir.path.display(),
                    case_dir.case
                );
                let start = scans.len() - Channel::ALL.len();
                for (scan, channel) in scans[start..].iter_mut().zip(Channel::ALL) {
                    let dir = case_dir.path.join(channel.as_str());
                    scan.stats.merge(file_stats(&dir, suffix, recursive));
                }
            }
            None => {
                for channel in Channel::ALL {
                    let dir = case_dir.path.join(channel.as_str());
                    let stats = file_stats(&dir, suffix, recursive);
                    scans.push(ChannelScan {
                        case: case_dir.case,
                        channel,
                        dir,
                        stats,
                    });
                }
                previous = Some(case_dir);
            }
        }
    }
    Ok(scans)
}
