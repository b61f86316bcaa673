//! Work discovery.
//!
//! Reads the status store for channels flagged with a target value and
//! expands each flagged `DATA_YY-MM-DD/CaseN/<channel>` directory into the
//! sequence file it holds.

use rusqlite::Connection;
use seqport_common::paths::has_extension;
use seqport_common::{CaseId, Channel};
use seqport_db::models::TableName;
use seqport_db::queries::status;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A flagged (case, channel) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelDir {
    pub case: CaseId,
    pub channel: Channel,
}

impl ChannelDir {
    /// `DATA_YY-MM-DD/CaseN/<channel>` relative to a tree root.
    pub fn relative_dir(&self) -> PathBuf {
        self.case.relative_dir().join(self.channel.as_str())
    }
}

/// What a channel directory resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCandidate {
    /// Exactly one matching file.
    File(PathBuf),
    /// More than one matching file. Never resolved automatically.
    Ambiguous { dir: PathBuf, files: Vec<PathBuf> },
    /// No matching file, or the directory is missing.
    Empty { dir: PathBuf },
}

/// List flagged channel directories in case, then channel order.
///
/// Rows whose date, case number, or channel cannot be decoded are logged
/// and skipped. Store failures propagate.
pub fn flagged_channel_dirs(
    conn: &Connection,
    table: &TableName,
    value: i64,
) -> seqport_common::Result<Vec<ChannelDir>> {
    let rows = status::rows_with_value(conn, table, value)?;

    let mut dirs: Vec<ChannelDir> = rows
        .iter()
        .filter_map(|row| match row.key() {
            Ok((case, channel)) => Some(ChannelDir { case, channel }),
            Err(e) => {
                warn!(
                    "Skipping {} row {} / {} / {}: {}",
                    table, row.recording_date, row.case_no, row.camera_name, e
                );
                None
            }
        })
        .collect();

    dirs.sort();
    dirs.dedup();
    debug!("{} channel directories flagged with value {}", dirs.len(), value);
    Ok(dirs)
}

/// Resolve the files in `dir` carrying extension `suffix`.
pub fn expand_dir(dir: &Path, suffix: &str) -> SourceCandidate {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read {}: {}", dir.display(), e);
            return SourceCandidate::Empty {
                dir: dir.to_path_buf(),
            };
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("Cannot read entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|path| path.is_file() && has_extension(path, suffix))
        .collect();
    files.sort();

    match files.len() {
        0 => SourceCandidate::Empty {
            dir: dir.to_path_buf(),
        },
        1 => SourceCandidate::File(files.remove(0)),
        _ => SourceCandidate::Ambiguous {
            dir: dir.to_path_buf(),
            files,
        },
    }
}

/// Expand explicit command-line paths. Directories are expanded like
/// discovered channel directories; anything else is taken as a file.
pub fn expand_paths(paths: &[PathBuf], suffix: &str) -> Vec<SourceCandidate> {
    paths
        .iter()
        .map(|path| {
            if path.is_dir() {
                expand_dir(path, suffix)
            } else {
                SourceCandidate::File(path.clone())
            }
        })
        .collect()
}

/// Discover source candidates under `root` for channels flagged `value`.
pub fn discover(
    conn: &Connection,
    table: &TableName,
    value: i64,
    root: &Path,
    suffix: &str,
) -> seqport_common::Result<Vec<SourceCandidate>> {
    let dirs = flagged_channel_dirs(conn, table, value)?;
    Ok(dirs
        .iter()
        .map(|d| expand_dir(&root.join(d.relative_dir()), suffix))
        .collect())
}
