//! Duplicate export cleanup.
//!
//! Repeated export runs and manual copies leave variants such as
//! `Monitor_1.mp4`, `Monitor (1).mp4` or `Monitor-copy.mp4` next to the
//! canonical `Monitor.mp4`. Within one directory every file belonging to the
//! same channel and extension forms a group, of which exactly one is kept.

use anyhow::{bail, Result};
use seqport_common::{Channel, ContainerFormat};
use seqport_convert::artifact::remove_with_retry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::reconcile::scanner::readable;

const VARIANT_SEPARATORS: [char; 4] = ['_', ' ', '-', '('];

/// Channel whose name `stem` is a variant of. The longest match wins.
pub fn matching_channel(stem: &str) -> Option<Channel> {
    Channel::ALL
        .iter()
        .copied()
        .filter(|channel| {
            let base = channel.as_str();
            stem == base
                || stem
                    .strip_prefix(base)
                    .and_then(|rest| rest.chars().next())
                    .map(|c| VARIANT_SEPARATORS.contains(&c))
                    .unwrap_or(false)
        })
        .max_by_key(|channel| channel.as_str().len())
}

#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
    canonical: bool,
}

/// One file staged for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedRemoval {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// The file kept in its place.
    pub kept: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupePlan {
    /// Groups holding more than one file.
    pub duplicate_groups: usize,
    pub remove: Vec<StagedRemoval>,
}

#[derive(Debug, Default, Serialize)]
pub struct DedupeReport {
    pub removed: usize,
    pub failed: Vec<(PathBuf, String)>,
}

/// Find duplicate exports under `root`.
pub fn plan(root: &Path, formats: &[ContainerFormat]) -> Result<DedupePlan> {
    if !root.is_dir() {
        bail!("Root path not found: {}", root.display());
    }

    let mut groups: BTreeMap<(PathBuf, Channel, &'static str), Vec<Candidate>> = BTreeMap::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(readable)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(format) = formats.iter().copied().find(|f| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(f.tag()))
                .unwrap_or(false)
        }) else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(channel) = matching_channel(stem) else {
            continue;
        };
        let Ok(meta) = entry.metadata() else {
            continue;
        };

        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        groups
            .entry((parent, channel, format.tag()))
            .or_default()
            .push(Candidate {
                path: path.to_path_buf(),
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                canonical: stem.eq_ignore_ascii_case(channel.as_str()),
            });
    }

    let mut plan = DedupePlan::default();
    for files in groups.into_values() {
        if files.len() < 2 {
            continue;
        }
        plan.duplicate_groups += 1;

        let keep = files
            .iter()
            .find(|c| c.canonical)
            .or_else(|| files.iter().max_by_key(|c| (c.size, c.modified)))
            .map(|c| c.path.clone());
        let Some(keep) = keep else { continue };

        plan.remove.extend(
            files
                .into_iter()
                .filter(|c| c.path != keep)
                .map(|c| StagedRemoval {
                    path: c.path,
                    size_bytes: c.size,
                    kept: keep.clone(),
                }),
        );
    }
    Ok(plan)
}

/// Delete every staged file.
pub fn apply(plan: &DedupePlan) -> DedupeReport {
    let mut report = DedupeReport::default();
    for staged in &plan.remove {
        match remove_with_retry(&staged.path) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                warn!("Could not delete {}: {}", staged.path.display(), e);
                report.failed.push((staged.path.clone(), e.to_string()));
            }
        }
    }
    info!("Removed {} duplicate exports", report.removed);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn sized(path: &Path, len: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap().set_len(len).unwrap();
    }

    #[test]
    fn test_matching_channel() {
        assert_eq!(matching_channel("Monitor"), Some(Channel::Monitor));
        assert_eq!(matching_channel("Monitor (1)"), Some(Channel::Monitor));
        assert_eq!(matching_channel("Monitor-copy"), Some(Channel::Monitor));
        assert_eq!(matching_channel("Patient_Monitor_2"), Some(Channel::PatientMonitor));
        assert_eq!(matching_channel("Monitors"), None);
        assert_eq!(matching_channel("rec"), None);
    }

    #[test]
    fn test_keeps_canonical() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("DATA_23-02-05/Case1/Monitor");
        sized(&dir.join("Monitor.mp4"), 10);
        sized(&dir.join("Monitor_1.mp4"), 500);
        sized(&dir.join("Monitor (2).mp4"), 20);
        sized(&dir.join("Monitor.avi"), 5);

        let plan = plan(tmp.path(), &ContainerFormat::ALL).unwrap();
        assert_eq!(plan.duplicate_groups, 1);
        let removed: Vec<PathBuf> = plan.remove.iter().map(|r| r.path.clone()).collect();
        assert_eq!(removed, [dir.join("Monitor (2).mp4"), dir.join("Monitor_1.mp4")]);
        assert!(plan.remove.iter().all(|r| r.kept == dir.join("Monitor.mp4")));
    }

    #[test]
    fn test_keeps_largest_without_canonical() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("General_3");
        sized(&dir.join("General_3_1.mp4"), 10);
        sized(&dir.join("General_3_2.mp4"), 30);

        let plan = plan(tmp.path(), &ContainerFormat::ALL).unwrap();
        assert_eq!(plan.remove.len(), 1);
        assert_eq!(plan.remove[0].path, dir.join("General_3_1.mp4"));
        assert_eq!(plan.remove[0].kept, dir.join("General_3_2.mp4"));
    }

    #[test]
    fn test_apply_deletes_staged() {
        let tmp = tempdir().unwrap();
        sized(&tmp.path().join("Monitor.mp4"), 10);
        sized(&tmp.path().join("Monitor_1.mp4"), 10);
        sized(&tmp.path().join("other/Monitor_1.mp4"), 10);

        let plan = plan(tmp.path(), &ContainerFormat::ALL).unwrap();
        let report = apply(&plan);
        assert_eq!(report.removed, 1);
        assert!(report.failed.is_empty());
        assert!(tmp.path().join("Monitor.mp4").exists());
        assert!(!tmp.path().join("Monitor_1.mp4").exists());
        assert!(tmp.path().join("other/Monitor_1.mp4").exists());
    }
}
