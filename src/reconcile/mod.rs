//! Status reconciliation.
//!
//! Recomputes a status code for every (case, channel) slot of a recording
//! tree, diffs it against the status store, and writes the staged diff back
//! once the operator confirms it.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 1 | at least one file at or above the threshold |
//! | 2 | files exist, all below the threshold |
//! | 3 | no matching files |
//! | 4 | format anomaly, only ever set externally |

pub mod purge;
pub mod scanner;

use anyhow::{Context, Result};
use rusqlite::Connection;
use seqport_common::{CaseId, Channel, StatusCode, BYTES_PER_MB};
use seqport_db::models::{StatusUpsert, TableName};
use seqport_db::queries::status;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use scanner::ChannelScan;

/// Which tree and status table a reconcile pass works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileTarget {
    /// Sequence backup tree against the sequence status table.
    #[default]
    Sequences,
    /// Exported recordings tree against the export status table.
    Exports,
}

impl ReconcileTarget {
    pub fn root<'a>(&self, config: &'a Config) -> Option<&'a Path> {
        match self {
            ReconcileTarget::Sequences => config.paths.sequence_root.as_deref(),
            ReconcileTarget::Exports => config.paths.recordings_root.as_deref(),
        }
    }

    pub fn suffix<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            ReconcileTarget::Sequences => &config.reconcile.sequence_suffix,
            ReconcileTarget::Exports => &config.reconcile.export_suffix,
        }
    }

    pub fn table<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            ReconcileTarget::Sequences => &config.reconcile.sequence_table,
            ReconcileTarget::Exports => &config.reconcile.export_table,
        }
    }
}

/// Freshly computed status of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScannedEntry {
    pub case: CaseId,
    pub channel: Channel,
    pub status: StatusCode,
    /// Largest matching file in whole megabytes, `None` without files.
    pub size_mb: Option<i64>,
}

impl ScannedEntry {
    pub fn from_scan(scan: &ChannelScan, threshold_bytes: u64) -> Self {
        let largest = scan.stats.largest_size();
        Self {
            case: scan.case,
            channel: scan.channel,
            status: StatusCode::classify(largest, threshold_bytes),
            size_mb: largest.map(|bytes| (bytes / BYTES_PER_MB) as i64),
        }
    }

    fn upsert(&self) -> StatusUpsert {
        StatusUpsert {
            case: self.case,
            channel: self.channel,
            value: self.status.code(),
            size_mb: self.size_mb,
        }
    }
}

fn size_text(size_mb: Option<i64>) -> String {
    size_mb
        .map(|s| s.to_string())
        .unwrap_or_else(|| "NULL".to_string())
}

impl fmt::Display for ScannedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Case {} {}: status={}, size={}MB",
            self.case.recording_date(),
            self.case.number(),
            self.channel,
            self.status.code(),
            size_text(self.size_mb)
        )
    }
}

/// A slot whose stored status or size differs from the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedEntry {
    pub entry: ScannedEntry,
    pub old_value: Option<i64>,
    pub old_size_mb: Option<i64>,
}

impl fmt::Display for ChangedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let old_value = self
            .old_value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "NULL".to_string());
        write!(
            f,
            "{} Case {} {}: status {}->{}, size {}->{}MB",
            self.entry.case.recording_date(),
            self.entry.case.number(),
            self.entry.channel,
            old_value,
            self.entry.status.code(),
            size_text(self.old_size_mb),
            size_text(self.entry.size_mb)
        )
    }
}

/// Staged diff between the filesystem and the store.
///
/// A plan is a snapshot; committing it never re-reads the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub table: String,
    pub new: Vec<ScannedEntry>,
    pub changed: Vec<ChangedEntry>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.changed.len()
    }

    fn upserts(&self) -> Vec<StatusUpsert> {
        self.new
            .iter()
            .chain(self.changed.iter().map(|c| &c.entry))
            .map(ScannedEntry::upsert)
            .collect()
    }
}

/// Scan `root` and compute the status of every slot.
pub fn scan(root: &Path, suffix: &str, threshold_bytes: u64) -> Result<Vec<ScannedEntry>> {
    let scans = scanner::scan_channels(root, suffix, true)?;
    Ok(scans
        .iter()
        .map(|s| ScannedEntry::from_scan(s, threshold_bytes))
        .collect())
}

/// Diff scanned entries against the stored rows of `table`.
///
/// Creates the table if it does not exist.
pub fn stage(
    conn: &Connection,
    table: &TableName,
    scanned: &[ScannedEntry],
) -> seqport_common::Result<ReconcilePlan> {
    status::ensure_table(conn, table)?;

    let mut plan = ReconcilePlan {
        table: table.to_string(),
        ..Default::default()
    };
    for entry in scanned {
        let existing = status::get_row(
            conn,
            table,
            &entry.case.recording_date(),
            entry.case.number() as i64,
            entry.channel.as_str(),
        )?;
        match existing {
            None => plan.new.push(*entry),
            Some(row) => {
                if row.value != Some(entry.status.code()) || row.size_mb != entry.size_mb {
                    plan.changed.push(ChangedEntry {
                        entry: *entry,
                        old_value: row.value,
                        old_size_mb: row.size_mb,
                    });
                }
            }
        }
    }
    Ok(plan)
}

/// Write a staged plan in one transaction. Returns the rows written.
pub fn commit(
    conn: &Connection,
    table: &TableName,
    plan: &ReconcilePlan,
) -> seqport_common::Result<usize> {
    status::upsert_rows(conn, table, &plan.upserts())
}

/// Full inputs of one reconcile pass.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub root: PathBuf,
    pub suffix: String,
    pub table: TableName,
    pub threshold_bytes: u64,
}

impl ReconcileRequest {
    /// Resolve a request for `target`, with optional overrides.
    pub fn resolve(
        config: &Config,
        target: ReconcileTarget,
        root: Option<PathBuf>,
        threshold_mb: Option<u64>,
    ) -> Result<Self> {
        let root = root
            .or_else(|| target.root(config).map(Path::to_path_buf))
            .with_context(|| {
                format!(
                    "No root configured for {:?}; pass --root or set it under [paths]",
                    target
                )
            })?;
        let table = TableName::new(target.table(config))?;
        Ok(Self {
            root,
            suffix: target.suffix(config).to_string(),
            table,
            threshold_bytes: threshold_mb.unwrap_or(config.reconcile.threshold_mb) * BYTES_PER_MB,
        })
    }

    /// Scan the tree and stage the diff against the store.
    pub fn plan(&self, conn: &Connection) -> Result<ReconcilePlan> {
        let scanned = scan(&self.root, &self.suffix, self.threshold_bytes)?;
        tracing::info!(
            "Scanned {} channel slots under {}",
            scanned.len(),
            self.root.display()
        );
        Ok(stage(conn, &self.table, &scanned)?)
    }
}
