//! Export inventory scan.
//!
//! Records, for every (case, channel) slot of the recordings tree, how many
//! exports it holds, their total size, and the largest one.

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use seqport_db::models::{InventoryEntry, TableName};
use seqport_db::queries::inventory;
use std::path::Path;
use tracing::info;

use crate::reconcile::scanner::scan_channels;

/// Scan `root` for files with extension `suffix` directly inside each
/// channel directory.
pub fn scan(root: &Path, suffix: &str) -> Result<Vec<InventoryEntry>> {
    let scanned_at = Utc::now();
    let entries = scan_channels(root, suffix, false)?
        .into_iter()
        .map(|scan| InventoryEntry {
            date_case: scan.case.to_string(),
            camera_name: scan.channel.as_str().to_string(),
            file_count: scan.stats.count as i64,
            total_size_bytes: scan.stats.total_bytes as i64,
            largest_path: scan
                .stats
                .largest
                .map(|(path, _)| path.display().to_string()),
            scanned_at,
        })
        .collect();
    Ok(entries)
}

/// Scan and upsert the inventory. Returns the rows written.
pub fn refresh(conn: &Connection, table: &TableName, root: &Path, suffix: &str) -> Result<usize> {
    let entries = scan(root, suffix)?;
    inventory::ensure_table(conn, table)?;
    let written = inventory::upsert_entries(conn, table, &entries)?;
    info!("Wrote or updated {} rows into {}", written, table);
    Ok(written)
}
