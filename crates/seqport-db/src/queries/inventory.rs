//! Export inventory query operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use seqport_common::{Error, Result};

use crate::models::{InventoryEntry, TableName};

/// Create the inventory table if it does not exist.
pub fn ensure_table(conn: &Connection, table: &TableName) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            date_case TEXT NOT NULL,
            camera_name TEXT NOT NULL,
            file_count INTEGER NOT NULL DEFAULT 0,
            total_size_bytes INTEGER NOT NULL DEFAULT 0,
            largest_path TEXT,
            scanned_at TEXT NOT NULL,
            PRIMARY KEY (date_case, camera_name)
        );"
    ))
    .map_err(|e| Error::database(e.to_string()))
}

/// Upsert inventory entries in one transaction.
pub fn upsert_entries(
    conn: &Connection,
    table: &TableName,
    entries: &[InventoryEntry],
) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {table}
                    (date_case, camera_name, file_count, total_size_bytes, largest_path, scanned_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(date_case, camera_name) DO UPDATE SET
                    file_count = excluded.file_count,
                    total_size_bytes = excluded.total_size_bytes,
                    largest_path = excluded.largest_path,
                    scanned_at = excluded.scanned_at"
            ))
            .map_err(|e| Error::database(e.to_string()))?;

        for entry in entries {
            stmt.execute(params![
                entry.date_case,
                entry.camera_name,
                entry.file_count,
                entry.total_size_bytes,
                entry.largest_path,
                entry.scanned_at.to_rfc3339(),
            ])
            .map_err(|e| Error::database(e.to_string()))?;
        }
    }

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(entries.len())
}

/// List inventory entries ordered by case key and channel.
pub fn list_entries(conn: &Connection, table: &TableName) -> Result<Vec<InventoryEntry>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT date_case, camera_name, file_count, total_size_bytes, largest_path, scanned_at
             FROM {table} ORDER BY date_case, camera_name"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(InventoryEntry {
                date_case: row.get(0)?,
                camera_name: row.get(1)?,
                file_count: row.get(2)?,
                total_size_bytes: row.get(3)?,
                largest_path: row.get(4)?,
                scanned_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(5)?)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}
