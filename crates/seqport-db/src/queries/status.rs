//! Status table query operations.
//!
//! Status tables share one layout keyed by
//! `(recording_date, case_no, camera_name)`. The table name is configurable
//! so the same functions serve both the sequence and export trees.

use rusqlite::{params, Connection, Row};
use seqport_common::{Error, Result};

use crate::models::{StatusRow, StatusUpsert, TableName};

const COLUMNS: &str = "recording_date, case_no, camera_name, value, comments, size_mb";

fn row_to_status(row: &Row<'_>) -> rusqlite::Result<StatusRow> {
    Ok(StatusRow {
        recording_date: row.get(0)?,
        case_no: row.get(1)?,
        camera_name: row.get(2)?,
        value: row.get(3)?,
        comments: row.get(4)?,
        size_mb: row.get(5)?,
    })
}

/// Create the status table if it does not exist.
pub fn ensure_table(conn: &Connection, table: &TableName) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            recording_date TEXT NOT NULL,
            case_no INTEGER NOT NULL,
            camera_name TEXT NOT NULL,
            value INTEGER,
            comments TEXT,
            size_mb INTEGER,
            PRIMARY KEY (recording_date, case_no, camera_name)
        );"
    ))
    .map_err(|e| Error::database(e.to_string()))
}

/// List every row of a status table ordered by case, then channel name.
pub fn list_rows(conn: &Connection, table: &TableName) -> Result<Vec<StatusRow>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM {table} ORDER BY recording_date, case_no, camera_name"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([], row_to_status)
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// List rows whose status value equals `value`.
pub fn rows_with_value(conn: &Connection, table: &TableName, value: i64) -> Result<Vec<StatusRow>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM {table} WHERE value = ?1
             ORDER BY recording_date, case_no, camera_name"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([value], row_to_status)
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Fetch one row by key.
pub fn get_row(
    conn: &Connection,
    table: &TableName,
    recording_date: &str,
    case_no: i64,
    camera_name: &str,
) -> Result<Option<StatusRow>> {
    match conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM {table}
             WHERE recording_date = ?1 AND case_no = ?2 AND camera_name = ?3"
        ),
        params![recording_date, case_no, camera_name],
        row_to_status,
    ) {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Write status values for many rows inside one transaction.
///
/// Existing rows keep their `comments`. Either every row is written or none.
pub fn upsert_rows(conn: &Connection, table: &TableName, rows: &[StatusUpsert]) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {table} (recording_date, case_no, camera_name, value, size_mb)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(recording_date, case_no, camera_name)
                 DO UPDATE SET value = excluded.value, size_mb = excluded.size_mb"
            ))
            .map_err(|e| Error::database(e.to_string()))?;

        for row in rows {
            stmt.execute(params![
                row.case.recording_date(),
                row.case.number(),
                row.channel.as_str(),
                row.value,
                row.size_mb,
            ])
            .map_err(|e| Error::database(e.to_string()))?;
        }
    }

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(rows.len())
}

/// Count rows per (camera_name, value).
///
/// Rows with a NULL value are reported with `None`.
pub fn value_counts(
    conn: &Connection,
    table: &TableName,
) -> Result<Vec<(String, Option<i64>, i64)>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT camera_name, value, COUNT(*) FROM {table}
             GROUP BY camera_name, value ORDER BY camera_name, value"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}
