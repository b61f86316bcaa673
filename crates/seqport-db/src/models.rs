//! Rust models matching the status store schema.

use chrono::{DateTime, Utc};
use seqport_common::{CaseId, Channel, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated SQL table name.
///
/// Table names are configurable, so they are interpolated into statements.
/// Only `[A-Za-z0-9_]` is accepted and the name may not start with a digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && !name.starts_with(|c: char| c.is_ascii_digit())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(Self(name))
        } else {
            Err(Error::invalid_input(format!("invalid table name: {name:?}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One persisted row of a status table, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub recording_date: String,
    pub case_no: i64,
    pub camera_name: String,
    pub value: Option<i64>,
    pub comments: Option<String>,
    pub size_mb: Option<i64>,
}

impl StatusRow {
    /// Decode the row key into a case identifier and channel.
    pub fn key(&self) -> Result<(CaseId, Channel)> {
        let case = CaseId::from_parts(&self.recording_date, self.case_no)?;
        let channel = self.camera_name.parse()?;
        Ok((case, channel))
    }
}

/// Status values written for one (case, channel) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpsert {
    pub case: CaseId,
    pub channel: Channel,
    pub value: i64,
    pub size_mb: Option<i64>,
}

/// Export inventory for one (case, channel) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub date_case: String,
    pub camera_name: String,
    pub file_count: i64,
    pub total_size_bytes: i64,
    pub largest_path: Option<String>,
    pub scanned_at: DateTime<Utc>,
}
