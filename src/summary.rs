//! Per-channel distribution of status codes in a status table.

use rusqlite::Connection;
use seqport_common::{Channel, StatusCode};
use seqport_db::models::TableName;
use seqport_db::queries::status;
use serde::Serialize;
use std::fmt;

/// Row counts for one channel, indexed by status code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelCounts {
    pub channel: String,
    pub present: i64,
    pub undersized: i64,
    pub missing: i64,
    pub format_anomaly: i64,
    /// Rows with a NULL or unrecognized value.
    pub other: i64,
}

impl ChannelCounts {
    fn add(&mut self, value: Option<i64>, count: i64) {
        match value.and_then(StatusCode::from_code) {
            Some(StatusCode::Present) => self.present += count,
            Some(StatusCode::Undersized) => self.undersized += count,
            Some(StatusCode::Missing) => self.missing += count,
            Some(StatusCode::FormatAnomaly) => self.format_anomaly += count,
            None => self.other += count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub table: String,
    pub total_rows: i64,
    pub channels: Vec<ChannelCounts>,
}

/// Summarize `table`. Every fixed channel is listed, in channel order,
/// followed by any unknown camera names found in the table.
pub fn summarize(conn: &Connection, table: &TableName) -> seqport_common::Result<StatusSummary> {
    let mut channels: Vec<ChannelCounts> = Channel::ALL
        .iter()
        .map(|c| ChannelCounts {
            channel: c.as_str().to_string(),
            ..Default::default()
        })
        .collect();

    let mut total_rows = 0;
    for (camera, value, count) in status::value_counts(conn, table)? {
        total_rows += count;
        let idx = match channels.iter().position(|c| c.channel == camera) {
            Some(idx) => idx,
            None => {
                channels.push(ChannelCounts {
                    channel: camera,
                    ..Default::default()
                });
                channels.len() - 1
            }
        };
        channels[idx].add(value, count);
    }

    Ok(StatusSummary {
        table: table.to_string(),
        total_rows,
        channels,
    })
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total rows in {}: {}", self.table, self.total_rows)?;
        writeln!(f)?;
        let header = format!(
            "{:20} | {:>11} | {:>11} | {:>11} | {:>11}",
            "Camera", "1 (Present)", "2 (Small)", "3 (Missing)", "4 (Format)"
        );
        writeln!(f, "{}", header)?;
        write!(f, "{}", "-".repeat(header.len()))?;
        for c in &self.channels {
            write!(
                f,
                "\n{:20} | {:>11} | {:>11} | {:>11} | {:>11}",
                c.channel, c.present, c.undersized, c.missing, c.format_anomaly
            )?;
        }
        Ok(())
    }
}
