//! Recording case identifiers.
//!
//! A case is identified by its recording date and a positive case number
//! within that date. The same identity has three spellings:
//!
//! - the compound key `YYYY-MM-DD_N` used by the status store,
//! - the directory pair `DATA_YY-MM-DD` / `CaseN` used on disk,
//! - the decomposed store columns `(recording_date, case_no)`.
//!
//! Two-digit years always expand into the 2000s, so only cases dated
//! 2000 through 2099 are representable. This keeps the directory mapping
//! bijective.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{Error, Result};

/// Directory prefix identifying a case's date anchor.
pub const DATA_DIR_PREFIX: &str = "DATA_";

/// Directory prefix identifying a case within a date.
pub const CASE_DIR_PREFIX: &str = "Case";

const FIRST_YEAR: i32 = 2000;
const LAST_YEAR: i32 = 2099;

/// Identifier of one recording case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CaseId {
    date: NaiveDate,
    number: u32,
}

impl CaseId {
    /// Create a case identifier, checking the century window and case number.
    pub fn new(date: NaiveDate, number: u32) -> Result<Self> {
        if !(FIRST_YEAR..=LAST_YEAR).contains(&date.year()) {
            return Err(Error::malformed(format!(
                "recording year {} outside {}-{}",
                date.year(),
                FIRST_YEAR,
                LAST_YEAR
            )));
        }
        if number == 0 {
            return Err(Error::malformed("case number must be positive"));
        }
        Ok(Self { date, number })
    }

    /// Parse a compound `YYYY-MM-DD_N` identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use seqport_common::CaseId;
    ///
    /// let id = CaseId::parse("2023-02-05_1").unwrap();
    /// assert_eq!(id.data_dir_name(), "DATA_23-02-05");
    /// assert_eq!(id.case_dir_name(), "Case1");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (date_part, case_part) = s
            .rsplit_once('_')
            .ok_or_else(|| Error::malformed(format!("missing case separator: {s}")))?;

        let date = parse_iso_date(date_part)
            .ok_or_else(|| Error::malformed(format!("invalid recording date: {s}")))?;
        let number = parse_case_number(case_part)
            .ok_or_else(|| Error::malformed(format!("invalid case number: {s}")))?;

        Self::new(date, number)
    }

    /// Build an identifier from decomposed store columns.
    pub fn from_parts(recording_date: &str, case_no: i64) -> Result<Self> {
        let date = parse_iso_date(recording_date.trim())
            .ok_or_else(|| Error::malformed(format!("invalid recording date: {recording_date}")))?;
        let number = u32::try_from(case_no)
            .map_err(|_| Error::malformed(format!("invalid case number: {case_no}")))?;
        Self::new(date, number)
    }

    /// Build an identifier from a `DATA_YY-MM-DD` / `CaseN` directory pair.
    ///
    /// Prefixes are matched case-insensitively.
    pub fn from_dir_names(data_dir: &str, case_dir: &str) -> Result<Self> {
        let date = parse_data_dir(data_dir)
            .ok_or_else(|| Error::malformed(format!("not a date directory: {data_dir}")))?;
        let number = parse_case_dir(case_dir)
            .ok_or_else(|| Error::malformed(format!("not a case directory: {case_dir}")))?;
        Self::new(date, number)
    }

    /// Recording date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Case number within the recording date.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// ISO recording date as stored in the `recording_date` column.
    pub fn recording_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Date anchor directory name, e.g. `DATA_23-02-05`.
    pub fn data_dir_name(&self) -> String {
        format!(
            "{}{:02}-{:02}-{:02}",
            DATA_DIR_PREFIX,
            self.date.year() % 100,
            self.date.month(),
            self.date.day()
        )
    }

    /// Case directory name, e.g. `Case1`.
    pub fn case_dir_name(&self) -> String {
        format!("{}{}", CASE_DIR_PREFIX, self.number)
    }

    /// Relative `DATA_YY-MM-DD/CaseN` directory for this case.
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(self.data_dir_name()).join(self.case_dir_name())
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.date.format("%Y-%m-%d"), self.number)
    }
}

impl FromStr for CaseId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<CaseId> for String {
    fn from(id: CaseId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for CaseId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

/// Split `s` into `-`-separated numeric fields of exactly the given widths.
fn numeric_fields(s: &str, widths: [usize; 3]) -> Option<[u32; 3]> {
    let mut parts = s.split('-');
    let mut out = [0u32; 3];
    for (slot, width) in out.iter_mut().zip(widths) {
        let part = parts.next()?;
        if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let [y, m, d] = numeric_fields(s, [4, 2, 2])?;
    NaiveDate::from_ymd_opt(y as i32, m, d)
}

fn parse_case_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().filter(|n| *n > 0)
}

/// Strip an ASCII prefix case-insensitively.
fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

fn parse_data_dir(name: &str) -> Option<NaiveDate> {
    let rest = strip_prefix_ignore_case(name, DATA_DIR_PREFIX)?;
    let [yy, m, d] = numeric_fields(rest, [2, 2, 2])?;
    NaiveDate::from_ymd_opt(FIRST_YEAR + yy as i32, m, d)
}

fn parse_case_dir(name: &str) -> Option<u32> {
    parse_case_number(strip_prefix_ignore_case(name, CASE_DIR_PREFIX)?)
}

/// Whether a directory name carries the date anchor prefix.
pub fn is_data_dir_name(name: &str) -> bool {
    strip_prefix_ignore_case(name, DATA_DIR_PREFIX).is_some()
}
