//! Append-only audit trail of an export run.
//!
//! Two plain-text files are written, one line per terminal file state and
//! flushed immediately:
//!
//! - `export_log.txt` at the output root, shared by the whole run;
//! - `_seq_mapping.txt` in every destination directory.

use chrono::Local;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::stats::{FileReport, RunStats};

pub const RUN_LOG_NAME: &str = "export_log.txt";
pub const MANIFEST_NAME: &str = "_seq_mapping.txt";

const SESSION_RULE_WIDTH: usize = 60;

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Run-scoped log at the output root.
///
/// Writers are serialized, so workers may share one instance.
pub struct RunLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RunLog {
    /// Open the log under `out_root` and write the session header.
    pub fn open(out_root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(out_root)?;
        let path = out_root.join(RUN_LOG_NAME);
        let log = Self {
            file: Mutex::new(open_append(&path)?),
            path,
        };
        log.write_line(&format!(
            "\n{}\nExport session started: {}",
            "=".repeat(SESSION_RULE_WIDTH),
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ))?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the terminal state of one file.
    pub fn record(&self, report: &FileReport) -> io::Result<()> {
        let output = report
            .output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "None".to_string());
        self.write_line(&format!(
            "{} -> {}: {} | {}",
            report.source.display(),
            output,
            report.outcome,
            report.reason
        ))
    }

    /// Append the end-of-run counters.
    pub fn summary(&self, stats: &RunStats) -> io::Result<()> {
        self.write_line(&format!(
            "Session finished: {} | total={} skipped={} primary={} fallback={} failed={} cleaned={}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            stats.attempted,
            stats.skipped_existing,
            stats.succeeded_primary,
            stats.succeeded_fallback,
            stats.failed,
            stats.cleaned
        ))
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut file = self.file.lock();
        writeln!(file, "{}", line)?;
        file.flush()
    }
}

/// Append one mapping line to the manifest in `report.out_dir`.
pub fn append_manifest(report: &FileReport) -> io::Result<()> {
    let mut file = open_append(&report.out_dir.join(MANIFEST_NAME))?;
    writeln!(
        file,
        "{} = {} | {} | {}",
        report.label,
        report.source.display(),
        report.outcome,
        report.reason
    )?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::stats::FileOutcome;
    use tempfile::tempdir;

    fn report(out_dir: &Path, outcome: FileOutcome, output: Option<PathBuf>) -> FileReport {
        FileReport {
            source: PathBuf::from("/src/DATA_23-02-05/Case1/Monitor/rec.seq"),
            label: "Monitor".into(),
            out_dir: out_dir.to_path_buf(),
            output,
            outcome,
            reason: "Exported successfully (mp4)".into(),
            attempts: 1,
            cleaned: 0,
        }
    }

    #[test]
    fn test_run_log_lines() {
        let tmp = tempdir().unwrap();
        let log = RunLog::open(tmp.path()).unwrap();
        log.record(&report(
            tmp.path(),
            FileOutcome::SuccessPrimary,
            Some(tmp.path().join("Monitor.mp4")),
        ))
        .unwrap();
        log.record(&report(tmp.path(), FileOutcome::Failed, None)).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert!(text.contains(&"=".repeat(60)));
        assert!(text.contains("Export session started: "));
        assert!(text.contains(&format!(
            "/src/DATA_23-02-05/Case1/Monitor/rec.seq -> {}: SUCCESS_PRIMARY | Exported successfully (mp4)",
            tmp.path().join("Monitor.mp4").display()
        )));
        assert!(text.contains("rec.seq -> None: FAILED |"));
    }

    #[test]
    fn test_sessions_append() {
        let tmp = tempdir().unwrap();
        drop(RunLog::open(tmp.path()).unwrap());
        drop(RunLog::open(tmp.path()).unwrap());

        let text = std::fs::read_to_string(tmp.path().join(RUN_LOG_NAME)).unwrap();
        assert_eq!(text.matches("Export session started").count(), 2);
    }

    #[test]
    fn test_manifest_appends() {
        let tmp = tempdir().unwrap();
        append_manifest(&report(tmp.path(), FileOutcome::SuccessPrimary, None)).unwrap();
        append_manifest(&report(tmp.path(), FileOutcome::Skipped, None)).unwrap();

        let text = std::fs::read_to_string(tmp.path().join(MANIFEST_NAME)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Monitor = /src/DATA_23-02-05/Case1/Monitor/rec.seq | SUCCESS_PRIMARY | Exported successfully (mp4)"
        );
        assert!(lines[1].contains("| SKIPPED |"));
    }
}
