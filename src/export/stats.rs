use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Terminal state of one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileOutcome {
    SuccessPrimary,
    SuccessFallback,
    Failed,
    Skipped,
}

impl FileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileOutcome::SuccessPrimary => "SUCCESS_PRIMARY",
            FileOutcome::SuccessFallback => "SUCCESS_FALLBACK",
            FileOutcome::Failed => "FAILED",
            FileOutcome::Skipped => "SKIPPED",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::SuccessPrimary | FileOutcome::SuccessFallback)
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of driving one source file to a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    /// Output base name.
    pub label: String,
    pub out_dir: PathBuf,
    /// Final artifact, or the existing one for skips.
    pub output: Option<PathBuf>,
    pub outcome: FileOutcome,
    pub reason: String,
    /// Converter invocations made for this file.
    pub attempts: u32,
    /// Invalid leftovers deleted before processing.
    pub cleaned: usize,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub attempted: usize,
    pub skipped_existing: usize,
    pub succeeded_primary: usize,
    pub succeeded_fallback: usize,
    pub failed: usize,
    pub cleaned: usize,
}

impl RunStats {
    pub fn record(&mut self, report: &FileReport) {
        self.attempted += 1;
        self.cleaned += report.cleaned;
        match report.outcome {
            FileOutcome::SuccessPrimary => self.succeeded_primary += 1,
            FileOutcome::SuccessFallback => self.succeeded_fallback += 1,
            FileOutcome::Failed => self.failed += 1,
            FileOutcome::Skipped => self.skipped_existing += 1,
        }
    }

    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut stats = Self::default();
        for report in reports {
            stats.record(report);
        }
        stats
    }
}

/// Everything one export run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportRun {
    pub stats: RunStats,
    pub reports: Vec<FileReport>,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total files:        {}", self.attempted)?;
        writeln!(f, "Skipped (existing): {}", self.skipped_existing)?;
        writeln!(f, "Primary succeeded:  {}", self.succeeded_primary)?;
        writeln!(f, "Fallback succeeded: {}", self.succeeded_fallback)?;
        writeln!(f, "Failed:             {}", self.failed)?;
        write!(f, "Cleaned invalid:    {}", self.cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: FileOutcome, cleaned: usize) -> FileReport {
        FileReport {
            source: PathBuf::from("a.seq"),
            label: "Monitor".into(),
            out_dir: PathBuf::from("out"),
            output: None,
            outcome,
            reason: String::new(),
            attempts: 0,
            cleaned,
        }
    }

    #[test]
    fn test_from_reports() {
        let stats = RunStats::from_reports(&[
            report(FileOutcome::SuccessPrimary, 1),
            report(FileOutcome::Failed, 0),
            report(FileOutcome::Skipped, 2),
            report(FileOutcome::SuccessFallback, 0),
        ]);
        assert_eq!(
            stats,
            RunStats {
                attempted: 4,
                skipped_existing: 1,
                succeeded_primary: 1,
                succeeded_fallback: 1,
                failed: 1,
                cleaned: 3,
            }
        );
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(FileOutcome::SuccessPrimary.to_string(), "SUCCESS_PRIMARY");
        assert_eq!(FileOutcome::Skipped.to_string(), "SKIPPED");
        assert!(FileOutcome::SuccessFallback.is_success());
        assert!(!FileOutcome::Skipped.is_success());
    }
}
