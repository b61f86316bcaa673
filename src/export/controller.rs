//! Retry and fallback state machine.
//!
//! Each source file moves from pending to exactly one of `SUCCESS_PRIMARY`,
//! `SUCCESS_FALLBACK`, `FAILED`, or `SKIPPED`. Per-file failures never stop
//! the run.

use seqport_common::paths::{ensure_output_dir, output_dir_for};
use seqport_common::ContainerFormat;
use seqport_convert::artifact;
use seqport_convert::{AttemptOutcome, AttemptReport, ConvertJob, Converter};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::journal::{append_manifest, RunLog};
use super::stats::{ExportRun, FileOutcome, FileReport, RunStats};
use super::resolve_label;
use crate::config::{ExportConfig, FormatPolicy};
use crate::discovery::SourceCandidate;

/// Settings for one export run.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub out_root: PathBuf,
    pub skip_existing: bool,
    pub clean_invalid: bool,
    pub primary: FormatPolicy,
    pub fallback: FormatPolicy,
    pub fallback_enabled: bool,
    pub min_valid_bytes: u64,
    pub workers: usize,
    pub channel_labels: HashMap<String, String>,
}

impl ExportSettings {
    pub fn from_config(config: &ExportConfig, out_root: impl Into<PathBuf>) -> Self {
        Self {
            out_root: out_root.into(),
            skip_existing: config.skip_existing,
            clean_invalid: config.clean_invalid,
            primary: config.primary.policy(),
            fallback: config.fallback.policy(),
            fallback_enabled: config.fallback_enabled,
            min_valid_bytes: config.min_valid_bytes(),
            workers: config.workers.max(1),
            channel_labels: config.channel_labels.clone(),
        }
    }

    /// Formats an existing export may use, in preference order.
    fn known_formats(&self) -> Vec<ContainerFormat> {
        let mut formats = vec![self.primary.format];
        if self.fallback.format != self.primary.format {
            formats.push(self.fallback.format);
        }
        formats
    }
}

/// Why a format's attempts stopped without success.
enum PolicyFailure {
    /// Retrying or falling back cannot help.
    Fatal(String),
    Exhausted(String),
}

/// Drives every source file of a run through the converter.
pub struct ExportController {
    converter: Arc<dyn Converter>,
    settings: ExportSettings,
    log: RunLog,
}

impl ExportController {
    /// Create a controller and open the run log under the output root.
    pub fn new(converter: Arc<dyn Converter>, settings: ExportSettings) -> std::io::Result<Self> {
        let log = RunLog::open(&settings.out_root)?;
        Ok(Self {
            converter,
            settings,
            log,
        })
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn run_log_path(&self) -> &Path {
        self.log.path()
    }

    /// Process every candidate and return the per-file reports.
    ///
    /// Files are grouped by destination directory; with more than one
    /// worker, groups run concurrently and each group stays sequential.
    pub async fn run(self: &Arc<Self>, candidates: Vec<SourceCandidate>) -> ExportRun {
        let mut reports = Vec::new();
        let mut groups: Vec<Vec<PathBuf>> = Vec::new();
        let mut group_index: HashMap<PathBuf, usize> = HashMap::new();

        for candidate in candidates {
            match candidate {
                SourceCandidate::File(path) => {
                    let dir = output_dir_for(&path, &self.settings.out_root);
                    let idx = *group_index.entry(dir).or_insert_with(|| {
                        groups.push(Vec::new());
                        groups.len() - 1
                    });
                    groups[idx].push(path);
                }
                SourceCandidate::Ambiguous { dir, files } => {
                    let report = self.ambiguous(&dir, &files);
                    self.record(&report);
                    reports.push(report);
                }
                SourceCandidate::Empty { dir } => {
                    warn!("No source file found in {}", dir.display());
                }
            }
        }

        if self.settings.workers <= 1 {
            for files in groups {
                reports.extend(self.process_group(files).await);
            }
        } else {
            let permits = Arc::new(Semaphore::new(self.settings.workers));
            let mut tasks = JoinSet::new();
            for files in groups {
                let permit = match Arc::clone(&permits).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Worker pool closed: {}", e);
                        break;
                    }
                };
                let this = Arc::clone(self);
                tasks.spawn(async move {
                    let _permit = permit;
                    this.process_group(files).await
                });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(group_reports) => reports.extend(group_reports),
                    Err(e) => error!("Export worker failed: {}", e),
                }
            }
        }

        let stats = RunStats::from_reports(&reports);
        if let Err(e) = self.log.summary(&stats) {
            error!("Failed to write run summary: {}", e);
        }
        ExportRun { stats, reports }
    }

    async fn process_group(&self, files: Vec<PathBuf>) -> Vec<FileReport> {
        let mut reports = Vec::with_capacity(files.len());
        for source in files {
            let report = self.process_file(&source).await;
            self.record(&report);
            reports.push(report);
        }
        reports
    }

    /// Append a terminal state to the manifest and the run log.
    fn record(&self, report: &FileReport) {
        match report.outcome {
            FileOutcome::Failed => warn!(
                "{} -> {}: {}",
                report.source.display(),
                report.outcome,
                report.reason
            ),
            _ => info!(
                "{} -> {}: {}",
                report.source.display(),
                report.outcome,
                report.reason
            ),
        }
        if let Err(e) = append_manifest(report) {
            error!(
                "Failed to write manifest in {}: {}",
                report.out_dir.display(),
                e
            );
        }
        if let Err(e) = self.log.record(report) {
            error!("Failed to write run log: {}", e);
        }
    }

    fn ambiguous(&self, dir: &Path, files: &[PathBuf]) -> FileReport {
        let probe = files.first().cloned().unwrap_or_else(|| dir.join("_"));
        let out_dir = ensure_output_dir(&probe, &self.settings.out_root)
            .unwrap_or_else(|_| output_dir_for(&probe, &self.settings.out_root));
        FileReport {
            source: dir.to_path_buf(),
            label: resolve_label(&probe, &self.settings.channel_labels),
            out_dir,
            output: None,
            outcome: FileOutcome::Failed,
            reason: format!("Ambiguous source: {} candidate files", files.len()),
            attempts: 0,
            cleaned: 0,
        }
    }

    /// Drive one source file to a terminal state. Does not write logs.
    pub async fn process_file(&self, source: &Path) -> FileReport {
        let label = resolve_label(source, &self.settings.channel_labels);
        let mut report = FileReport {
            source: source.to_path_buf(),
            label,
            out_dir: output_dir_for(source, &self.settings.out_root),
            output: None,
            outcome: FileOutcome::Failed,
            reason: String::new(),
            attempts: 0,
            cleaned: 0,
        };

        if let Err(e) = std::fs::create_dir_all(&report.out_dir) {
            report.reason = format!("Cannot create {}: {}", report.out_dir.display(), e);
            return report;
        }

        let formats = self.settings.known_formats();
        let min_bytes = self.settings.min_valid_bytes;

        if self.settings.clean_invalid {
            let dir = report.out_dir.clone();
            let label = report.label.clone();
            let clean_formats = formats.clone();
            report.cleaned = tokio::task::spawn_blocking(move || {
                artifact::clean_invalid(&dir, &label, &clean_formats, min_bytes)
            })
            .await
            .unwrap_or_else(|e| {
                error!("Cleanup task failed: {}", e);
                0
            });
        }

        if self.settings.skip_existing {
            if let Some(existing) =
                artifact::find_existing(&report.out_dir, &report.label, &formats, min_bytes)
            {
                let name = existing
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                report.reason = format!("Valid export already exists: {}", name);
                report.output = Some(existing);
                report.outcome = FileOutcome::Skipped;
                return report;
            }
        }

        match std::fs::metadata(source) {
            Err(_) => {
                report.reason = "File does not exist".to_string();
                return report;
            }
            Ok(meta) if !meta.is_file() => {
                report.reason = "Not a regular file".to_string();
                return report;
            }
            Ok(meta) if meta.len() == 0 => {
                report.reason = "File is empty".to_string();
                return report;
            }
            Ok(_) => {}
        }

        let primary = self.settings.primary;
        let failure = match self.attempt_policy(&mut report, primary).await {
            Ok(output) => {
                report.output = Some(output);
                report.outcome = FileOutcome::SuccessPrimary;
                return report;
            }
            Err(failure) => failure,
        };

        let last_reason = match failure {
            PolicyFailure::Fatal(reason) => {
                report.reason = reason;
                return report;
            }
            PolicyFailure::Exhausted(reason) => reason,
        };

        if !self.settings.fallback_enabled {
            report.reason = format!("{} after {} attempts", last_reason, report.attempts);
            return report;
        }

        info!(
            "{}: {} exhausted, falling back to {}",
            source.display(),
            primary.format,
            self.settings.fallback.format
        );
        match self.attempt_policy(&mut report, self.settings.fallback).await {
            Ok(output) => {
                report.output = Some(output);
                report.outcome = FileOutcome::SuccessFallback;
            }
            Err(PolicyFailure::Fatal(reason)) => report.reason = reason,
            Err(PolicyFailure::Exhausted(reason)) => {
                report.reason = format!("{} after {} attempts", reason, report.attempts);
            }
        }
        report
    }

    /// Run up to `policy.retries` attempts in one format.
    ///
    /// The output name is chosen once; every retry writes to it and a failed
    /// attempt's output is deleted whatever its size. Sets `report.reason`
    /// from the latest attempt and returns the artifact path on success.
    async fn attempt_policy(
        &self,
        report: &mut FileReport,
        policy: FormatPolicy,
    ) -> Result<PathBuf, PolicyFailure> {
        let mut last_reason = format!("No attempts configured ({})", policy.format);

        let target = artifact::next_available_name(&report.out_dir, &report.label, policy.format)
            .map_err(|e| PolicyFailure::Fatal(e.to_string()))?;
        let base_name = target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| report.label.clone());

        for attempt in 1..=policy.retries {
            let job = ConvertJob {
                source: &report.source,
                out_dir: &report.out_dir,
                base_name: &base_name,
                format: policy.format,
                limits: policy.limits,
            };

            debug!(
                "{} attempt {}/{} -> {}",
                policy.format,
                attempt,
                policy.retries,
                target.display()
            );
            report.attempts += 1;
            let attempt_report = self.validate(self.converter.convert(&job).await, &target);
            last_reason = attempt_report.reason();
            report.reason = last_reason.clone();

            if attempt_report.is_success() {
                return Ok(target);
            }

            warn!(
                "{} attempt {}/{} failed for {}: {}",
                policy.format,
                attempt,
                policy.retries,
                report.source.display(),
                last_reason
            );

            if matches!(attempt_report.outcome, AttemptOutcome::ToolNotFound { .. }) {
                return Err(PolicyFailure::Fatal(last_reason));
            }

            discard_partial(&target).await;
        }

        Err(PolicyFailure::Exhausted(last_reason))
    }

    /// Downgrade a reported success whose artifact is missing or too small.
    fn validate(&self, mut report: AttemptReport, target: &Path) -> AttemptReport {
        if report.is_success() && !report.simulated {
            let size = artifact::file_size(target);
            if size.map(|s| s < self.settings.min_valid_bytes).unwrap_or(true) {
                report.outcome = AttemptOutcome::InvalidArtifact {
                    path: target.to_path_buf(),
                    size,
                    min_bytes: self.settings.min_valid_bytes,
                };
            }
        }
        report
    }
}

/// Delete the output of a failed attempt on the blocking pool.
async fn discard_partial(target: &Path) {
    if !target.exists() {
        return;
    }
    let path = target.to_path_buf();
    match tokio::task::spawn_blocking(move || artifact::remove_with_retry(&path)).await {
        Ok(Ok(())) => debug!("Removed partial output {}", target.display()),
        Ok(Err(e)) => warn!("Could not remove partial output: {}", e),
        Err(e) => error!("Removal task failed for {}: {}", target.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use seqport_convert::{AttemptLimits, AttemptReport, SimulatedConverter};
    use std::collections::VecDeque;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const MB: u64 = 1024 * 1024;

    /// Plays back scripted behaviors, one per attempt.
    #[derive(Clone, Copy, Debug)]
    enum Step {
        /// Exit 0 after writing this many bytes.
        Write(u64),
        Timeout,
        /// Leave this many bytes behind, then time out.
        WriteThenTimeout(u64),
        Exit(i32),
        NotFound,
    }

    struct ScriptedConverter {
        steps: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<(String, ContainerFormat)>>,
    }

    impl ScriptedConverter {
        fn new(steps: &[Step]) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.iter().copied().collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, ContainerFormat)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl Converter for ScriptedConverter {
        async fn convert(&self, job: &ConvertJob<'_>) -> AttemptReport {
            self.calls
                .lock()
                .push((job.base_name.to_string(), job.format));
            let step = self.steps.lock().pop_front().unwrap_or(Step::Exit(1));
            let outcome = match step {
                Step::Write(len) => {
                    File::create(job.output_path()).unwrap().set_len(len).unwrap();
                    AttemptOutcome::Success
                }
                Step::Timeout => AttemptOutcome::ProcessTimeout {
                    after: job.limits.timeout,
                },
                Step::WriteThenTimeout(len) => {
                    File::create(job.output_path()).unwrap().set_len(len).unwrap();
                    AttemptOutcome::ProcessTimeout {
                        after: job.limits.timeout,
                    }
                }
                Step::Exit(code) => AttemptOutcome::Exited { code: Some(code) },
                Step::NotFound => AttemptOutcome::ToolNotFound {
                    searched: vec![PathBuf::from("/opt/CLExport")],
                },
            };
            AttemptReport {
                format: job.format,
                outcome,
                elapsed: Duration::ZERO,
                simulated: false,
            }
        }
    }

    fn settings(out_root: &Path) -> ExportSettings {
        let policy = |format, retries, secs| FormatPolicy {
            format,
            retries,
            limits: AttemptLimits {
                timeout: Duration::from_secs(secs),
                kill_after_error_lines: 6,
            },
        };
        ExportSettings {
            out_root: out_root.to_path_buf(),
            skip_existing: true,
            clean_invalid: true,
            primary: policy(ContainerFormat::Mp4, 2, 20),
            fallback: policy(ContainerFormat::Avi, 1, 40),
            fallback_enabled: true,
            min_valid_bytes: MB,
            workers: 1,
            channel_labels: HashMap::new(),
        }
    }

    struct Fixture {
        tmp: TempDir,
        source: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempdir().unwrap();
            let dir = tmp.path().join("src/DATA_23-02-05/Case1/Monitor");
            std::fs::create_dir_all(&dir).unwrap();
            let source = dir.join("rec.seq");
            File::create(&source).unwrap().set_len(5 * MB).unwrap();
            Self { tmp, source }
        }

        fn out_root(&self) -> PathBuf {
            self.tmp.path().join("out")
        }

        fn out_dir(&self) -> PathBuf {
            self.out_root().join("DATA_23-02-05/Case1/Monitor")
        }

        fn controller(&self, converter: Arc<dyn Converter>) -> ExportController {
            ExportController::new(converter, settings(&self.out_root())).unwrap()
        }
    }

    #[tokio::test]
    async fn test_primary_success() {
        let fx = Fixture::new();
        let converter = ScriptedConverter::new(&[Step::Write(2 * MB)]);
        let controller = fx.controller(converter.clone());

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::SuccessPrimary);
        assert_eq!(report.output, Some(fx.out_dir().join("Monitor.mp4")));
        assert_eq!(report.reason, "Exported successfully (mp4)");
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_then_primary_success() {
        let fx = Fixture::new();
        let converter = ScriptedConverter::new(&[Step::Timeout, Step::Write(2 * MB)]);
        let controller = fx.controller(converter.clone());

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::SuccessPrimary);
        assert_eq!(report.attempts, 2);
    }

    #[tokio::test]
    async fn test_killed_attempt_output_replaced_by_retry() {
        let fx = Fixture::new();
        let converter =
            ScriptedConverter::new(&[Step::WriteThenTimeout(2 * MB), Step::Write(2 * MB)]);
        let controller = fx.controller(converter.clone());

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::SuccessPrimary);
        assert_eq!(report.output, Some(fx.out_dir().join("Monitor.mp4")));
        assert_eq!(
            converter.calls(),
            [
                ("Monitor".to_string(), ContainerFormat::Mp4),
                ("Monitor".to_string(), ContainerFormat::Mp4),
            ]
        );
        assert!(!fx.out_dir().join("Monitor_1.mp4").exists());

        let rerun = fx.controller(ScriptedConverter::new(&[]));
        let report = rerun.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::Skipped);
        assert_eq!(report.output, Some(fx.out_dir().join("Monitor.mp4")));
    }

    #[tokio::test]
    async fn test_killed_attempts_leave_no_output() {
        let fx = Fixture::new();
        let converter = ScriptedConverter::new(&[
            Step::WriteThenTimeout(2 * MB),
            Step::WriteThenTimeout(2 * MB),
            Step::WriteThenTimeout(2 * MB),
        ]);
        let controller = fx.controller(converter.clone());

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::Failed);
        assert!(!fx.out_dir().join("Monitor.mp4").exists());
        assert!(!fx.out_dir().join("Monitor.avi").exists());
    }

    #[tokio::test]
    async fn test_fallback_after_primary_exhausted() {
        let fx = Fixture::new();
        let converter = ScriptedConverter::new(&[
            Step::Exit(1),
            Step::Timeout,
            Step::Write(2 * MB),
        ]);
        let controller = fx.controller(converter.clone());

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::SuccessFallback);
        assert_eq!(report.output, Some(fx.out_dir().join("Monitor.avi")));
        assert_eq!(
            converter.calls(),
            [
                ("Monitor".to_string(), ContainerFormat::Mp4),
                ("Monitor".to_string(), ContainerFormat::Mp4),
                ("Monitor".to_string(), ContainerFormat::Avi),
            ]
        );
    }

    #[tokio::test]
    async fn test_all_attempts_fail() {
        let fx = Fixture::new();
        let converter = ScriptedConverter::new(&[Step::Exit(1), Step::Exit(1), Step::Exit(2)]);
        let controller = fx.controller(converter.clone());

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::Failed);
        assert_eq!(report.attempts, 3);
        assert!(report.reason.contains("exit code 2 (avi)"), "{}", report.reason);
        assert!(report.output.is_none());
    }

    #[tokio::test]
    async fn test_undersized_output_is_deleted_and_retried() {
        let fx = Fixture::new();
        let converter = ScriptedConverter::new(&[Step::Write(MB - 1), Step::Write(MB)]);
        let controller = fx.controller(converter.clone());

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::SuccessPrimary);
        assert_eq!(report.output, Some(fx.out_dir().join("Monitor.mp4")));
        assert_eq!(
            converter.calls(),
            [
                ("Monitor".to_string(), ContainerFormat::Mp4),
                ("Monitor".to_string(), ContainerFormat::Mp4),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_not_found_skips_fallback() {
        let fx = Fixture::new();
        let converter = ScriptedConverter::new(&[Step::NotFound]);
        let controller = fx.controller(converter.clone());

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::Failed);
        assert_eq!(report.attempts, 1);
        assert!(report.reason.contains("not found"), "{}", report.reason);
    }

    #[tokio::test]
    async fn test_precheck_failures_do_not_invoke_converter() {
        let fx = Fixture::new();
        let converter = ScriptedConverter::new(&[]);
        let controller = fx.controller(converter.clone());

        let missing = fx.source.with_file_name("missing.seq");
        let report = controller.process_file(&missing).await;
        assert_eq!(report.outcome, FileOutcome::Failed);
        assert_eq!(report.reason, "File does not exist");

        File::create(&fx.source).unwrap();
        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::Failed);
        assert_eq!(report.reason, "File is empty");

        assert!(converter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_existing_export_skipped() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.out_dir()).unwrap();
        File::create(fx.out_dir().join("Monitor_1.avi"))
            .unwrap()
            .set_len(2 * MB)
            .unwrap();
        let converter = ScriptedConverter::new(&[]);
        let controller = fx.controller(converter.clone());

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::Skipped);
        assert_eq!(report.reason, "Valid export already exists: Monitor_1.avi");
        assert!(converter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_existing_name_not_overwritten_without_skip() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.out_dir()).unwrap();
        File::create(fx.out_dir().join("Monitor.mp4"))
            .unwrap()
            .set_len(2 * MB)
            .unwrap();
        let converter = ScriptedConverter::new(&[Step::Write(2 * MB)]);
        let mut settings = settings(&fx.out_root());
        settings.skip_existing = false;
        let controller = ExportController::new(converter.clone(), settings).unwrap();

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::SuccessPrimary);
        assert_eq!(report.output, Some(fx.out_dir().join("Monitor_1.mp4")));
    }

    #[tokio::test]
    async fn test_simulated_success_without_artifact() {
        let fx = Fixture::new();
        let controller = fx.controller(Arc::new(SimulatedConverter));

        let report = controller.process_file(&fx.source).await;
        assert_eq!(report.outcome, FileOutcome::SuccessPrimary);
        assert_eq!(report.reason, "Simulated export (mp4)");
        assert!(!fx.out_dir().join("Monitor.mp4").exists());
    }

    #[tokio::test]
    async fn test_run_records_ambiguous_and_ignores_empty() {
        let fx = Fixture::new();
        let converter = ScriptedConverter::new(&[Step::Write(2 * MB)]);
        let controller = Arc::new(fx.controller(converter.clone()));

        let ambiguous_dir = fx.tmp.path().join("src/DATA_23-02-05/Case1/General_3");
        let candidates = vec![
            SourceCandidate::File(fx.source.clone()),
            SourceCandidate::Ambiguous {
                dir: ambiguous_dir.clone(),
                files: vec![ambiguous_dir.join("a.seq"), ambiguous_dir.join("b.seq")],
            },
            SourceCandidate::Empty {
                dir: fx.tmp.path().join("src/DATA_23-02-05/Case1/Cart_LT_4"),
            },
        ];

        let stats = controller.run(candidates).await.stats;
        assert_eq!(stats.attempted, 2);
        assert_eq!(stats.succeeded_primary, 1);
        assert_eq!(stats.failed, 1);

        let manifest = std::fs::read_to_string(
            fx.out_root()
                .join("DATA_23-02-05/Case1/General_3")
                .join(crate::export::journal::MANIFEST_NAME),
        )
        .unwrap();
        assert!(manifest.contains("General_3 = "));
        assert!(manifest.contains("FAILED | Ambiguous source: 2 candidate files"));
    }

    #[tokio::test]
    async fn test_parallel_workers_process_every_group() {
        let fx = Fixture::new();
        let mut sources = vec![fx.source.clone()];
        for channel in ["General_3", "Cart_LT_4", "Injection_Port"] {
            let dir = fx.tmp.path().join("src/DATA_23-02-05/Case1").join(channel);
            std::fs::create_dir_all(&dir).unwrap();
            let source = dir.join("rec.seq");
            File::create(&source).unwrap().set_len(MB).unwrap();
            sources.push(source);
        }
        let converter = ScriptedConverter::new(&[Step::Write(2 * MB); 4]);
        let mut settings = settings(&fx.out_root());
        settings.workers = 3;
        let controller = Arc::new(ExportController::new(converter.clone(), settings).unwrap());

        let run = controller
            .run(sources.into_iter().map(SourceCandidate::File).collect())
            .await;
        let stats = run.stats;
        assert_eq!(run.reports.len(), 4);
        assert_eq!(stats.attempted, 4);
        assert_eq!(stats.succeeded_primary, 4);
        assert_eq!(converter.calls().len(), 4);
    }
}
