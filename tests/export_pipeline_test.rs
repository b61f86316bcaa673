//! Export pipeline integration tests
//!
//! Drives discovery, the export controller and the real process engine
//! against temporary trees, with `/bin/sh` scripts standing in for the
//! converter.

#![cfg(unix)]

use seqport::config::ExportConfig;
use seqport::discovery::{self, SourceCandidate};
use seqport::export::journal::{MANIFEST_NAME, RUN_LOG_NAME};
use seqport::export::{ExportController, ExportSettings, FileOutcome};
use seqport_common::{CaseId, Channel};
use seqport_convert::ExternalConverter;
use seqport_db::models::{StatusUpsert, TableName};
use seqport_db::pool::init_memory_pool;
use seqport_db::queries::status;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

const MB: u64 = 1024 * 1024;

/// Writes `$4/$6.$8` (out dir, base name, format) at the given size.
fn writing_converter(dir: &TempDir, size_kb: u64) -> ExternalConverter {
    script_converter(
        dir,
        &format!(
            "dd if=/dev/zero of=\"$4/$6.$8\" bs=1024 count={} 2>/dev/null\nexit 0\n",
            size_kb
        ),
    )
}

fn script_converter(dir: &TempDir, body: &str) -> ExternalConverter {
    let path = dir.path().join("converter.sh");
    fs::write(&path, body).unwrap();
    ExternalConverter::new("/bin/sh")
        .with_leading_args(vec![path.to_string_lossy().into_owned()])
}

struct Tree {
    tmp: TempDir,
}

impl Tree {
    fn new() -> Self {
        Self {
            tmp: tempdir().unwrap(),
        }
    }

    fn src_root(&self) -> PathBuf {
        self.tmp.path().join("Sequence_Backup")
    }

    fn out_root(&self) -> PathBuf {
        self.tmp.path().join("Recordings")
    }

    fn add_sequence(&self, rel: &str, len: u64) -> PathBuf {
        let path = self.src_root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(&path).unwrap().set_len(len).unwrap();
        path
    }

    fn settings(&self) -> ExportSettings {
        let mut config = ExportConfig::default();
        config.primary.timeout_secs = 10;
        config.fallback.timeout_secs = 10;
        ExportSettings::from_config(&config, self.out_root())
    }

    fn controller(&self, converter: ExternalConverter) -> Arc<ExportController> {
        Arc::new(ExportController::new(Arc::new(converter), self.settings()).unwrap())
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_flagged_channel_exported_end_to_end() {
    let tree = Tree::new();
    let source = tree.add_sequence("DATA_23-02-05/Case1/Monitor/rec.seq", 5 * MB);

    let pool = init_memory_pool().unwrap();
    let conn = pool.get().unwrap();
    let table = TableName::new("seq_status").unwrap();
    status::upsert_rows(
        &conn,
        &table,
        &[StatusUpsert {
            case: CaseId::parse("2023-02-05_1").unwrap(),
            channel: Channel::Monitor,
            value: 1,
            size_mb: Some(5),
        }],
    )
    .unwrap();

    let candidates = discovery::discover(&conn, &table, 1, &tree.src_root(), "seq").unwrap();
    assert_eq!(candidates, [SourceCandidate::File(source.clone())]);

    let converter_dir = tempdir().unwrap();
    let controller = tree.controller(writing_converter(&converter_dir, 2048));
    let run = controller.run(candidates).await;

    assert_eq!(run.stats.succeeded_primary, 1);
    assert_eq!(run.stats.failed, 0);

    let out_dir = tree.out_root().join("DATA_23-02-05/Case1/Monitor");
    let artifact = out_dir.join("Monitor.mp4");
    assert_eq!(fs::metadata(&artifact).unwrap().len(), 2 * MB);
    let exports: Vec<_> = fs::read_dir(&out_dir)
        .unwrap()
        .flatten()
        .filter(|e| e.path().extension().map(|x| x == "mp4").unwrap_or(false))
        .collect();
    assert_eq!(exports.len(), 1);

    let manifest = read(&out_dir.join(MANIFEST_NAME));
    assert_eq!(manifest.lines().count(), 1);
    assert!(manifest.starts_with(&format!("Monitor = {} | SUCCESS_PRIMARY |", source.display())));

    let log = read(&tree.out_root().join(RUN_LOG_NAME));
    let entries: Vec<&str> = log.lines().filter(|l| l.contains(" -> ")).collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].contains(&artifact.display().to_string()));
    assert!(entries[0].contains("SUCCESS_PRIMARY"));
}

#[tokio::test]
async fn test_rerun_skips_valid_export() {
    let tree = Tree::new();
    let source = tree.add_sequence("DATA_23-02-05/Case1/General_3/rec.seq", 5 * MB);
    let converter_dir = tempdir().unwrap();

    let first = tree
        .controller(writing_converter(&converter_dir, 2048))
        .run(vec![SourceCandidate::File(source.clone())])
        .await;
    assert_eq!(first.stats.succeeded_primary, 1);

    let second = tree
        .controller(writing_converter(&converter_dir, 2048))
        .run(vec![SourceCandidate::File(source)])
        .await;
    assert_eq!(second.stats.skipped_existing, 1);
    assert_eq!(second.reports[0].outcome, FileOutcome::Skipped);
    assert_eq!(
        second.reports[0].reason,
        "Valid export already exists: General_3.mp4"
    );

    let out_dir = tree.out_root().join("DATA_23-02-05/Case1/General_3");
    assert!(!out_dir.join("General_3_1.mp4").exists());
    let manifest = read(&out_dir.join(MANIFEST_NAME));
    assert_eq!(manifest.lines().count(), 2);
    assert!(manifest.lines().nth(1).unwrap().contains("| SKIPPED |"));
}

#[tokio::test]
async fn test_fallback_format_used_when_primary_fails() {
    let tree = Tree::new();
    let source = tree.add_sequence("DATA_23-02-05/Case2/Cart_LT_4/rec.seq", MB);
    let converter_dir = tempdir().unwrap();
    let converter = script_converter(
        &converter_dir,
        "if [ \"$8\" = avi ]; then\n  dd if=/dev/zero of=\"$4/$6.$8\" bs=1024 count=1024 2>/dev/null\n  exit 0\nfi\necho 'Error writing video'\nexit 2\n",
    );

    let run = tree
        .controller(converter)
        .run(vec![SourceCandidate::File(source)])
        .await;
    let report = &run.reports[0];
    assert_eq!(report.outcome, FileOutcome::SuccessFallback);
    assert_eq!(report.attempts, 3);
    assert_eq!(
        report.output.as_deref(),
        Some(
            tree.out_root()
                .join("DATA_23-02-05/Case2/Cart_LT_4/Cart_LT_4.avi")
                .as_path()
        )
    );
    assert_eq!(run.stats.succeeded_fallback, 1);
}

#[tokio::test]
async fn test_undersized_outputs_fail_and_are_removed() {
    let tree = Tree::new();
    let source = tree.add_sequence("DATA_23-02-05/Case1/Monitor/rec.seq", MB);
    let converter_dir = tempdir().unwrap();

    let run = tree
        .controller(writing_converter(&converter_dir, 4))
        .run(vec![SourceCandidate::File(source)])
        .await;
    let report = &run.reports[0];
    assert_eq!(report.outcome, FileOutcome::Failed);
    assert!(report.reason.contains("Invalid artifact"), "{}", report.reason);
    assert!(report.reason.ends_with("after 3 attempts"), "{}", report.reason);

    let out_dir = tree.out_root().join("DATA_23-02-05/Case1/Monitor");
    assert!(!out_dir.join("Monitor.mp4").exists());
    assert!(!out_dir.join("Monitor.avi").exists());
    assert!(read(&out_dir.join(MANIFEST_NAME)).contains("| FAILED |"));
}

#[tokio::test]
async fn test_precheck_failures_recorded_without_converter() {
    let tree = Tree::new();
    let empty = tree.add_sequence("DATA_23-02-05/Case1/Monitor/rec.seq", 0);
    let missing = tree.src_root().join("DATA_23-02-05/Case1/General_3/rec.seq");
    let converter_dir = tempdir().unwrap();
    let marker = converter_dir.path().join("invoked");
    let converter = script_converter(
        &converter_dir,
        &format!("touch '{}'\nexit 0\n", marker.display()),
    );

    let run = tree
        .controller(converter)
        .run(vec![SourceCandidate::File(empty), SourceCandidate::File(missing)])
        .await;

    let reasons: Vec<&str> = run.reports.iter().map(|r| r.reason.as_str()).collect();
    assert_eq!(reasons, ["File is empty", "File does not exist"]);
    assert_eq!(run.stats.failed, 2);
    assert!(!marker.exists());

    let log = read(&tree.out_root().join(RUN_LOG_NAME));
    assert!(log.contains("-> None: FAILED | File is empty"));
    assert!(log.contains("-> None: FAILED | File does not exist"));
}

#[tokio::test]
async fn test_missing_converter_fails_every_file() {
    let tree = Tree::new();
    let a = tree.add_sequence("DATA_23-02-05/Case1/Monitor/rec.seq", MB);
    let b = tree.add_sequence("DATA_23-02-05/Case1/General_3/rec.seq", MB);
    let lookup = seqport_convert::locate_converter(
        Some(Path::new("/nonexistent/CLExport")),
        &[],
        "seqport-test-no-such-converter",
    );
    let converter = ExternalConverter::from_lookup(lookup);

    let run = tree
        .controller(converter)
        .run(vec![SourceCandidate::File(a), SourceCandidate::File(b)])
        .await;
    assert_eq!(run.stats.failed, 2);
    for report in &run.reports {
        assert_eq!(report.attempts, 1);
        assert!(report.reason.contains("/nonexistent/CLExport"), "{}", report.reason);
    }
}
