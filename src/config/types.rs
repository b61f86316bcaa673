use seqport_common::{ContainerFormat, BYTES_PER_MB};
use seqport_convert::AttemptLimits;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub converter: ConverterConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// SQLite status store
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Root of the sequence backup tree (`DATA_*/Case*/<channel>/*.seq`)
    #[serde(default)]
    pub sequence_root: Option<PathBuf>,

    /// Root of the exported recordings tree
    #[serde(default)]
    pub recordings_root: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            sequence_root: None,
            recordings_root: None,
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("seqport.sqlite")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConverterConfig {
    /// Explicit converter path, checked before the search paths
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "seqport_convert::tools::default_search_paths")]
    pub search_paths: Vec<PathBuf>,

    /// Program name looked up on PATH last
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the fixed flag layout (e.g. a wrapper script)
    #[serde(default)]
    pub leading_args: Vec<String>,

    #[serde(default = "default_error_signature")]
    pub error_signature: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            path: None,
            search_paths: seqport_convert::tools::default_search_paths(),
            program: default_program(),
            leading_args: Vec::new(),
            error_signature: default_error_signature(),
        }
    }
}

fn default_program() -> String {
    seqport_convert::tools::DEFAULT_PROGRAM.to_string()
}

fn default_error_signature() -> String {
    seqport_convert::engine::DEFAULT_ERROR_SIGNATURE.to_string()
}

/// Attempt policy for one container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatPolicy {
    pub format: ContainerFormat,
    pub retries: u32,
    pub limits: AttemptLimits,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrimaryFormatConfig {
    #[serde(default = "default_primary_format")]
    pub format: ContainerFormat,

    #[serde(default = "default_primary_retries")]
    pub retries: u32,

    #[serde(default = "default_primary_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_primary_kill_after")]
    pub kill_after_error_lines: u32,
}

impl Default for PrimaryFormatConfig {
    fn default() -> Self {
        Self {
            format: default_primary_format(),
            retries: default_primary_retries(),
            timeout_secs: default_primary_timeout(),
            kill_after_error_lines: default_primary_kill_after(),
        }
    }
}

impl PrimaryFormatConfig {
    pub fn policy(&self) -> FormatPolicy {
        FormatPolicy {
            format: self.format,
            retries: self.retries,
            limits: AttemptLimits {
                timeout: Duration::from_secs(self.timeout_secs),
                kill_after_error_lines: self.kill_after_error_lines,
            },
        }
    }
}

fn default_primary_format() -> ContainerFormat {
    ContainerFormat::Mp4
}

fn default_primary_retries() -> u32 {
    2
}

fn default_primary_timeout() -> u64 {
    20
}

fn default_primary_kill_after() -> u32 {
    6
}

/// Fallback attempts get double the primary time and error budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackFormatConfig {
    #[serde(default = "default_fallback_format")]
    pub format: ContainerFormat,

    #[serde(default = "default_fallback_retries")]
    pub retries: u32,

    #[serde(default = "default_fallback_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_fallback_kill_after")]
    pub kill_after_error_lines: u32,
}

impl Default for FallbackFormatConfig {
    fn default() -> Self {
        Self {
            format: default_fallback_format(),
            retries: default_fallback_retries(),
            timeout_secs: default_fallback_timeout(),
            kill_after_error_lines: default_fallback_kill_after(),
        }
    }
}

impl FallbackFormatConfig {
    pub fn policy(&self) -> FormatPolicy {
        FormatPolicy {
            format: self.format,
            retries: self.retries,
            limits: AttemptLimits {
                timeout: Duration::from_secs(self.timeout_secs),
                kill_after_error_lines: self.kill_after_error_lines,
            },
        }
    }
}

fn default_fallback_format() -> ContainerFormat {
    ContainerFormat::Avi
}

fn default_fallback_retries() -> u32 {
    1
}

fn default_fallback_timeout() -> u64 {
    default_primary_timeout() * 2
}

fn default_fallback_kill_after() -> u32 {
    default_primary_kill_after() * 2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Status table read by work discovery
    #[serde(default = "default_sequence_table")]
    pub table: String,

    /// Status value selecting channels to export
    #[serde(default = "default_only_value")]
    pub only_value: i64,

    /// Extension of source sequence files
    #[serde(default = "default_sequence_suffix")]
    pub source_suffix: String,

    #[serde(default = "default_true")]
    pub skip_existing: bool,

    #[serde(default = "default_true")]
    pub clean_invalid: bool,

    #[serde(default = "default_true")]
    pub fallback_enabled: bool,

    /// Report synthetic success instead of running the converter
    #[serde(default)]
    pub simulate: bool,

    /// Concurrent destination directories
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_min_valid_size_mb")]
    pub min_valid_size_mb: f64,

    #[serde(default)]
    pub primary: PrimaryFormatConfig,

    #[serde(default)]
    pub fallback: FallbackFormatConfig,

    /// Output base names keyed by source stem, file name, full path, or parent dir name
    #[serde(default)]
    pub channel_labels: HashMap<String, String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            table: default_sequence_table(),
            only_value: default_only_value(),
            source_suffix: default_sequence_suffix(),
            skip_existing: true,
            clean_invalid: true,
            fallback_enabled: true,
            simulate: false,
            workers: default_workers(),
            min_valid_size_mb: default_min_valid_size_mb(),
            primary: PrimaryFormatConfig::default(),
            fallback: FallbackFormatConfig::default(),
            channel_labels: HashMap::new(),
        }
    }
}

impl ExportConfig {
    /// Minimum valid artifact size in bytes.
    pub fn min_valid_bytes(&self) -> u64 {
        (self.min_valid_size_mb * BYTES_PER_MB as f64).round() as u64
    }
}

fn default_true() -> bool {
    true
}

fn default_sequence_table() -> String {
    "seq_status".to_string()
}

fn default_export_table() -> String {
    "mp4_status".to_string()
}

fn default_only_value() -> i64 {
    1
}

fn default_sequence_suffix() -> String {
    "seq".to_string()
}

fn default_export_suffix() -> String {
    "mp4".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_min_valid_size_mb() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Files at or above this size count as present (status 1)
    #[serde(default = "default_threshold_mb")]
    pub threshold_mb: u64,

    #[serde(default = "default_sequence_table")]
    pub sequence_table: String,

    #[serde(default = "default_export_table")]
    pub export_table: String,

    #[serde(default = "default_sequence_suffix")]
    pub sequence_suffix: String,

    #[serde(default = "default_export_suffix")]
    pub export_suffix: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            threshold_mb: default_threshold_mb(),
            sequence_table: default_sequence_table(),
            export_table: default_export_table(),
            sequence_suffix: default_sequence_suffix(),
            export_suffix: default_export_suffix(),
        }
    }
}

fn default_threshold_mb() -> u64 {
    200
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InventoryConfig {
    #[serde(default = "default_inventory_table")]
    pub table: String,

    #[serde(default = "default_export_suffix")]
    pub suffix: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            table: default_inventory_table(),
            suffix: default_export_suffix(),
        }
    }
}

fn default_inventory_table() -> String {
    "mp4_inventory".to_string()
}
