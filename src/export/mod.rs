//! Export orchestration.
//!
//! [`ExportController`] drives discovered sequence files through the
//! converter with per-format retries and a fallback format, and writes an
//! audit trail through [`journal`].

mod controller;
pub mod journal;
mod stats;

pub use controller::{ExportController, ExportSettings};
pub use stats::{ExportRun, FileOutcome, FileReport, RunStats};

use seqport_convert::{locate_converter, Converter, ExternalConverter, SimulatedConverter};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::ConverterConfig;

/// Fallback base name when a source path has neither parent nor stem.
const DEFAULT_LABEL: &str = "output";

/// Output base name for `source`.
///
/// `labels` is consulted by file stem, file name, full path, and parent
/// directory name, in that order. Without a hit the parent directory name
/// is used, which for discovered sources is the channel name.
pub fn resolve_label(source: &Path, labels: &HashMap<String, String>) -> String {
    let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned());
    let name = source.file_name().map(|s| s.to_string_lossy().into_owned());
    let full = source.to_string_lossy().into_owned();
    let parent = source
        .parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().into_owned());

    let keys = [stem.as_deref(), name.as_deref(), Some(full.as_str()), parent.as_deref()];
    if let Some(label) = keys.iter().flatten().find_map(|key| labels.get(*key)) {
        return label.clone();
    }

    parent
        .or(stem)
        .unwrap_or_else(|| DEFAULT_LABEL.to_string())
}

/// Build the converter for a run.
///
/// The executable is located once; when it cannot be found every attempt
/// reports the locations searched.
pub fn build_converter(config: &ConverterConfig, simulate: bool) -> Arc<dyn Converter> {
    if simulate {
        return Arc::new(SimulatedConverter);
    }

    let lookup = locate_converter(config.path.as_deref(), &config.search_paths, &config.program);
    match &lookup {
        Ok(path) => tracing::info!("Using converter at {}", path.display()),
        Err(e) => tracing::error!("{}", e),
    }
    Arc::new(
        ExternalConverter::from_lookup(lookup)
            .with_leading_args(config.leading_args.clone())
            .with_error_signature(config.error_signature.clone()),
    )
}
