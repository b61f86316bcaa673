//! Converter executable discovery.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Program name looked up on `PATH` when no install location matches.
pub const DEFAULT_PROGRAM: &str = "CLExport";

/// Known install locations of the NorPix batch exporter.
pub fn default_search_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(r"C:\Program Files\NorPix\BatchProcessor\CLExport.exe"),
        PathBuf::from(r"C:\Program Files (x86)\NorPix\BatchProcessor\CLExport.exe"),
        PathBuf::from(r"C:\NorPix\BatchProcessor\CLExport.exe"),
    ]
}

/// Information about the converter installation.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
    /// Every location checked, in order.
    pub searched: Vec<PathBuf>,
}

/// Locate the converter.
///
/// Checks the explicit path first, then each search path, then `program`
/// on `PATH`.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] listing every location searched.
pub fn locate_converter(
    explicit: Option<&Path>,
    search_paths: &[PathBuf],
    program: &str,
) -> Result<PathBuf> {
    let mut searched = Vec::new();

    for candidate in explicit.into_iter().chain(search_paths.iter().map(PathBuf::as_path)) {
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        searched.push(candidate.to_path_buf());
    }

    match which::which(program) {
        Ok(path) => Ok(path),
        Err(_) => {
            searched.push(PathBuf::from(format!("PATH:{program}")));
            Err(Error::tool_not_found(program, searched))
        }
    }
}

/// Report converter availability without failing.
pub fn check_converter(
    explicit: Option<&Path>,
    search_paths: &[PathBuf],
    program: &str,
) -> ToolInfo {
    match locate_converter(explicit, search_paths, program) {
        Ok(path) => ToolInfo {
            name: program.to_string(),
            available: true,
            path: Some(path),
            searched: Vec::new(),
        },
        Err(Error::ToolNotFound { searched, .. }) => ToolInfo {
            name: program.to_string(),
            available: false,
            path: None,
            searched,
        },
        Err(_) => ToolInfo {
            name: program.to_string(),
            available: false,
            path: None,
            searched: Vec::new(),
        },
    }
}
