//! Error types for seqport-convert.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside a single converter attempt.
///
/// Attempt-level failures (timeouts, kill threshold, non-zero exit) are
/// reported as [`crate::AttemptOutcome`] values instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The converter is absent at every known location.
    #[error("{tool} not found. Searched: {}", format_searched(searched))]
    ToolNotFound { tool: String, searched: Vec<PathBuf> },

    /// Every numbered output name up to the cap is taken.
    #[error("no free output name for {base} after {cap} candidates")]
    NamesExhausted { base: String, cap: u32 },

    /// A filesystem operation on a specific path failed.
    #[error("filesystem error on {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a tool not found error listing the searched locations.
    pub fn tool_not_found(tool: impl Into<String>, searched: Vec<PathBuf>) -> Self {
        Self::ToolNotFound {
            tool: tool.into(),
            searched,
        }
    }

    /// Create a filesystem error for `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

fn format_searched(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        return "PATH".to_string();
    }
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_not_found_lists_locations() {
        let err = Error::tool_not_found(
            "CLExport",
            vec![PathBuf::from("/opt/a/CLExport"), PathBuf::from("/opt/b/CLExport")],
        );
        assert_eq!(
            err.to_string(),
            "CLExport not found. Searched: /opt/a/CLExport, /opt/b/CLExport"
        );
    }

    #[test]
    fn test_names_exhausted_display() {
        let err = Error::NamesExhausted {
            base: "Monitor".into(),
            cap: 1000,
        };
        assert!(err.to_string().contains("Monitor"));
        assert!(err.to_string().contains("1000"));
    }
}
