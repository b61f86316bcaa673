//! Output path resolution.
//!
//! Exports mirror the source tree starting at the case's date anchor
//! directory (`DATA_YY-MM-DD`). Sources outside an anchored tree fall back
//! to a synthesized `date/case/channel` layout built from the nearest three
//! parent directory names.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::ids::is_data_dir_name;

/// Placeholder for a missing date level.
pub const UNKNOWN_DATE_DIR: &str = "DATA_Unknown";
/// Placeholder for a missing case level.
pub const UNKNOWN_CASE_DIR: &str = "CaseUnknown";
/// Placeholder for a missing channel level.
pub const UNKNOWN_CHANNEL_DIR: &str = "ChannelUnknown";

fn parent_segments(source: &Path) -> Vec<&OsStr> {
    source
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(name) => Some(name),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Compute the destination directory for `source` under `out_root`.
///
/// Pure; see [`ensure_output_dir`] for the variant that creates it.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use seqport_common::paths::output_dir_for;
///
/// let dir = output_dir_for(
///     Path::new("/backup/DATA_23-02-05/Case1/Monitor/rec.seq"),
///     Path::new("/exports"),
/// );
/// assert_eq!(dir, PathBuf::from("/exports/DATA_23-02-05/Case1/Monitor"));
/// ```
pub fn output_dir_for(source: &Path, out_root: &Path) -> PathBuf {
    let segments = parent_segments(source);

    let anchor = segments
        .iter()
        .position(|s| s.to_str().map(is_data_dir_name).unwrap_or(false));

    let mut dir = out_root.to_path_buf();
    match anchor {
        Some(idx) => {
            for segment in &segments[idx..] {
                dir.push(segment);
            }
        }
        None => {
            let n = segments.len();
            let level = |back: usize, placeholder: &'static str| -> &OsStr {
                n.checked_sub(back)
                    .map(|i| segments[i])
                    .unwrap_or_else(|| OsStr::new(placeholder))
            };
            dir.push(level(3, UNKNOWN_DATE_DIR));
            dir.push(level(2, UNKNOWN_CASE_DIR));
            dir.push(level(1, UNKNOWN_CHANNEL_DIR));
        }
    }
    dir
}

/// Compute and create the destination directory for `source`.
///
/// Creation is idempotent. Permission failures are returned to the caller.
pub fn ensure_output_dir(source: &Path, out_root: &Path) -> std::io::Result<PathBuf> {
    let dir = output_dir_for(source, out_root);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Whether `path` has the given extension, compared case-insensitively.
///
/// `ext` is given without the leading dot.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mirrors_from_anchor() {
        let dir = output_dir_for(
            Path::new("/mnt/backup/raw/DATA_23-02-05/Case1/Monitor/rec_0001.seq"),
            Path::new("/out"),
        );
        assert_eq!(dir, PathBuf::from("/out/DATA_23-02-05/Case1/Monitor"));
    }

    #[test]
    fn test_first_anchor_wins() {
        let dir = output_dir_for(
            Path::new("/DATA_archive/DATA_23-02-05/Case1/Monitor/rec.seq"),
            Path::new("/out"),
        );
        assert_eq!(
            dir,
            PathBuf::from("/out/DATA_archive/DATA_23-02-05/Case1/Monitor")
        );
    }

    #[test]
    fn test_anchor_is_case_insensitive() {
        let dir = output_dir_for(
            Path::new("/src/data_23-02-05/Case2/General_3/a.seq"),
            Path::new("/out"),
        );
        assert_eq!(dir, PathBuf::from("/out/data_23-02-05/Case2/General_3"));
    }

    #[test]
    fn test_fallback_uses_three_parents() {
        let dir = output_dir_for(
            Path::new("/scratch/day/trial/Monitor/a.seq"),
            Path::new("/out"),
        );
        assert_eq!(dir, PathBuf::from("/out/day/trial/Monitor"));
    }

    #[test]
    fn test_fallback_placeholders_for_missing_levels() {
        let dir = output_dir_for(Path::new("Monitor/a.seq"), Path::new("/out"));
        assert_eq!(
            dir,
            PathBuf::from("/out")
                .join(UNKNOWN_DATE_DIR)
                .join(UNKNOWN_CASE_DIR)
                .join("Monitor")
        );

        let dir = output_dir_for(Path::new("a.seq"), Path::new("/out"));
        assert_eq!(
            dir,
            PathBuf::from("/out")
                .join(UNKNOWN_DATE_DIR)
                .join(UNKNOWN_CASE_DIR)
                .join(UNKNOWN_CHANNEL_DIR)
        );
    }

    #[test]
    fn test_ensure_output_dir_is_idempotent() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("src/DATA_23-02-05/Case1/Monitor/a.seq");
        let out_root = tmp.path().join("out");

        let first = ensure_output_dir(&source, &out_root).unwrap();
        let second = ensure_output_dir(&source, &out_root).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert_eq!(first, out_root.join("DATA_23-02-05/Case1/Monitor"));
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension(Path::new("a.SEQ"), "seq"));
        assert!(has_extension(Path::new("/x/y.mp4"), "mp4"));
        assert!(!has_extension(Path::new("a.seq.bak"), "seq"));
        assert!(!has_extension(Path::new("seq"), "seq"));
    }
}
