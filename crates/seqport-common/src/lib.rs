//! Seqport-Common: Shared identifiers, channel types, and path utilities.
//!
//! This crate provides common functionality used across seqport:
//!
//! - **Case IDs**: `CaseId` codec between `YYYY-MM-DD_N` keys and
//!   `DATA_YY-MM-DD` / `CaseN` directory names
//! - **Core Types**: the fixed `Channel` set, `StatusCode`, `ContainerFormat`
//! - **Path Utilities**: output directory resolution mirroring the source tree
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use seqport_common::{CaseId, Channel, StatusCode};
//!
//! let case: CaseId = "2023-02-05_1".parse().unwrap();
//! let dir = case.relative_dir().join(Channel::Monitor.as_str());
//! assert!(dir.ends_with("Monitor"));
//!
//! assert_eq!(StatusCode::classify(None, 1), StatusCode::Missing);
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::CaseId;
pub use types::*;

/// Bytes per megabyte as used for every size threshold.
pub const BYTES_PER_MB: u64 = 1024 * 1024;
