//! # seqport-convert
//!
//! Drives the external sequence converter and guards its outputs.
//!
//! - [`tools`] finds the converter executable.
//! - [`engine`] runs one supervised conversion attempt with a timeout and
//!   an error-line kill threshold.
//! - [`artifact`] validates exports by size, finds existing ones, purges
//!   invalid leftovers, and picks non-colliding output names.
//!
//! ## Example
//!
//! ```no_run
//! use seqport_common::ContainerFormat;
//! use seqport_convert::{AttemptLimits, ConvertJob, Converter, ExternalConverter};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn run() {
//! let lookup = seqport_convert::locate_converter(
//!     None,
//!     &seqport_convert::tools::default_search_paths(),
//!     seqport_convert::tools::DEFAULT_PROGRAM,
//! );
//! let converter = ExternalConverter::from_lookup(lookup);
//! let job = ConvertJob {
//!     source: Path::new("D:/backup/DATA_23-02-05/Case1/Monitor/rec.seq"),
//!     out_dir: Path::new("E:/exports/DATA_23-02-05/Case1/Monitor"),
//!     base_name: "Monitor",
//!     format: ContainerFormat::Mp4,
//!     limits: AttemptLimits {
//!         timeout: Duration::from_secs(20),
//!         kill_after_error_lines: 6,
//!     },
//! };
//! let report = converter.convert(&job).await;
//! println!("{}", report.reason());
//! # }
//! ```

pub mod artifact;
pub mod engine;
mod error;
pub mod tools;

pub use engine::{
    AttemptLimits, AttemptOutcome, AttemptReport, ConvertJob, Converter, ExternalConverter,
    SimulatedConverter,
};
pub use error::{Error, Result};
pub use tools::{check_converter, locate_converter, ToolInfo};
