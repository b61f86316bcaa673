//! Supervised converter execution.
//!
//! One attempt launches the converter with the fixed flag layout
//! `-i <source> -o <out_dir> -of <base_name> -f <format>`, merges its
//! stdout and stderr line by line, and enforces two limits:
//!
//! - a wall-clock timeout, after which the process is killed;
//! - an error-line threshold: every line containing the error signature
//!   is counted and the process is killed once the count is reached.
//!
//! There is no graceful stop. Termination is always a hard kill.

use async_trait::async_trait;
use seqport_common::ContainerFormat;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::Error;

/// Substring the converter prints when it fails to write a frame.
pub const DEFAULT_ERROR_SIGNATURE: &str = "Error writing video";

/// How often the child's exit status is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on draining output after the child exits.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Per-attempt supervision limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptLimits {
    /// Wall-clock budget for the attempt.
    pub timeout: Duration,
    /// Error-signature lines tolerated before the kill. Zero disables.
    pub kill_after_error_lines: u32,
}

/// One conversion request.
#[derive(Debug, Clone)]
pub struct ConvertJob<'a> {
    pub source: &'a Path,
    pub out_dir: &'a Path,
    /// Output name without extension.
    pub base_name: &'a str,
    pub format: ContainerFormat,
    pub limits: AttemptLimits,
}

impl ConvertJob<'_> {
    /// Path the converter is expected to write.
    pub fn output_path(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}.{}", self.base_name, self.format.tag()))
    }
}

/// Terminal result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Exit status 0.
    Success,
    /// The converter executable could not be found.
    ToolNotFound { searched: Vec<PathBuf> },
    /// Killed after exceeding the wall-clock budget.
    ProcessTimeout { after: Duration },
    /// Killed after printing the error signature too often.
    ErrorRateExceeded { error_lines: u32 },
    /// Exited on its own with a non-zero status. `None` means killed by a signal.
    Exited { code: Option<i32> },
    /// Launching or waiting on the process failed.
    Exception { message: String },
    /// Exited 0 but the output file is missing or below the size floor.
    InvalidArtifact {
        path: PathBuf,
        size: Option<u64>,
        min_bytes: u64,
    },
}

/// Outcome of one attempt with its context.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub format: ContainerFormat,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
    /// Produced by a simulated converter; no file was written.
    pub simulated: bool,
}

impl AttemptReport {
    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }

    /// Numeric status in the style of a process exit code.
    pub fn exit_status(&self) -> i32 {
        match &self.outcome {
            AttemptOutcome::Success => 0,
            AttemptOutcome::Exited { code } => code.unwrap_or(-1),
            _ => -1,
        }
    }

    /// Human-readable reason recorded in logs and manifests.
    pub fn reason(&self) -> String {
        let fmt = self.format;
        match &self.outcome {
            AttemptOutcome::Success if self.simulated => format!("Simulated export ({fmt})"),
            AttemptOutcome::Success => format!("Exported successfully ({fmt})"),
            AttemptOutcome::ToolNotFound { searched } => {
                Error::tool_not_found("Converter", searched.clone()).to_string()
            }
            AttemptOutcome::ProcessTimeout { after } => {
                format!("Converter timed out after {}s ({fmt})", after.as_secs())
            }
            AttemptOutcome::ErrorRateExceeded { error_lines } => {
                format!("Killed after {error_lines} repeated errors ({fmt})")
            }
            AttemptOutcome::Exited { code: Some(code) } => {
                format!("Converter failed with exit code {code} ({fmt})")
            }
            AttemptOutcome::Exited { code: None } => {
                format!("Converter terminated by signal ({fmt})")
            }
            AttemptOutcome::Exception { message } => {
                format!("Exception starting converter: {message} ({fmt})")
            }
            AttemptOutcome::InvalidArtifact {
                path,
                size,
                min_bytes,
            } => match size {
                Some(size) => format!(
                    "Invalid artifact {}: {size} bytes, need {min_bytes} ({fmt})",
                    path.display()
                ),
                None => format!("Invalid artifact {}: not written ({fmt})", path.display()),
            },
        }
    }
}

/// A converter backend.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Run one attempt. Never panics on converter failure; every failure is
    /// an [`AttemptOutcome`].
    async fn convert(&self, job: &ConvertJob<'_>) -> AttemptReport;
}

/// Runs the real converter executable under supervision.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    program: Result<PathBuf, Vec<PathBuf>>,
    leading_args: Vec<String>,
    error_signature: String,
}

impl ExternalConverter {
    /// Converter at a known path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Ok(program.into()),
            leading_args: Vec::new(),
            error_signature: DEFAULT_ERROR_SIGNATURE.to_string(),
        }
    }

    /// Build from a lookup result.
    ///
    /// A failed lookup is kept, and every attempt then reports
    /// [`AttemptOutcome::ToolNotFound`].
    pub fn from_lookup(lookup: crate::Result<PathBuf>) -> Self {
        let program = match lookup {
            Ok(path) => Ok(path),
            Err(Error::ToolNotFound { searched, .. }) => Err(searched),
            Err(_) => Err(Vec::new()),
        };
        Self {
            program,
            leading_args: Vec::new(),
            error_signature: DEFAULT_ERROR_SIGNATURE.to_string(),
        }
    }

    /// Arguments placed before the fixed flag layout.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    pub fn with_error_signature(mut self, signature: impl Into<String>) -> Self {
        self.error_signature = signature.into();
        self
    }

    /// Whether the executable was found.
    pub fn is_available(&self) -> bool {
        self.program.is_ok()
    }

    /// Full argument list for `job`.
    pub fn command_args(&self, job: &ConvertJob<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        args.extend([
            OsString::from("-i"),
            job.source.as_os_str().to_owned(),
            OsString::from("-o"),
            job.out_dir.as_os_str().to_owned(),
            OsString::from("-of"),
            OsString::from(job.base_name),
            OsString::from("-f"),
            OsString::from(job.format.tag()),
        ]);
        args
    }
}

#[async_trait]
impl Converter for ExternalConverter {
    async fn convert(&self, job: &ConvertJob<'_>) -> AttemptReport {
        let started = Instant::now();
        let outcome = match &self.program {
            Err(searched) => AttemptOutcome::ToolNotFound {
                searched: searched.clone(),
            },
            Ok(program) => {
                let args = self.command_args(job);
                tracing::debug!("Running {} {:?}", program.display(), args);
                let mut command = Command::new(program);
                command.args(&args);
                supervise(command, job.limits, &self.error_signature).await
            }
        };
        AttemptReport {
            format: job.format,
            outcome,
            elapsed: started.elapsed(),
            simulated: false,
        }
    }
}

/// Reports success without launching anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedConverter;

#[async_trait]
impl Converter for SimulatedConverter {
    async fn convert(&self, job: &ConvertJob<'_>) -> AttemptReport {
        tracing::info!(
            "Simulated export: {} -> {} ({})",
            job.source.display(),
            job.output_path().display(),
            job.format
        );
        AttemptReport {
            format: job.format,
            outcome: AttemptOutcome::Success,
            elapsed: Duration::ZERO,
            simulated: true,
        }
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill converter process: {}", e);
    }
}

/// Run `command` to completion under `limits`.
///
/// Output lines from both streams are logged at trace level and scanned
/// for `signature`.
pub async fn supervise(
    mut command: Command,
    limits: AttemptLimits,
    signature: &str,
) -> AttemptOutcome {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let program = PathBuf::from(command.as_std().get_program());
            return AttemptOutcome::ToolNotFound {
                searched: vec![program],
            };
        }
        Err(e) => {
            return AttemptOutcome::Exception {
                message: e.to_string(),
            }
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    let deadline = Instant::now() + limits.timeout;
    let timeout = tokio::time::sleep_until(deadline);
    tokio::pin!(timeout);

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut error_lines = 0u32;
    let mut streams_open = true;

    loop {
        tokio::select! {
            biased;

            _ = &mut timeout => {
                terminate(&mut child).await;
                return AttemptOutcome::ProcessTimeout { after: limits.timeout };
            }

            line = rx.recv(), if streams_open => match line {
                Some(line) => {
                    tracing::trace!("converter: {}", line);
                    if line.contains(signature) {
                        error_lines += 1;
                        if limits.kill_after_error_lines > 0
                            && error_lines >= limits.kill_after_error_lines
                        {
                            terminate(&mut child).await;
                            return AttemptOutcome::ErrorRateExceeded { error_lines };
                        }
                    }
                }
                None => streams_open = false,
            },

            _ = poll.tick() => match child.try_wait() {
                Ok(Some(status)) => {
                    drain(&mut rx, deadline.min(Instant::now() + DRAIN_GRACE)).await;
                    return if status.success() {
                        AttemptOutcome::Success
                    } else {
                        AttemptOutcome::Exited { code: status.code() }
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    terminate(&mut child).await;
                    return AttemptOutcome::Exception { message: e.to_string() };
                }
            },
        }
    }
}

/// Log whatever output is still buffered, bounded by `until`.
async fn drain(rx: &mut mpsc::UnboundedReceiver<String>, until: Instant) {
    while let Ok(Some(line)) = tokio::time::timeout_at(until, rx.recv()).await {
        tracing::trace!("converter: {}", line);
    }
}
