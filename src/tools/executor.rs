//! Command Executor
//!
//! Runs a validated [`CanonicalArgv`] as a child process. The child is
//! created directly (never through a shell), with a cleared environment,
//! a fixed working directory, no stdin and a wall-clock timeout.

use super::timeout::{ExecutionTimeout, DEFAULT_TIMEOUT_SECS};
use super::validator::CanonicalArgv;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tracing::{debug, error, info, warn};

/// Maximum bytes kept per output stream (1MB)
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Search path given to every child process
pub const DEFAULT_SEARCH_PATH: &str = "/usr/bin:/bin";

/// How an execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    /// The process ran to completion (any exit code)
    Success,
    /// The process was killed at the deadline
    TimedOut,
    /// The process could not be started or its output could not be collected
    SpawnFailed,
}

/// Result of running a command
///
/// Standard output and standard error are kept apart and only joined by
/// [`ExecutionResult::combined_output`].
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub kind: ExecutionKind,

    /// Standard output (truncated if too large)
    pub stdout: String,

    /// Standard error (truncated if too large)
    pub stderr: String,

    /// Exit code, negative signal number if the child was killed by a signal
    pub exit_code: i32,

    /// Sanitized failure message for `SpawnFailed`
    pub error: Option<String>,

    /// Execution duration in milliseconds
    pub duration_ms: f64,
}

impl ExecutionResult {
    /// Result for the empty command
    pub fn noop() -> Self {
        Self::completed(String::new(), String::new(), 0, 0.0)
    }

    fn completed(stdout: String, stderr: String, exit_code: i32, duration_ms: f64) -> Self {
        Self {
            kind: ExecutionKind::Success,
            stdout,
            stderr,
            exit_code,
            error: None,
            duration_ms,
        }
    }

    fn timeout(duration_ms: f64) -> Self {
        Self {
            kind: ExecutionKind::TimedOut,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            error: None,
            duration_ms,
        }
    }

    fn spawn_failed(message: &str, duration_ms: f64) -> Self {
        Self {
            kind: ExecutionKind::SpawnFailed,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            error: Some(message.to_string()),
            duration_ms,
        }
    }

    /// Stdout, then stderr, separated by a newline when both are present
    pub fn combined_output(&self) -> String {
        let mut output = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        output.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stderr.is_empty() {
            output.push('\n');
        }
        output.push_str(&self.stderr);
        output
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        match self.kind {
            ExecutionKind::TimedOut => format!("Timeout after {:.0}ms", self.duration_ms),
            ExecutionKind::SpawnFailed => format!(
                "Spawn failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            ),
            ExecutionKind::Success => format!(
                "Exited with {} ({:.0}ms, {} bytes output)",
                self.exit_code,
                self.duration_ms,
                self.stdout.len() + self.stderr.len()
            ),
        }
    }
}

/// Configuration for command execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Wall-clock limit (default: 15 seconds)
    pub timeout: Duration,

    /// Maximum bytes kept per stream (default: 1MB)
    pub max_output_size: usize,

    /// `PATH` for the child; nothing else from the parent environment is passed on
    pub search_path: String,

    /// Working directory for every child
    pub working_dir: PathBuf,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_size: MAX_OUTPUT_SIZE,
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            working_dir: PathBuf::from("."),
        }
    }
}

impl ExecutorConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    pub fn with_max_output_size(size: usize) -> Self {
        Self {
            max_output_size: size,
            ..Default::default()
        }
    }

    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: dir.into(),
            ..Default::default()
        }
    }
}

/// Executor for validated commands
///
/// # Security
///
/// 1. Uses `tokio::process::Command` directly, no shell
/// 2. Only accepts a [`CanonicalArgv`], which only the validator produces
/// 3. Clears the environment and sets a fixed `PATH`
/// 4. Kills the child when the timeout expires (`kill_on_drop`)
/// 5. Reads at most `max_output_size` bytes per stream, discarding the rest
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a validated command
    ///
    /// Never fails: spawn errors and timeouts are reported through
    /// [`ExecutionResult::kind`]. An empty argv returns immediately without
    /// spawning anything.
    pub async fn execute(&self, argv: &CanonicalArgv) -> ExecutionResult {
        let Some(program) = argv.program() else {
            debug!("Empty command, nothing to execute");
            return ExecutionResult::noop();
        };

        let start = Instant::now();

        // Log command (truncated for safety)
        let cmd_str = if argv.args().len() > 3 {
            format!("{:?} ... ({} args)", program, argv.args().len())
        } else {
            format!("{:?}", argv.as_slice())
        };
        info!("Executing: {}", cmd_str);

        let mut process = TokioCommand::new(program);
        process
            .args(argv.args())
            .env_clear()
            .env("PATH", &self.config.search_path)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to spawn {:?}: {}", program, e);
                return ExecutionResult::spawn_failed(spawn_failure_message(&e), elapsed_ms(start));
            }
        };

        let limit = self.config.max_output_size;
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let collect = async {
            let (stdout, stderr, status) = tokio::join!(
                read_capped(stdout_pipe, limit),
                read_capped(stderr_pipe, limit),
                child.wait(),
            );
            Ok::<_, io::Error>((stdout?, stderr?, status?))
        };

        let timeout = ExecutionTimeout::new(self.config.timeout);
        let (stdout, stderr, status) = match timeout.run(collect).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Failed to collect output of {:?}: {}", program, e);
                return ExecutionResult::spawn_failed(
                    "failed to collect process output",
                    elapsed_ms(start),
                );
            }
            Err(_) => {
                // Returning drops the child, kill_on_drop reaps it
                warn!("Command timed out after {:?}: {}", self.config.timeout, cmd_str);
                return ExecutionResult::timeout(elapsed_ms(start));
            }
        };

        let stdout = truncate_output(String::from_utf8_lossy(&stdout).into_owned(), limit);
        let stderr = truncate_output(String::from_utf8_lossy(&stderr).into_owned(), limit);
        let exit_code = exit_code(status);

        if status.success() {
            info!("Command succeeded: {}", cmd_str);
        } else {
            warn!("Command failed: {} (exit code: {})", cmd_str, exit_code);
        }

        ExecutionResult::completed(stdout, stderr, exit_code, elapsed_ms(start))
    }
}

/// Client-safe description of a spawn error; the OS detail stays in the logs
fn spawn_failure_message(err: &io::Error) -> &'static str {
    match err.kind() {
        io::ErrorKind::NotFound => "command not found",
        io::ErrorKind::PermissionDenied => "permission denied",
        _ => "failed to start process",
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Read a child pipe, keeping at most `limit + 1` bytes
///
/// The extra byte marks the stream as over the limit for [`truncate_output`].
/// Everything past it is read and dropped so the child never blocks on a
/// full pipe.
async fn read_capped<R>(pipe: Option<R>, limit: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(Vec::new());
    };

    let mut kept = Vec::new();
    (&mut pipe)
        .take(limit as u64 + 1)
        .read_to_end(&mut kept)
        .await?;
    tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
    Ok(kept)
}

/// Truncate to at most `max_len` bytes on a char boundary, ending in an
/// ellipsis when it fits
fn truncate_output(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let suffix = if max_len >= 3 { "..." } else { "" };
        let mut cut = max_len - suffix.len();
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str(suffix);
    }
    s
}
