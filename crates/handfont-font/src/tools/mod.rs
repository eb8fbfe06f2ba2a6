//! External tool ports and their process-backed implementations.

mod compiler;
mod fontforge;
mod tracer;

pub use compiler::{glyph_name, BuildScript, FontCompiler, FontMetrics, GlyphImport, Placement};
pub use fontforge::{render_script, FontForgeCompiler};
pub use tracer::{write_bilevel_pgm, PotraceTracer, Tracer};

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::FontBuildError;

const POLL: Duration = Duration::from_millis(10);

/// Captured result of a finished tool run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Both streams, for error reports.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Why a tool run did not succeed.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("{tool}: executable not found")]
    NotFound { tool: String },
    #[error("{tool}: failed to start: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool}: timed out after {after:?}")]
    Timeout { tool: String, after: Duration, output: ToolOutput },
    #[error("{tool}: exited with {status:?}")]
    Failed { tool: String, status: Option<i32>, output: ToolOutput },
}

impl From<ToolError> for FontBuildError {
    fn from(e: ToolError) -> Self {
        let reason = e.to_string();
        match e {
            ToolError::NotFound { tool } | ToolError::Spawn { tool, .. } => {
                FontBuildError::ExternalToolFailure {
                    tool,
                    reason,
                    stdout: String::new(),
                    stderr: String::new(),
                }
            }
            ToolError::Timeout { tool, output, .. } | ToolError::Failed { tool, output, .. } => {
                FontBuildError::ExternalToolFailure {
                    tool,
                    reason,
                    stdout: output.stdout,
                    stderr: output.stderr,
                }
            }
        }
    }
}

/// First of `names` found on `PATH`.
pub fn find_executable(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        for name in names {
            let candidate = dir.join(name);
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// Run `cmd` to completion, capturing both streams.
///
/// The streams are drained on their own threads so a chatty child cannot
/// block on a full pipe. With a `timeout` the child is killed once it is
/// exceeded. A non-zero exit is reported as [`ToolError::Failed`].
pub fn run_tool(
    tool: &str,
    mut cmd: Command,
    timeout: Option<Duration>,
) -> Result<ToolOutput, ToolError> {
    log::debug!("running {tool}: {cmd:?}");
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound {
                tool: tool.to_string(),
            },
            _ => ToolError::Spawn {
                tool: tool.to_string(),
                source,
            },
        })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let started = Instant::now();
    let mut timed_out = false;
    let status: Option<ExitStatus> = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(e) => {
                log::warn!("{tool}: wait failed: {e}");
                break None;
            }
        }
        if timeout.is_some_and(|t| started.elapsed() >= t) {
            timed_out = true;
            let _ = child.kill();
            break child.wait().ok();
        }
        thread::sleep(POLL);
    };

    let output = ToolOutput {
        status: status.and_then(|s| s.code()),
        stdout: join_drain(stdout),
        stderr: join_drain(stderr),
    };

    if timed_out {
        return Err(ToolError::Timeout {
            tool: tool.to_string(),
            after: timeout.unwrap_or_default(),
            output,
        });
    }
    if !status.is_some_and(|s| s.success()) {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status,
            output,
        });
    }
    log::debug!("{tool} finished in {:?}", started.elapsed());
    Ok(output)
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        buf
    })
}

fn join_drain(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
