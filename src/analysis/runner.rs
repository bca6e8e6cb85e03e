use super::{decoder::snippet, types::RawOutput};
use crate::{Error, Result, config::AnalysisConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One invocation of the analysis unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisJob {
    pub run_id: Uuid,
    pub staged_path: PathBuf,
    pub target_savings: String,
}

#[async_trait]
pub trait AnalysisRunner: Send + Sync {
    /// Runs the unit to completion and returns its output, or fails with
    /// [`Error::AnalysisFailed`] / [`Error::AnalysisTimeout`].
    async fn run(&self, job: &AnalysisJob) -> Result<RawOutput>;
}

/// Runs the analysis unit as a child process.
///
/// Arguments go straight into the argument vector, never through a shell.
/// The unit runs in its own process group; the whole group is killed on
/// timeout and whenever the future running it is dropped.
pub struct ProcessRunner {
    config: AnalysisConfig,
    artifact_dir: PathBuf,
    static_prefix: String,
}

impl ProcessRunner {
    pub fn new(config: AnalysisConfig, artifact_dir: &Path, static_prefix: &str) -> Self {
        Self {
            config,
            artifact_dir: artifact_dir.to_path_buf(),
            static_prefix: static_prefix.to_string(),
        }
    }

    fn command(&self, job: &AnalysisJob) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(&job.staged_path)
            .arg(&job.target_savings)
            .envs(&self.config.env)
            .env("ANALYSIS_ARTIFACT_DIR", &self.artifact_dir)
            .env("ANALYSIS_STATIC_PREFIX", &self.static_prefix)
            .env("ANALYSIS_RUN_ID", job.run_id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn timeout_error(&self) -> Error {
        Error::AnalysisTimeout {
            timeout_secs: self.config.timeout_secs,
        }
    }
}

#[async_trait]
impl AnalysisRunner for ProcessRunner {
    async fn run(&self, job: &AnalysisJob) -> Result<RawOutput> {
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.timeout();

        info!(
            "Executing analysis unit: {} {:?} <staged file> <target savings>",
            self.config.program, self.config.args
        );

        let mut child = self.command(job).spawn().map_err(|e| Error::AnalysisFailed {
            exit_code: None,
            stderr_excerpt: format!("failed to launch '{}': {}", self.config.program, e),
        })?;
        // Declared after `child` so the group is signalled before the child is reaped
        let mut group = ProcessGroup::new(child.id());

        let stdout_handle = spawn_reader(
            child
                .stdout
                .take()
                .ok_or_else(|| Error::internal("stdout pipe unavailable"))?,
        );
        let stderr_handle = spawn_reader(
            child
                .stderr
                .take()
                .ok_or_else(|| Error::internal("stderr pipe unavailable"))?,
        );

        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                stdout_handle.abort();
                stderr_handle.abort();
                return Err(Error::internal(format!(
                    "failed waiting for analysis unit: {}",
                    e
                )));
            }
            Err(_) => {
                warn!(
                    "Analysis unit exceeded {}s, terminating it",
                    self.config.timeout_secs
                );
                group.kill();
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill analysis unit: {}", e);
                }
                stdout_handle.abort();
                stderr_handle.abort();
                return Err(self.timeout_error());
            }
        };

        // A grandchild may still hold the pipes open after the unit exits
        let abort_stdout = stdout_handle.abort_handle();
        let abort_stderr = stderr_handle.abort_handle();
        let collected = tokio::time::timeout_at(deadline, async {
            tokio::try_join!(join_reader(stdout_handle), join_reader(stderr_handle))
        })
        .await;
        let (stdout, stderr) = match collected {
            Ok(streams) => streams?,
            Err(_) => {
                warn!("Analysis unit left processes holding its output, terminating them");
                group.kill();
                abort_stdout.abort();
                abort_stderr.abort();
                return Err(self.timeout_error());
            }
        };
        group.disarm();

        let duration = start.elapsed();

        if !status.success() {
            let excerpt = failure_excerpt(&stdout, &stderr, self.config.stderr_excerpt_bytes)
                .unwrap_or_else(|| format!("analysis unit exited with {}", status));
            warn!(
                "Analysis unit failed after {:?} with {}: {}",
                duration, status, excerpt
            );
            return Err(Error::AnalysisFailed {
                exit_code: status.code(),
                stderr_excerpt: excerpt,
            });
        }

        if !stderr.trim().is_empty() {
            debug!("Analysis unit stderr: {}", stderr.trim());
        }
        info!(
            "Analysis unit finished in {:?} ({} bytes of output)",
            duration,
            stdout.len()
        );

        Ok(RawOutput {
            stdout,
            stderr,
            duration,
        })
    }
}

/// Process group led by the analysis unit. Killed on drop unless disarmed.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    // A negative pid addresses every member of the group
    let ret = unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
    if ret != 0 {
        debug!(
            "Process group {} not signalled: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

fn spawn_reader<R>(mut stream: R) -> JoinHandle<std::io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

async fn join_reader(handle: JoinHandle<std::io::Result<String>>) -> Result<String> {
    handle
        .await
        .map_err(|e| Error::internal(format!("output capture task failed: {}", e)))?
        .map_err(Error::from)
}

/// Best diagnostic for a failed run: the tail of stderr, else an
/// `{"error": ...}` message the unit printed on stdout, else raw stdout.
fn failure_excerpt(stdout: &str, stderr: &str, max_bytes: usize) -> Option<String> {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return Some(tail(stderr, max_bytes).to_string());
    }

    let stdout = stdout.trim();
    if stdout.is_empty() {
        return None;
    }
    let reported = serde_json::from_str::<Value>(stdout)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));
    Some(reported.unwrap_or_else(|| snippet(stdout)))
}

/// Last `max_bytes` of `text`, moved forward to a char boundary.
fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
