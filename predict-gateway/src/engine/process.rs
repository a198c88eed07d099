//! Worker process execution.
//!
//! Every prediction runs in its own short-lived worker process started as
//! `program [args...] <model_id> <payload_json>` in its own process group.
//! Stdout and stderr are read concurrently while waiting for the exit status,
//! each into its own buffer. The run ends when the worker exits, even if a
//! child it left behind still holds the pipes.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{Semaphore, SemaphorePermit};

use super::{InvocationResult, ModelExecutor, NormalizedRequest};
use crate::config::WorkerConfig;
use crate::error::{Error, Result};

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// How long to keep reading output after the worker has exited.
const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Spawns one worker process per invocation.
///
/// A semaphore bounds how many workers run at once, and every run is bounded
/// by `timeout_secs`.
pub struct ProcessInvoker {
    config: WorkerConfig,
    /// Free worker slots
    slots: Semaphore,
}

impl ProcessInvoker {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            slots: Semaphore::new(config.max_concurrent.max(1)),
            config,
        }
    }

    fn max_concurrent(&self) -> usize {
        self.config.max_concurrent.max(1)
    }

    /// Number of workers that could be started right now.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a worker slot, up to `queue_timeout_secs`.
    async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>> {
        if self.config.queue_timeout_secs == 0 {
            return self
                .slots
                .try_acquire()
                .map_err(|_| Error::Saturated(self.max_concurrent()));
        }

        let wait = Duration::from_secs(self.config.queue_timeout_secs);
        match tokio::time::timeout(wait, self.slots.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(e)) => Err(Error::Internal(format!("Semaphore error: {}", e))),
            Err(_elapsed) => Err(Error::Saturated(self.max_concurrent())),
        }
    }

    fn build_command(&self, model_id: &str, payload: &str) -> Command {
        let mut cmd = Command::new(&self.config.program);

        // Prefix arguments (e.g., the worker script) come before model and payload
        cmd.args(&self.config.args).arg(model_id).arg(payload);

        if let Some(ref dir) = self.config.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so signals reach anything the worker starts
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    /// Run the worker for `model_id` and capture its output.
    ///
    /// Returns `Error::ProcessExecution` unless the worker exits with code 0
    /// and leaves stderr empty.
    pub async fn invoke(
        &self,
        model_id: &str,
        payload: &NormalizedRequest,
    ) -> Result<InvocationResult> {
        let payload = payload.to_payload()?;
        let _permit = self.acquire_slot().await?;

        let mut child = self.build_command(model_id, &payload).spawn().map_err(|e| {
            Error::ProcessSpawn(format!(
                "{} for model {}: {}",
                self.config.program, model_id, e
            ))
        })?;
        let pid = child.id();
        let start = Instant::now();

        tracing::debug!(model = %model_id, pid = ?pid, "Spawned worker");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("Worker stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("Worker stderr was not captured".to_string()))?;

        let deadline = Duration::from_secs(self.config.timeout_secs);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let run = async {
            let drains = async {
                tokio::join!(drain(stdout, &mut out, "stdout"), drain(stderr, &mut err, "stderr"))
            };
            tokio::pin!(drains);

            let (status, drained) = tokio::select! {
                status = child.wait() => {
                    // Exited; pipes held open by leftover children only get a short window
                    let drained = tokio::time::timeout(PIPE_DRAIN_GRACE, &mut drains).await;
                    (status, drained.ok())
                }
                drained = &mut drains => (child.wait().await, Some(drained)),
            };
            Ok::<_, Error>((
                status.map_err(|e| Error::Internal(format!("Failed to wait for worker: {}", e)))?,
                drained,
            ))
        };
        let finished = tokio::time::timeout(deadline, run).await;

        let (status, drained) = match finished {
            Ok(captured) => captured?,
            Err(_elapsed) => {
                tracing::warn!(
                    model = %model_id,
                    pid = ?pid,
                    "Worker exceeded {}s deadline, terminating",
                    self.config.timeout_secs
                );
                self.terminate(&mut child, pid).await;
                return Err(Error::Timeout(self.config.timeout_secs));
            }
        };

        match drained {
            Some((out_read, err_read)) => {
                let read_error =
                    |e: std::io::Error| Error::Internal(format!("Failed to read worker output: {}", e));
                out_read.map_err(read_error)?;
                err_read.map_err(read_error)?;
            }
            None => {
                tracing::warn!(
                    model = %model_id,
                    pid = ?pid,
                    "Worker exited but its output pipes stayed open, killing leftover processes"
                );
                kill_group(pid);
            }
        }

        let result = InvocationResult {
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
            exit_code: status.code(),
            elapsed: start.elapsed(),
        };

        tracing::info!(
            model = %model_id,
            pid = ?pid,
            exit_code = ?result.exit_code,
            stdout_bytes = out.len(),
            stderr_bytes = err.len(),
            elapsed_ms = %result.elapsed.as_millis(),
            "Worker finished"
        );

        result.into_success()
    }

    /// SIGTERM the worker's process group, then kill it if the worker is
    /// still alive after the grace period.
    async fn terminate(&self, child: &mut Child, pid: Option<u32>) {
        signal_group(pid, Signal::Term);

        let grace = Duration::from_secs(self.config.kill_grace_secs);
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("Worker exited with {} after termination", status);
            }
            Ok(Err(e)) => {
                tracing::warn!("Error waiting for terminated worker: {}", e);
            }
            Err(_timeout) => {
                tracing::warn!("Worker didn't stop gracefully, killing");
                let _ = child.kill().await;
            }
        }

        // Children that ignored SIGTERM or outlived the worker
        kill_group(pid);
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Term,
    Kill,
}

fn kill_group(pid: Option<u32>) {
    signal_group(pid, Signal::Kill);
}

/// Signal every process in the worker's group. The group id is the worker pid.
fn signal_group(pid: Option<u32>, signal: Signal) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal as UnixSignal};
        use nix::unistd::Pid;

        let Some(pid) = pid else { return };
        let signal = match signal {
            Signal::Term => UnixSignal::SIGTERM,
            Signal::Kill => UnixSignal::SIGKILL,
        };
        if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
            // ESRCH: the whole group is already gone
            if e != nix::errno::Errno::ESRCH {
                tracing::debug!(pid, ?signal, "Failed to signal worker group: {}", e);
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (pid, signal);
    }
}

/// Read a pipe to EOF into `captured`, appending chunks in the order they arrive.
///
/// Bytes read before the future is dropped stay in `captured`.
async fn drain<R: AsyncRead + Unpin>(
    mut reader: R,
    captured: &mut Vec<u8>,
    channel: &'static str,
) -> std::io::Result<()> {
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        tracing::trace!(channel, bytes = n, "Worker output chunk");
        captured.extend_from_slice(&chunk[..n]);
    }
}

#[async_trait]
impl ModelExecutor for ProcessInvoker {
    fn executor_type(&self) -> &'static str {
        "process"
    }

    async fn execute(
        &self,
        model_id: &str,
        payload: &NormalizedRequest,
    ) -> Result<InvocationResult> {
        self.invoke(model_id, payload).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn payload() -> NormalizedRequest {
        NormalizedRequest {
            cpt_code: "81210".to_string(),
            age: 50.0,
            frw: 1.2,
            systolic_bp: 120.0,
            diastolic_bp: 80.0,
            cholesterol_level: 190.0,
            cigarette_consumption: 0.0,
            sex: 1,
        }
    }

    /// Worker running an inline shell script; model id and payload arrive as $1 and $2.
    fn shell_config(script: &str) -> WorkerConfig {
        WorkerConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "worker".to_string()],
            timeout_secs: 10,
            kill_grace_secs: 1,
            ..WorkerConfig::default()
        }
    }

    #[test]
    fn test_executor_type() {
        let invoker = ProcessInvoker::new(shell_config("true"));
        assert_eq!(invoker.executor_type(), "process");
    }

    #[test]
    fn test_zero_max_concurrent_still_allows_one() {
        let mut config = shell_config("true");
        config.max_concurrent = 0;
        let invoker = ProcessInvoker::new(config);
        assert_eq!(invoker.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_invoke_captures_stdout() {
        let invoker = ProcessInvoker::new(shell_config("printf '[1]'"));
        let result = invoker.invoke("cancer_prediction", &payload()).await.unwrap();
        assert_eq!(result.stdout, "[1]");
        assert_eq!(result.stderr, "");
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_invoke_passes_model_and_payload_as_arguments() {
        let invoker = ProcessInvoker::new(shell_config(r#"printf '%s\n%s' "$1" "$2""#));
        let result = invoker.invoke("cardio_prediction", &payload()).await.unwrap();

        let mut lines = result.stdout.lines();
        assert_eq!(lines.next(), Some("cardio_prediction"));
        let sent: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(sent["sex"], 1);
        assert_eq!(sent["CPT_code"], "81210");
        assert_eq!(sent["systolicBP"], 120.0);
    }

    #[tokio::test]
    async fn test_invoke_preserves_output_order() {
        let invoker = ProcessInvoker::new(shell_config(
            "i=1; while [ $i -le 5000 ]; do echo $i; i=$((i+1)); done",
        ));
        let result = invoker.invoke("cancer_prediction", &payload()).await.unwrap();

        let expected: String = (1..=5000).map(|i| format!("{}\n", i)).collect();
        assert_eq!(result.stdout, expected);
    }

    #[tokio::test]
    async fn test_invoke_stderr_with_exit_zero_fails() {
        let invoker = ProcessInvoker::new(shell_config("printf '[1]'; printf 'warning' >&2"));
        match invoker.invoke("cancer_prediction", &payload()).await {
            Err(Error::ProcessExecution { exit_code, stderr }) => {
                assert_eq!(exit_code, Some(0));
                assert_eq!(stderr, "warning");
            }
            other => panic!("Expected ProcessExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_nonzero_exit_fails() {
        let invoker = ProcessInvoker::new(shell_config("exit 3"));
        match invoker.invoke("cancer_prediction", &payload()).await {
            Err(Error::ProcessExecution { exit_code, stderr }) => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.is_empty());
            }
            other => panic!("Expected ProcessExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_missing_program() {
        let mut config = shell_config("true");
        config.program = "/nonexistent/predict-worker".to_string();
        let invoker = ProcessInvoker::new(config);

        match invoker.invoke("cancer_prediction", &payload()).await {
            Err(Error::ProcessSpawn(msg)) => {
                assert!(msg.contains("/nonexistent/predict-worker"));
                assert!(msg.contains("cancer_prediction"));
            }
            other => panic!("Expected ProcessSpawn, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_missing_working_dir_is_spawn_failure() {
        let mut config = shell_config("true");
        config.working_dir = Some("/nonexistent/workdir".to_string());
        let invoker = ProcessInvoker::new(config);

        let result = invoker.invoke("cancer_prediction", &payload()).await;
        assert!(matches!(result, Err(Error::ProcessSpawn(_))));
    }

    #[tokio::test]
    async fn test_invoke_timeout_terminates_worker() {
        let mut config = shell_config("sleep 30");
        config.timeout_secs = 1;
        let invoker = ProcessInvoker::new(config);

        let start = Instant::now();
        let result = invoker.invoke("cancer_prediction", &payload()).await;
        assert!(matches!(result, Err(Error::Timeout(1))));
        assert!(start.elapsed() < Duration::from_secs(10));
        // The slot is released once the timed-out worker is gone
        assert_eq!(invoker.available_slots(), invoker.max_concurrent());
    }

    #[tokio::test]
    async fn test_exit_with_background_child_holding_stdout() {
        let mut config = shell_config("printf '[1]'; sleep 5 &");
        config.timeout_secs = 3;
        let invoker = ProcessInvoker::new(config);

        let start = Instant::now();
        let result = invoker.invoke("cancer_prediction", &payload()).await.unwrap();
        assert_eq!(result.stdout, "[1]");
        assert_eq!(result.exit_code, Some(0));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_timeout_terminates_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survived");
        // The subshell is a grandchild of the invoker; only a group signal reaches it
        let mut config = shell_config(&format!(
            "(sleep 2; touch '{}') & sleep 30",
            marker.display()
        ));
        config.timeout_secs = 1;
        let invoker = ProcessInvoker::new(config);

        let result = invoker.invoke("cancer_prediction", &payload()).await;
        assert!(matches!(result, Err(Error::Timeout(1))));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_saturated_pool_rejects_immediately() {
        let mut config = shell_config("sleep 2; printf '[0]'");
        config.max_concurrent = 1;
        config.queue_timeout_secs = 0;
        let invoker = Arc::new(ProcessInvoker::new(config));

        let busy = {
            let invoker = invoker.clone();
            tokio::spawn(async move { invoker.invoke("cancer_prediction", &payload()).await })
        };
        while invoker.available_slots() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let rejected = invoker.invoke("cardio_prediction", &payload()).await;
        assert!(matches!(rejected, Err(Error::Saturated(1))));

        let first = busy.await.unwrap().unwrap();
        assert_eq!(first.stdout, "[0]");
    }

    #[tokio::test]
    async fn test_queued_request_runs_when_slot_frees() {
        let mut config = shell_config("sleep 1; printf '%s' \"$1\"");
        config.max_concurrent = 1;
        config.queue_timeout_secs = 10;
        let invoker = Arc::new(ProcessInvoker::new(config));

        let first = {
            let invoker = invoker.clone();
            tokio::spawn(async move { invoker.invoke("first_model", &payload()).await })
        };
        while invoker.available_slots() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let second = invoker.invoke("second_model", &payload()).await.unwrap();
        assert_eq!(second.stdout, "second_model");
        assert_eq!(first.await.unwrap().unwrap().stdout, "first_model");
    }
}
