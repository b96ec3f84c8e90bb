//! Inference worker supervision.
//!
//! ```text
//! Stopped -> Starting -> Running --exit 0--> Stopped
//!               |          |
//!               |          +--exit != 0--> Restarting --delay--> Starting
//!               +--launch failure--> Stopped (no retry)
//! ```
//!
//! Cancelling the shutdown token from any state kills the child and ends in
//! `Stopped`.

use std::borrow::Cow;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};

use metrics::counter;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::errors::WorkerError;
use crate::metrics::{WORKER_LAUNCH_FAILURES_TOTAL, WORKER_RESTARTS_TOTAL};

/// Lifecycle of the worker process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// No process, and none scheduled.
    Stopped,
    /// Launching the process.
    Starting,
    /// The process is alive.
    Running,
    /// Waiting out the restart delay.
    Restarting,
}

/// Why [`WorkerSupervisor::run`] returned.
#[derive(Debug)]
pub enum SupervisorExit {
    /// The worker exited with status 0.
    CleanExit,
    /// The worker could not be launched at all.
    LaunchFailed(WorkerError),
    /// The shutdown token was cancelled.
    Cancelled,
}

/// Owns the worker process handle and its lifecycle state.
pub struct WorkerSupervisor {
    config: WorkerConfig,
    state: watch::Sender<WorkerState>,
    launches: AtomicU32,
}

impl WorkerSupervisor {
    /// A supervisor that has not launched anything yet.
    pub fn new(config: WorkerConfig) -> Self {
        let (state, _) = watch::channel(WorkerState::Stopped);
        Self {
            config,
            state,
            launches: AtomicU32::new(0),
        }
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Number of successful launches so far.
    pub fn launches(&self) -> u32 {
        self.launches.load(Ordering::Relaxed)
    }

    /// Launch configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    fn set_state(&self, next: WorkerState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = ?prev, to = ?next, "worker state change");
        }
    }

    /// Supervise the worker until it exits cleanly, fails to launch, or
    /// `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> SupervisorExit {
        loop {
            self.set_state(WorkerState::Starting);
            info!(program = %self.config.program, "starting inference worker");

            let mut child = match self.launch() {
                Ok(child) => child,
                Err(e) => {
                    error!(error = %e, "inference worker launch failed, not retrying");
                    counter!(WORKER_LAUNCH_FAILURES_TOTAL, "kind" => e.error_kind()).increment(1);
                    self.set_state(WorkerState::Stopped);
                    return SupervisorExit::LaunchFailed(e);
                }
            };
            let _ = self.launches.fetch_add(1, Ordering::Relaxed);
            self.set_state(WorkerState::Running);
            info!(pid = ?child.id(), "inference worker started");

            let status = tokio::select! {
                status = child.wait() => status,
                () = shutdown.cancelled() => {
                    info!("stopping inference worker");
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "failed to kill inference worker");
                    }
                    self.set_state(WorkerState::Stopped);
                    return SupervisorExit::Cancelled;
                }
            };

            let failure = match status {
                Ok(status) if status.success() => {
                    info!("inference worker exited cleanly");
                    self.set_state(WorkerState::Stopped);
                    return SupervisorExit::CleanExit;
                }
                Ok(status) => crash_of(status),
                Err(e) => WorkerError::Wait(e),
            };

            let delay = self.config.restart_delay();
            warn!(
                error = %failure,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "inference worker crashed, restarting"
            );
            counter!(WORKER_RESTARTS_TOTAL).increment(1);
            self.set_state(WorkerState::Restarting);

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = shutdown.cancelled() => {
                    self.set_state(WorkerState::Stopped);
                    return SupervisorExit::Cancelled;
                }
            }
        }
    }

    fn launch(&self) -> Result<Child, WorkerError> {
        let mut cmd = Command::new(&self.config.program);
        if let Some(script) = self.config.resolved_script() {
            if !script.exists() {
                return Err(WorkerError::ScriptMissing(script));
            }
            let _ = cmd.arg(script);
        }
        let _ = cmd
            .args(&self.config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| WorkerError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;

        if let Some(stdout) = child.stdout.take() {
            let _ = tokio::spawn(forward_lines(stdout, OutputStream::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            let _ = tokio::spawn(forward_lines(stderr, OutputStream::Stderr));
        }
        Ok(child)
    }
}

fn crash_of(status: ExitStatus) -> WorkerError {
    WorkerError::Crash {
        code: status.code(),
    }
}

#[derive(Clone, Copy, Debug)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Mirror a child stream into the log, one event per line, until EOF.
///
/// Bytes that are not UTF-8 are logged lossily. The pipe is drained to the
/// end so the worker never writes into a closed stream. Returns the number
/// of lines forwarded.
async fn forward_lines<R>(reader: R, stream: OutputStream) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut forwarded = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = decode_line(&buf);
                match stream {
                    OutputStream::Stdout => info!(target: "worker", "{line}"),
                    OutputStream::Stderr => warn!(target: "worker", "{line}"),
                }
                forwarded += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!(?stream, error = %e, "worker output stream failed");
                break;
            }
        }
    }
    forwarded
}

/// One raw output line without its terminator.
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn shell(script: &str) -> WorkerConfig {
        WorkerConfig {
            enabled: true,
            program: "sh".into(),
            script: None,
            args: vec!["-c".into(), script.into()],
            restart_delay_ms: 20,
        }
    }

    #[test]
    fn initial_state_is_stopped() {
        let sup = WorkerSupervisor::new(shell("exit 0"));
        assert_eq!(sup.state(), WorkerState::Stopped);
        assert_eq!(sup.launches(), 0);
    }

    #[tokio::test]
    async fn clean_exit_does_not_restart() {
        let sup = WorkerSupervisor::new(shell("echo ready; exit 0"));
        let exit = tokio::time::timeout(Duration::from_secs(5), sup.run(CancellationToken::new()))
            .await
            .unwrap();
        assert!(matches!(exit, SupervisorExit::CleanExit));
        assert_eq!(sup.launches(), 1);
        assert_eq!(sup.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn crash_restarts_until_cancelled() {
        let sup = WorkerSupervisor::new(shell("echo boom >&2; exit 3"));
        let token = CancellationToken::new();
        let cancel = token.clone();
        let _ = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            cancel.cancel();
        });

        let exit = tokio::time::timeout(Duration::from_secs(5), sup.run(token))
            .await
            .unwrap();
        assert!(matches!(exit, SupervisorExit::Cancelled));
        assert!(sup.launches() >= 2, "expected restarts, got {}", sup.launches());
        assert_eq!(sup.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn missing_program_is_not_retried() {
        let config = WorkerConfig {
            program: "/nonexistent/relay-worker-interpreter".into(),
            script: None,
            ..WorkerConfig::default()
        };
        let sup = WorkerSupervisor::new(config);
        let exit = sup.run(CancellationToken::new()).await;
        assert!(matches!(
            exit,
            SupervisorExit::LaunchFailed(WorkerError::Spawn { .. })
        ));
        assert_eq!(sup.launches(), 0);
        assert_eq!(sup.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn missing_script_is_not_retried() {
        let config = WorkerConfig {
            program: "sh".into(),
            script: Some(PathBuf::from("/nonexistent/ai_vision.py")),
            ..WorkerConfig::default()
        };
        let sup = WorkerSupervisor::new(config);
        let exit = sup.run(CancellationToken::new()).await;
        assert!(matches!(
            exit,
            SupervisorExit::LaunchFailed(WorkerError::ScriptMissing(_))
        ));
        assert_eq!(sup.launches(), 0);
    }

    #[tokio::test]
    async fn cancel_kills_running_worker() {
        let sup = WorkerSupervisor::new(shell("sleep 30"));
        let mut states = sup.subscribe();
        let token = CancellationToken::new();
        let cancel = token.clone();

        let watcher = tokio::spawn(async move {
            while *states.borrow_and_update() != WorkerState::Running {
                if states.changed().await.is_err() {
                    return;
                }
            }
            cancel.cancel();
        });

        let exit = tokio::time::timeout(Duration::from_secs(5), sup.run(token))
            .await
            .unwrap();
        watcher.await.unwrap();
        assert!(matches!(exit, SupervisorExit::Cancelled));
        assert_eq!(sup.launches(), 1);
        assert_eq!(sup.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn state_passes_through_restarting() {
        let sup = WorkerSupervisor::new(WorkerConfig {
            restart_delay_ms: 200,
            ..shell("exit 1")
        });
        let mut states = sup.subscribe();
        let token = CancellationToken::new();
        let cancel = token.clone();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            loop {
                let s = *states.borrow_and_update();
                if seen.last() != Some(&s) {
                    seen.push(s);
                }
                if s == WorkerState::Restarting {
                    cancel.cancel();
                    return seen;
                }
                if states.changed().await.is_err() {
                    return seen;
                }
            }
        });

        let exit = tokio::time::timeout(Duration::from_secs(5), sup.run(token))
            .await
            .unwrap();
        let seen = watcher.await.unwrap();
        assert!(matches!(exit, SupervisorExit::Cancelled));
        assert!(seen.contains(&WorkerState::Restarting));
        assert_eq!(sup.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn undecodable_output_keeps_pipe_open() {
        let sup = WorkerSupervisor::new(shell("printf '\\377\\n'; sleep 0.3; echo after; exit 0"));
        let exit = tokio::time::timeout(Duration::from_secs(5), sup.run(CancellationToken::new()))
            .await
            .unwrap();
        assert!(matches!(exit, SupervisorExit::CleanExit), "got {exit:?}");
        assert_eq!(sup.launches(), 1);
    }

    #[tokio::test]
    async fn forwarding_reads_past_invalid_utf8() {
        let raw: &[u8] = b"ready\n\xff\xfe\r\nafter\nno newline";
        assert_eq!(forward_lines(raw, OutputStream::Stdout).await, 4);
    }

    #[test]
    fn decode_line_strips_terminator_and_replaces_bad_bytes() {
        assert_eq!(decode_line(b"frame ok\r\n"), "frame ok");
        assert_eq!(decode_line(b"\xffx\n"), "\u{fffd}x");
        assert_eq!(decode_line(b"tail"), "tail");
    }

    #[tokio::test]
    async fn crash_waits_restart_delay_before_relaunch() {
        let delay = Duration::from_millis(300);
        let sup = WorkerSupervisor::new(WorkerConfig {
            restart_delay_ms: 300,
            ..shell("exit 2")
        });
        let mut states = sup.subscribe();
        let token = CancellationToken::new();
        let cancel = token.clone();

        let watcher = tokio::spawn(async move {
            let mut restarting_at = None;
            loop {
                let s = *states.borrow_and_update();
                match (s, restarting_at) {
                    (WorkerState::Restarting, None) => restarting_at = Some(std::time::Instant::now()),
                    (WorkerState::Starting | WorkerState::Running, Some(at)) => {
                        let gap = at.elapsed();
                        cancel.cancel();
                        return Some(gap);
                    }
                    _ => {}
                }
                if states.changed().await.is_err() {
                    return None;
                }
            }
        });

        let exit = tokio::time::timeout(Duration::from_secs(5), sup.run(token))
            .await
            .unwrap();
        let gap = watcher.await.unwrap().expect("worker was relaunched");
        assert!(matches!(exit, SupervisorExit::Cancelled));
        assert!(gap >= delay, "relaunched after {gap:?}, expected at least {delay:?}");
        assert_eq!(sup.launches(), 2);
    }
}
