//! Process-wide shutdown: one token, then a bounded wait for named tasks.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// A background task the relay waits for on shutdown, such as the worker
/// supervisor.
pub type NamedTask = (&'static str, JoinHandle<()>);

/// Single cancellation point shared by the HTTP server, the relay loop and
/// the worker supervisor.
#[derive(Clone, Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// A coordinator with a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the shared token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the token. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token, then give `tasks` until a shared deadline to stop.
    ///
    /// Tasks still running at the deadline are aborted; their names are
    /// returned.
    pub async fn drain(&self, tasks: Vec<NamedTask>, timeout: Option<Duration>) -> Vec<&'static str> {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        self.shutdown();
        let names: Vec<_> = tasks.iter().map(|(name, _)| *name).collect();
        info!(
            tasks = ?names,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "draining relay tasks"
        );

        let deadline = tokio::time::Instant::now() + timeout;
        let mut abandoned = Vec::new();
        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => debug!(task = name, "task stopped"),
                Ok(Err(e)) => warn!(task = name, error = %e, "task ended abnormally"),
                Err(_) => {
                    handle.abort();
                    abandoned.push(name);
                }
            }
        }
        if !abandoned.is_empty() {
            warn!(tasks = ?abandoned, "tasks did not stop in time, aborted");
        }
        abandoned
    }
}
