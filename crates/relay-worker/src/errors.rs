//! Worker errors.

use std::path::PathBuf;

/// Worker lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    // Launch failures: never retried
    /// The worker script does not exist.
    #[error("worker script not found at {}", .0.display())]
    ScriptMissing(PathBuf),
    /// The interpreter could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Interpreter that failed to start.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    // Post-launch failures: restarted after a delay
    /// Exit with a non-zero code, or by signal when `code` is `None`.
    #[error("worker exited abnormally (code {code:?})")]
    Crash {
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
    },
    /// Waiting on the child failed.
    #[error("failed to wait on worker: {0}")]
    Wait(#[source] std::io::Error),
}

impl WorkerError {
    /// Whether the supervisor should relaunch after this error.
    pub fn is_restartable(&self) -> bool {
        matches!(self, Self::Crash { .. } | Self::Wait(_))
    }

    /// Short label for logs and metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::ScriptMissing(_) => "script_missing",
            Self::Spawn { .. } => "spawn_failed",
            Self::Crash { .. } => "crash",
            Self::Wait(_) => "wait_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_failures_not_restartable() {
        let missing = WorkerError::ScriptMissing(PathBuf::from("ai/ai_vision.py"));
        let spawn = WorkerError::Spawn {
            program: "python".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(!missing.is_restartable());
        assert!(!spawn.is_restartable());
        assert!(missing.to_string().contains("ai/ai_vision.py"));
        assert!(spawn.to_string().contains("python"));
    }

    #[test]
    fn crash_is_restartable() {
        let crash = WorkerError::Crash { code: Some(1) };
        assert!(crash.is_restartable());
        assert_eq!(crash.error_kind(), "crash");
        assert_eq!(crash.to_string(), "worker exited abnormally (code Some(1))");
    }
}
