//! Worker launch configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to launch the inference worker.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Launch the worker at startup.
    pub enabled: bool,
    /// Interpreter or executable (default `"python"`).
    pub program: String,
    /// Script passed as the first argument. Must exist when set. A relative
    /// path is looked up next to the relay executable first, then in the
    /// working directory.
    pub script: Option<PathBuf>,
    /// Extra arguments after the script.
    pub args: Vec<String>,
    /// Delay before relaunching after an abnormal exit.
    pub restart_delay_ms: u64,
}

impl WorkerConfig {
    /// Delay before relaunching after an abnormal exit.
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// The script path handed to the interpreter.
    pub fn resolved_script(&self) -> Option<PathBuf> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        self.script
            .as_deref()
            .map(|script| resolve_script(script, exe_dir.as_deref()))
    }
}

fn resolve_script(script: &Path, exe_dir: Option<&Path>) -> PathBuf {
    if script.is_relative() {
        if let Some(candidate) = exe_dir.map(|dir| dir.join(script)) {
            if candidate.exists() {
                return candidate;
            }
        }
    }
    script.to_path_buf()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "python".into(),
            script: Some(PathBuf::from("ai").join("ai_vision.py")),
            args: Vec::new(),
            restart_delay_ms: 5_000,
        }
    }
}
