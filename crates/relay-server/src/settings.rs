//! Settings: compiled defaults, then environment overrides.
//!
//! Environment variables:
//!
//! | Variable               | Field                   |
//! |------------------------|-------------------------|
//! | `PORT`                 | `server.port`           |
//! | `RELAY_HOST`           | `server.host`           |
//! | `RELAY_STATIC_DIR`     | `server.static_dir`     |
//! | `PYTHON_PATH`          | `worker.program`        |
//! | `AI_SCRIPT_PATH`       | `worker.script`         |
//! | `RELAY_WORKER_ENABLED` | `worker.enabled`        |
//!
//! Invalid values are ignored with a warning.

use std::path::PathBuf;

use relay_worker::WorkerConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ServerConfig;

/// Everything the binary configures.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// HTTP and WebSocket settings.
    pub server: ServerConfig,
    /// Inference worker settings.
    pub worker: WorkerConfig,
}

/// Defaults with the process environment applied.
pub fn load_settings() -> RelaySettings {
    let mut settings = RelaySettings::default();
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Apply overrides read through `lookup`. Empty values count as unset.
pub fn apply_env_overrides<F>(settings: &mut RelaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = read("PORT") {
        match parse_u16_range(&v, 1, 65535) {
            Some(port) => settings.server.port = port,
            None => warn!(key = "PORT", value = %v, "invalid port env var, ignoring"),
        }
    }
    if let Some(v) = read("RELAY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("RELAY_STATIC_DIR") {
        settings.server.static_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = read("PYTHON_PATH") {
        settings.worker.program = v;
    }
    if let Some(v) = read("AI_SCRIPT_PATH") {
        settings.worker.script = Some(PathBuf::from(v));
    }
    if let Some(v) = read("RELAY_WORKER_ENABLED") {
        match parse_bool(&v) {
            Some(enabled) => settings.worker.enabled = enabled,
            None => {
                warn!(key = "RELAY_WORKER_ENABLED", value = %v, "invalid boolean env var, ignoring");
            }
        }
    }
}

/// Accepts (case-insensitive) `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a number within `[min, max]`.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_env(pairs: &[(&str, &str)]) -> RelaySettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let mut settings = RelaySettings::default();
        apply_env_overrides(&mut settings, |k| env.get(k).cloned());
        settings
    }

    #[test]
    fn defaults_without_env() {
        let s = with_env(&[]);
        assert_eq!(s.server.port, 3000);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.worker.program, "python");
        assert_eq!(s.worker.script, Some(PathBuf::from("ai/ai_vision.py")));
        assert!(s.worker.enabled);
    }

    #[test]
    fn port_and_interpreter_overrides() {
        let s = with_env(&[("PORT", "8080"), ("PYTHON_PATH", "/usr/bin/python3")]);
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.worker.program, "/usr/bin/python3");
    }

    #[test]
    fn invalid_values_are_ignored() {
        let s = with_env(&[
            ("PORT", "not-a-port"),
            ("RELAY_WORKER_ENABLED", "maybe"),
        ]);
        assert_eq!(s.server.port, 3000);
        assert!(s.worker.enabled);

        assert_eq!(with_env(&[("PORT", "0")]).server.port, 3000);
        assert_eq!(with_env(&[("PORT", "70000")]).server.port, 3000);
    }

    #[test]
    fn empty_values_are_unset() {
        let s = with_env(&[("RELAY_HOST", ""), ("PYTHON_PATH", "")]);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.worker.program, "python");
    }

    #[test]
    fn paths_and_flags() {
        let s = with_env(&[
            ("AI_SCRIPT_PATH", "/opt/vision/run.py"),
            ("RELAY_STATIC_DIR", "/srv/ui"),
            ("RELAY_WORKER_ENABLED", "off"),
            ("RELAY_HOST", "127.0.0.1"),
        ]);
        assert_eq!(s.worker.script, Some(PathBuf::from("/opt/vision/run.py")));
        assert_eq!(s.server.static_dir, Some(PathBuf::from("/srv/ui")));
        assert!(!s.worker.enabled);
        assert_eq!(s.server.host, "127.0.0.1");
    }

    #[test]
    fn parse_bool_variants() {
        for t in ["true", "1", "YES", "On"] {
            assert_eq!(parse_bool(t), Some(true));
        }
        for f in ["false", "0", "no", "OFF"] {
            assert_eq!(parse_bool(f), Some(false));
        }
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn parse_u16_bounds() {
        assert_eq!(parse_u16_range("1", 1, 65535), Some(1));
        assert_eq!(parse_u16_range(" 443 ", 1, 65535), Some(443));
        assert_eq!(parse_u16_range("-1", 1, 65535), None);
    }
}
