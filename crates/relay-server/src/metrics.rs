//! Prometheus recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder.
///
/// Call once at startup, before anything is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Camera frames relayed (counter).
pub const FRAMES_RELAYED_TOTAL: &str = "relay_frames_relayed_total";
/// Binary frames dropped because the sender was not the camera (counter, labels: role).
pub const FRAMES_REJECTED_TOTAL: &str = "relay_frames_rejected_total";
/// Text messages routed (counter, labels: type).
pub const MESSAGES_ROUTED_TOTAL: &str = "relay_messages_routed_total";
/// Text messages with no route (counter, labels: role).
pub const MESSAGES_IGNORED_TOTAL: &str = "relay_messages_ignored_total";
/// Malformed text messages (counter, labels: reason).
pub const MALFORMED_MESSAGES_TOTAL: &str = "relay_malformed_messages_total";
/// Per-destination send failures (counter, labels: reason).
pub const SEND_FAILURES_TOTAL: &str = "relay_send_failures_total";
/// WebSocket connections opened (counter, labels: role).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_global_install() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = handle.render();
        assert!(output.is_empty() || output.contains('\n'));
    }

    #[test]
    fn metric_names_are_snake_case() {
        let names = [
            FRAMES_RELAYED_TOTAL,
            FRAMES_REJECTED_TOTAL,
            MESSAGES_ROUTED_TOTAL,
            MESSAGES_IGNORED_TOTAL,
            MALFORMED_MESSAGES_TOTAL,
            SEND_FAILURES_TOTAL,
            WS_CONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
