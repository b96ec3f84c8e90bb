//! `/health` endpoint body.

use std::time::Instant;

use serde::Serialize;

use crate::registry::Occupancy;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Which roles are connected.
    pub connections: Occupancy,
    /// Whether AI detections drive the robot.
    pub ai_control_enabled: bool,
}

/// Build the health body from a relay snapshot.
pub fn health_check(start_time: Instant, connections: Occupancy, ai_control_enabled: bool) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        ai_control_enabled,
    }
}
