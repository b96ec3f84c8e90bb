//! Messages the hub originates itself.

use serde::Serialize;
use serde_json::Value;

use crate::role::Role;

/// Link state reported in `connection_status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Link is up.
    Connected,
    /// Link is down.
    Disconnected,
}

impl LinkStatus {
    /// Map a presence flag to a status.
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

/// Hub-originated JSON, tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Pushed to UIs when a singleton role connects or disconnects.
    ConnectionStatus {
        /// The singleton role whose link changed.
        device: Role,
        /// New link state.
        status: LinkStatus,
    },
    /// Tells the inference worker whether its detections drive the robot.
    ControlStatus {
        /// Current AI control flag.
        enabled: bool,
    },
    /// Filtered republish of a detection for the robot. Carries nothing
    /// but the detections and their timestamp.
    AiDetection {
        /// The `detections` array, untouched.
        detections: Value,
        /// Timestamp of the source message.
        timestamp: Value,
    },
}

impl ServerMessage {
    /// A `connection_status` message for `device`.
    pub fn connection_status(device: Role, connected: bool) -> Self {
        Self::ConnectionStatus {
            device,
            status: LinkStatus::from_connected(connected),
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connection_status_shape() {
        let msg = ServerMessage::connection_status(Role::Camera, true);
        let v: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            v,
            json!({"type": "connection_status", "device": "camera", "status": "connected"})
        );
    }

    #[test]
    fn disconnected_status() {
        let msg = ServerMessage::connection_status(Role::Robot, false);
        let v: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(v["status"], "disconnected");
        assert_eq!(v["device"], "robot");
    }

    #[test]
    fn control_status_shape() {
        let v: Value =
            serde_json::from_str(&ServerMessage::ControlStatus { enabled: true }.to_json().unwrap())
                .unwrap();
        assert_eq!(v, json!({"type": "control_status", "enabled": true}));
    }

    #[test]
    fn ai_detection_has_only_three_keys() {
        let msg = ServerMessage::AiDetection {
            detections: json!([{"color": "red"}]),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        };
        let v: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["type"], "ai_detection");
        assert_eq!(obj["detections"][0]["color"], "red");
    }
}
