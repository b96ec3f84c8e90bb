//! Connection roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The category a connection declares with the `type` query parameter.
///
/// Fixed for the lifetime of the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The robot controller. At most one.
    Robot,
    /// The camera streamer. At most one.
    Camera,
    /// A browser UI. Any number.
    Ui,
    /// The inference worker. At most one.
    Ai,
    /// Missing or unrecognized `type`. Never registered.
    Unknown,
}

impl Role {
    /// Roles that occupy a single registry slot, in status-report order.
    pub const SINGLETONS: [Role; 3] = [Role::Robot, Role::Camera, Role::Ai];

    /// Resolve the handshake query value. Absent or unrecognized values map
    /// to [`Role::Unknown`].
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("robot") => Self::Robot,
            Some("camera") => Self::Camera,
            Some("ui") => Self::Ui,
            Some("ai") => Self::Ai,
            _ => Self::Unknown,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Robot => "robot",
            Self::Camera => "camera",
            Self::Ui => "ui",
            Self::Ai => "ai",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the role occupies a single registry slot.
    pub fn is_singleton(self) -> bool {
        matches!(self, Self::Robot | Self::Camera | Self::Ai)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
