//! The AI control flag.

/// Whether AI detections are forwarded to the robot.
///
/// Off at startup. Any client may flip it with an `ai_control` message; the
/// last write wins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AiControlFlag {
    enabled: bool,
}

impl AiControlFlag {
    /// Starts disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    pub fn get(&self) -> bool {
        self.enabled
    }

    /// Set the flag and return the previous value.
    pub fn set(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.enabled, enabled)
    }
}
