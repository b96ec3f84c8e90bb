//! Last-known state replayed to UIs that join late.

use axum::extract::ws::Message;
use bytes::Bytes;
use relay_core::{Envelope, Role, ServerMessage};
use tracing::warn;

use crate::registry::Occupancy;

/// Latest camera frame and robot status.
#[derive(Debug, Default)]
pub struct StateCache {
    latest_frame: Option<Bytes>,
    latest_robot_status: Option<Envelope>,
}

impl StateCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached frame.
    pub fn set_frame(&mut self, frame: Bytes) {
        self.latest_frame = Some(frame);
    }

    /// Replace the cached robot status.
    pub fn set_robot_status(&mut self, status: Envelope) {
        self.latest_robot_status = Some(status);
    }

    /// The most recent camera frame.
    pub fn latest_frame(&self) -> Option<&Bytes> {
        self.latest_frame.as_ref()
    }

    /// The most recent `robot_status` envelope.
    pub fn latest_robot_status(&self) -> Option<&Envelope> {
        self.latest_robot_status.as_ref()
    }

    /// Messages a newly connected UI receives, in order: connection status
    /// for robot, camera and AI; the last robot status; the last frame.
    pub fn ui_sync_messages(&self, occupancy: &Occupancy) -> Vec<Message> {
        let mut out = Vec::with_capacity(Role::SINGLETONS.len() + 2);
        for role in Role::SINGLETONS {
            let status = ServerMessage::connection_status(role, occupancy.is_connected(role));
            match status.to_json() {
                Ok(json) => out.push(Message::Text(json.into())),
                Err(e) => warn!(device = %role, error = %e, "failed to serialize connection status"),
            }
        }
        if let Some(status) = &self.latest_robot_status {
            match status.to_json() {
                Ok(json) => out.push(Message::Text(json.into())),
                Err(e) => warn!(error = %e, "failed to serialize cached robot status"),
            }
        }
        if let Some(frame) = &self.latest_frame {
            out.push(Message::Binary(frame.clone()));
        }
        out
    }
}
