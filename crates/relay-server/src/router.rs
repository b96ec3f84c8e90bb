//! Routing of inbound frames between roles.
//!
//! [`RelayContext`] bundles the registry, the state cache and the AI control
//! flag. Every operation takes `&mut self`, so whoever owns the context
//! serializes connect, message and close events.

use axum::extract::ws::Message;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use metrics::counter;
use relay_core::{
    is_jpeg, ConnectionId, Detection, Envelope, Inbound, MessageKind, Role, SendFailure,
    ServerMessage,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::StateCache;
use crate::connection::Connection;
use crate::control::AiControlFlag;
use crate::metrics::{
    FRAMES_REJECTED_TOTAL, FRAMES_RELAYED_TOTAL, MALFORMED_MESSAGES_TOTAL,
    MESSAGES_IGNORED_TOTAL, MESSAGES_ROUTED_TOTAL, SEND_FAILURES_TOTAL,
};
use crate::registry::ConnectionRegistry;

/// Outcome of one send attempt.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Destination connection.
    pub connection: ConnectionId,
    /// Destination role.
    pub role: Role,
    /// Whether the message was queued.
    pub result: Result<(), SendFailure>,
}

/// Every send attempted while handling one event.
#[derive(Clone, Debug, Default)]
pub struct DeliveryBatch {
    deliveries: Vec<Delivery>,
}

impl DeliveryBatch {
    /// Whether nothing was sent.
    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Number of attempted sends.
    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    /// All attempts, in send order.
    pub fn iter(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter()
    }

    /// Successful sends to connections of `role`.
    pub fn delivered_to(&self, role: Role) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.role == role && d.result.is_ok())
            .count()
    }

    /// Attempts that were dropped.
    pub fn failures(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(|d| d.result.is_err())
    }

    /// Send to one destination, recording the outcome. A failure is logged
    /// and counted; the destination is left alone.
    fn deliver(&mut self, conn: &Connection, message: Message) {
        let result = conn.send(message);
        if let Err(failure) = result {
            warn!(
                conn_id = %conn.id(),
                role = %conn.role(),
                reason = failure.kind(),
                "failed to deliver message"
            );
            counter!(SEND_FAILURES_TOTAL, "reason" => failure.kind()).increment(1);
        }
        self.deliveries.push(Delivery {
            connection: conn.id().clone(),
            role: conn.role(),
            result,
        });
    }
}

/// Registry, state cache and AI control flag of one relay.
#[derive(Debug, Default)]
pub struct RelayContext {
    registry: ConnectionRegistry,
    cache: StateCache,
    ai_control: AiControlFlag,
}

impl RelayContext {
    /// An empty relay with AI control disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live connections.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Last-known frame and robot status.
    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// Whether AI detections are forwarded to the robot.
    pub fn ai_control_enabled(&self) -> bool {
        self.ai_control.get()
    }

    /// Register a new connection.
    ///
    /// A singleton role announces itself to every UI. A UI is brought up to
    /// date from the state cache.
    pub fn connect(&mut self, conn: Connection) -> DeliveryBatch {
        let role = conn.role();
        let mut batch = DeliveryBatch::default();
        if role == Role::Unknown {
            info!(conn_id = %conn.id(), "connection without a known role, not registered");
            return batch;
        }

        let _ = self.registry.register(conn.clone());
        info!(conn_id = %conn.id(), role = %role, "client connected");

        if role.is_singleton() {
            self.push_connection_status(role, true, &mut batch);
        } else {
            for message in self.cache.ui_sync_messages(&self.registry.occupancy()) {
                batch.deliver(&conn, message);
            }
        }
        batch
    }

    /// Deregister a closed connection. UIs hear about a singleton going
    /// away only if it was still the registered one.
    pub fn disconnect(&mut self, conn: &Connection) -> DeliveryBatch {
        let role = conn.role();
        let mut batch = DeliveryBatch::default();
        let removed = self.registry.deregister(conn);
        info!(conn_id = %conn.id(), role = %role, removed, "client disconnected");
        if removed && role.is_singleton() {
            self.push_connection_status(role, false, &mut batch);
        }
        batch
    }

    /// Route one classified frame from `sender`.
    pub fn route(&mut self, inbound: Inbound, sender: Role) -> DeliveryBatch {
        self.route_at(inbound, sender, Utc::now())
    }

    /// Route one classified frame from `sender`, stamping envelopes with
    /// `now` when they carry no timestamp.
    pub fn route_at(&mut self, inbound: Inbound, sender: Role, now: DateTime<Utc>) -> DeliveryBatch {
        match inbound {
            Inbound::Binary(data) => self.route_frame(data, sender),
            Inbound::Text(envelope) => self.route_envelope(envelope, sender, now),
            Inbound::Malformed(e) => {
                warn!(role = %sender, reason = e.kind(), error = %e, "dropping malformed message");
                counter!(MALFORMED_MESSAGES_TOTAL, "reason" => e.kind()).increment(1);
                DeliveryBatch::default()
            }
        }
    }

    fn route_frame(&mut self, data: Bytes, sender: Role) -> DeliveryBatch {
        let mut batch = DeliveryBatch::default();
        if sender != Role::Camera {
            debug!(role = %sender, len = data.len(), "ignoring binary frame from non-camera");
            counter!(FRAMES_REJECTED_TOTAL, "role" => sender.as_str()).increment(1);
            return batch;
        }

        if !is_jpeg(&data) {
            debug!(len = data.len(), "camera frame without JPEG marker");
        }
        self.cache.set_frame(data.clone());
        for ui in self.registry.ui() {
            batch.deliver(ui, Message::Binary(data.clone()));
        }
        if let Some(ai) = self.registry.open_singleton(Role::Ai) {
            batch.deliver(ai, Message::Binary(data));
        }
        counter!(FRAMES_RELAYED_TOTAL).increment(1);
        batch
    }

    fn route_envelope(&mut self, mut envelope: Envelope, sender: Role, now: DateTime<Utc>) -> DeliveryBatch {
        let mut batch = DeliveryBatch::default();
        envelope.stamp(sender, now);
        let kind = envelope.kind();

        match (sender, &kind) {
            (Role::Camera, MessageKind::FrameMetadata) => {
                let Some(text) = encode(&envelope) else {
                    return batch;
                };
                self.broadcast_ui(&text, &mut batch);
                self.forward_ai(&text, &mut batch);
            }
            (Role::Ai, MessageKind::Detection) => {
                let detections = match envelope.detections() {
                    Ok(d) => {
                        let top = d.first().and_then(Detection::from_value);
                        debug!(
                            count = d.len(),
                            top = top.as_ref().map(Detection::label),
                            "detection from ai"
                        );
                        Value::Array(d.clone())
                    }
                    Err(e) => {
                        warn!(role = %sender, reason = e.kind(), "dropping detection without detections");
                        counter!(MALFORMED_MESSAGES_TOTAL, "reason" => e.kind()).increment(1);
                        return batch;
                    }
                };
                let Some(text) = encode(&envelope) else {
                    return batch;
                };
                self.broadcast_ui(&text, &mut batch);

                if self.ai_control.get() {
                    if let Some(robot) = self.registry.open_singleton(Role::Robot) {
                        let republish = ServerMessage::AiDetection {
                            detections,
                            timestamp: envelope.get("timestamp").cloned().unwrap_or(Value::Null),
                        };
                        match republish.to_json() {
                            Ok(json) => batch.deliver(robot, Message::Text(json.into())),
                            Err(e) => warn!(error = %e, "failed to serialize ai_detection"),
                        }
                    }
                }
            }
            (_, MessageKind::AiControl) => {
                let enabled = envelope.enabled();
                let previous = self.ai_control.set(enabled);
                info!(role = %sender, enabled, previous, "ai control updated");
                if let Some(ai) = self.registry.open_singleton(Role::Ai) {
                    match (ServerMessage::ControlStatus { enabled }).to_json() {
                        Ok(json) => batch.deliver(ai, Message::Text(json.into())),
                        Err(e) => warn!(error = %e, "failed to serialize control_status"),
                    }
                }
            }
            (Role::Robot, MessageKind::RobotStatus) => {
                let Some(text) = encode(&envelope) else {
                    return batch;
                };
                self.cache.set_robot_status(envelope);
                self.broadcast_ui(&text, &mut batch);
                self.forward_ai(&text, &mut batch);
            }
            _ => {
                debug!(role = %sender, msg_type = envelope.type_str(), "no route for message");
                counter!(MESSAGES_IGNORED_TOTAL, "role" => sender.as_str()).increment(1);
                return batch;
            }
        }

        counter!(MESSAGES_ROUTED_TOTAL, "type" => kind_label(&kind)).increment(1);
        batch
    }

    fn broadcast_ui(&self, text: &str, batch: &mut DeliveryBatch) {
        let message = Message::Text(text.into());
        for ui in self.registry.ui() {
            batch.deliver(ui, message.clone());
        }
    }

    fn forward_ai(&self, text: &str, batch: &mut DeliveryBatch) {
        if let Some(ai) = self.registry.open_singleton(Role::Ai) {
            batch.deliver(ai, Message::Text(text.into()));
        }
    }

    fn push_connection_status(&self, device: Role, connected: bool, batch: &mut DeliveryBatch) {
        match ServerMessage::connection_status(device, connected).to_json() {
            Ok(json) => self.broadcast_ui(&json, batch),
            Err(e) => warn!(device = %device, error = %e, "failed to serialize connection status"),
        }
    }
}

fn encode(envelope: &Envelope) -> Option<String> {
    match envelope.to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(msg_type = envelope.type_str(), error = %e, "failed to serialize envelope");
            None
        }
    }
}

fn kind_label(kind: &MessageKind) -> &'static str {
    match kind {
        MessageKind::FrameMetadata => "frame_metadata",
        MessageKind::Detection => "detection",
        MessageKind::AiControl => "ai_control",
        MessageKind::RobotStatus => "robot_status",
        _ => "other",
    }
}
