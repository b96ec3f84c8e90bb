//! Decoded JSON messages.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::MalformedMessage;
use crate::role::Role;

/// The `type` discriminator of an [`Envelope`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Camera-side metadata for the current frame.
    FrameMetadata,
    /// Detections from the inference worker.
    Detection,
    /// Legacy alias clients still understand; also what the robot receives.
    AiDetection,
    /// UI toggle for AI control of the robot.
    AiControl,
    /// AI control state pushed to the worker.
    ControlStatus,
    /// Singleton presence pushed to UIs.
    ConnectionStatus,
    /// Camera capabilities announced at connect.
    CameraInfo,
    /// Telemetry from the robot.
    RobotStatus,
    /// Manual drive command from a UI. Not relayed.
    RobotCommand,
    /// Any other `type` value.
    Other(String),
}

impl MessageKind {
    /// Map a `type` string to its kind.
    pub fn parse(s: &str) -> Self {
        match s {
            "frame_metadata" => Self::FrameMetadata,
            "detection" => Self::Detection,
            "ai_detection" => Self::AiDetection,
            "ai_control" => Self::AiControl,
            "control_status" => Self::ControlStatus,
            "connection_status" => Self::ConnectionStatus,
            "camera_info" => Self::CameraInfo,
            "robot_status" => Self::RobotStatus,
            "robot_command" => Self::RobotCommand,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// A JSON object with at least a string `type` field.
///
/// Unknown fields are preserved verbatim so forwarding never loses data.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, MalformedMessage> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Accept a JSON object with a string `type` field.
    pub fn from_value(value: Value) -> Result<Self, MalformedMessage> {
        let fields = match value {
            Value::Object(map) => map,
            Value::Array(_) => return Err(MalformedMessage::NotAnObject("array")),
            Value::String(_) => return Err(MalformedMessage::NotAnObject("string")),
            Value::Number(_) => return Err(MalformedMessage::NotAnObject("number")),
            Value::Bool(_) => return Err(MalformedMessage::NotAnObject("boolean")),
            Value::Null => return Err(MalformedMessage::NotAnObject("null")),
        };
        if !fields.get("type").is_some_and(Value::is_string) {
            return Err(MalformedMessage::MissingType);
        }
        Ok(Self { fields })
    }

    /// The raw `type` string.
    pub fn type_str(&self) -> &str {
        self.fields
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The `type` discriminator.
    pub fn kind(&self) -> MessageKind {
        MessageKind::parse(self.type_str())
    }

    /// Raw field access.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The `timestamp` field, if it is a string.
    pub fn timestamp(&self) -> Option<&str> {
        self.fields.get("timestamp").and_then(Value::as_str)
    }

    /// The `detections` sequence of a detection envelope.
    pub fn detections(&self) -> Result<&Vec<Value>, MalformedMessage> {
        self.fields
            .get("detections")
            .and_then(Value::as_array)
            .ok_or(MalformedMessage::InvalidDetections)
    }

    /// The `enabled` flag of an `ai_control` envelope. Anything other than
    /// a JSON `true` reads as disabled.
    pub fn enabled(&self) -> bool {
        self.fields
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Add server-side metadata: `timestamp` defaults to `now` when missing
    /// or empty, `source` is always the sender's role.
    pub fn stamp(&mut self, source: Role, now: DateTime<Utc>) {
        let has_timestamp = match self.fields.get("timestamp") {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };
        if !has_timestamp {
            let _ = self
                .fields
                .insert("timestamp".into(), Value::String(iso_timestamp(now)));
        }
        let _ = self
            .fields
            .insert("source".into(), Value::String(source.as_str().into()));
    }

    /// Serialize back to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.fields)
    }

    /// The underlying JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
