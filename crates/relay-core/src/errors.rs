//! Decode and delivery failures.

/// A text payload that could not be decoded into an [`Envelope`](crate::Envelope).
///
/// Logged and dropped; never reported back to the sender.
#[derive(Debug, thiserror::Error)]
pub enum MalformedMessage {
    /// Not parseable as JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// Valid JSON, but not an object. Carries the JSON kind.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    /// No `type` field, or one that is not a string.
    #[error("missing string `type` field")]
    MissingType,
    /// A `detection` without a `detections` array.
    #[error("`detections` must be an array")]
    InvalidDetections,
}

impl MalformedMessage {
    /// Short classification string for logging/metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::NotAnObject(_) => "not_an_object",
            Self::MissingType => "missing_type",
            Self::InvalidDetections => "invalid_detections",
        }
    }
}

/// A send to one destination connection failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SendFailure {
    /// The socket is gone.
    #[error("connection closed")]
    Closed,
    /// The outbound queue is at capacity.
    #[error("send queue full")]
    QueueFull,
}

impl SendFailure {
    /// Short label for logs and metrics.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::QueueFull => "queue_full",
        }
    }
}
