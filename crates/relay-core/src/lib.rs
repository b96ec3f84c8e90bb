//! # relay-core
//!
//! Wire-level vocabulary shared by the relay hub:
//!
//! - [`Role`]: the category a connection declares at handshake time
//! - [`Envelope`]: a decoded JSON message with a `type` discriminator
//! - [`classify`]: turns a raw transport frame into [`Inbound`] exactly once
//! - [`ServerMessage`]: messages the hub originates itself

#![deny(unsafe_code)]

pub mod classify;
pub mod detection;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod messages;
pub mod role;

pub use classify::{classify, is_jpeg, Inbound, RawFrame, JPEG_SOI};
pub use detection::{BoundingBox, Detection, Point};
pub use envelope::{iso_timestamp, Envelope, MessageKind};
pub use errors::{MalformedMessage, SendFailure};
pub use ids::ConnectionId;
pub use messages::{LinkStatus, ServerMessage};
pub use role::Role;
