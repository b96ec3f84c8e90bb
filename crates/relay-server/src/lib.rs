//! # relay-server
//!
//! WebSocket relay between a robot, a camera, browser UIs and an inference
//! worker.
//!
//! - [`relay_loop`] owns all relay state and applies events in order
//! - [`router::RelayContext`] decides who receives what
//! - [`session`] moves bytes between a socket and the relay loop
//! - [`server::RelayServer`] binds the HTTP surface and serves it

#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod connection;
pub mod control;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod registry;
pub mod relay_loop;
pub mod router;
pub mod server;
pub mod session;
pub mod settings;
pub mod shutdown;

pub use config::ServerConfig;
pub use errors::{BindFailureKind, ServerError};
pub use relay_loop::{RelayEvent, RelayHandle, RelaySnapshot};
pub use router::{Delivery, DeliveryBatch, RelayContext};
pub use server::{build_router, AppState, RelayServer};
pub use settings::{load_settings, RelaySettings};
pub use shutdown::{NamedTask, ShutdownCoordinator};
