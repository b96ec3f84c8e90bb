//! # relay-worker
//!
//! Launches the inference worker, mirrors its output into the log, and
//! restarts it after abnormal exits. The worker talks to the relay over a
//! normal `ai` WebSocket connection; this crate only owns its lifecycle.

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod metrics;
pub mod supervisor;

pub use config::WorkerConfig;
pub use errors::WorkerError;
pub use supervisor::{SupervisorExit, WorkerState, WorkerSupervisor};
