//! Deterministic test harness for MLLP sessions.
//!
//! Implementations of the core `Environment`, `Transport` and `Telemetry`
//! traits for reproducible tests:
//!
//! - [`SimEnv`]: clocks driven by tokio's (pausable) timer
//! - [`ScriptedTransport`]: in-memory transport replaying scripted connect
//!   outcomes and reads, recording everything the session does
//! - [`TurmoilTransport`] and [`Responder`]: client and server over turmoil's
//!   simulated network
//! - [`RecordingTelemetry`]: captures emitted events for assertions

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod recording;
pub mod scripted;
pub mod sim_env;
pub mod sim_server;
pub mod sim_transport;

pub use recording::RecordingTelemetry;
pub use scripted::{ScriptedRead, ScriptedTransport};
pub use sim_env::SimEnv;
pub use sim_server::Responder;
pub use sim_transport::TurmoilTransport;
