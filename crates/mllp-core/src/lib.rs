//! MLLP client core logic
//!
//! Protocol logic for a persistent MLLP client, decoupled from any specific
//! runtime or socket type.
//!
//! # Architecture
//!
//! The connection lifecycle is a deterministic state machine. Transitions
//! return declarative [`session::SessionAction`]s (connect, close, arm or
//! cancel a reconnect timer, publish a status change) and a runtime is
//! responsible for executing them. The runtime owns the transport handle and
//! feeds the outcome of each action back into the state machine.
//!
//! The transaction engine is the one piece that performs I/O itself, but it
//! does so only through the [`transport::Transport`] trait and reads time
//! only through [`env::Environment`], so it runs identically against real
//! sockets, scripted transports and simulated networks.
//!
//! # Components
//!
//! - [`session`]: Connection lifecycle state machine
//! - [`backoff`]: Reconnect delay policy and single-timer bookkeeping
//! - [`budget`]: Reply deadline arithmetic across partial reads
//! - [`transaction`]: Framed send/receive engine
//! - [`error`]: Client error classifier
//! - [`config`]: Session configuration
//! - [`mod@env`]: Environment abstraction (clocks, sleeping)
//! - [`transport`]: Transport abstraction
//! - [`telemetry`]: Status event sink
//! - [`verifier`]: Acknowledgment verification seam

pub mod backoff;
pub mod budget;
pub mod config;
pub mod env;
pub mod error;
pub mod session;
pub mod telemetry;
pub mod transaction;
pub mod transport;
pub mod verifier;

pub use config::{ReplyTimeout, SessionConfig};
pub use error::{ClientError, ErrorContext, ErrorReason};
pub use session::{Session, SessionAction, SessionState};
