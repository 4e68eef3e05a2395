//! Wire envelope for the Minimal Lower Layer Protocol (MLLP).
//!
//! MLLP carries opaque message content (almost always HL7 v2) over a byte
//! stream by bracketing each message with a one-byte start marker and a
//! two-byte end sequence:
//!
//! ```text
//! 0x0B || content || 0x1C 0x0D
//! ```
//!
//! The content itself is never inspected here. A reader assembles bytes from
//! the stream until [`inspect`] reports [`FrameStatus::Complete`], then
//! strips the envelope with [`unwrap`].
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod frame;

pub use errors::{ProtocolError, Result};
pub use frame::{END_MARKER, FrameStatus, START_MARKER, inspect, unwrap, wrap};
