//! Envelope errors.

use thiserror::Error;

/// Result alias for envelope operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while stripping the MLLP envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The first byte is not the start marker (or the buffer is empty).
    #[error("frame does not begin with start marker 0x0B")]
    MissingStartMarker,

    /// The buffer does not end with the `0x1C 0x0D` sequence.
    #[error("frame is not terminated by end sequence 0x1C 0x0D")]
    MissingEndMarker,
}
