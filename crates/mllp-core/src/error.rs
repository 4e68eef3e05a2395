//! Client error classifier.
//!
//! Every failure a caller sees is a [`ClientError`]: where it happened
//! ([`ErrorContext`]), what the transport or protocol reported
//! ([`ErrorReason`]), and a human-readable message derived from the reason.
//! The message is descriptive only; callers branch on `context` and
//! `reason`.

use std::{fmt, io};

use thiserror::Error;

/// Phase of the session in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorContext {
    /// Establishing the transport connection.
    Connect,
    /// Writing a framed request.
    Send,
    /// Reading or validating the framed reply.
    Receive,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Send => "send",
            Self::Receive => "receive",
        };
        f.write_str(name)
    }
}

/// Raw signal behind a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReason {
    /// The peer closed the connection, or there is no connection.
    Closed,
    /// A connect or reply deadline elapsed.
    Timeout,
    /// The reply did not begin with the MLLP start marker.
    InvalidReply,
    /// The session was stopped before the request could be served.
    Stopped,
    /// Low-level I/O failure reported by the transport.
    Io {
        /// Kind reported by the operating system or runtime.
        kind: io::ErrorKind,
        /// Transport's own description.
        detail: String,
    },
    /// TLS configuration or handshake failure.
    Tls(String),
}

impl ErrorReason {
    /// Classify an I/O error.
    ///
    /// Timeouts and unexpected EOF collapse into [`Self::Timeout`] and
    /// [`Self::Closed`]; everything else keeps the kind and the text.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Self::Timeout,
            io::ErrorKind::UnexpectedEof => Self::Closed,
            kind => Self::Io { kind, detail: err.to_string() },
        }
    }

    /// Human-readable description.
    pub fn describe(&self) -> String {
        match self {
            Self::Closed => "connection closed".to_string(),
            Self::Timeout => "timed out".to_string(),
            Self::InvalidReply => "invalid header received in server acknowledgment".to_string(),
            Self::Stopped => "session stopped".to_string(),
            Self::Io { detail, .. } => detail.clone(),
            Self::Tls(detail) => format!("tls: {detail}"),
        }
    }
}

impl From<io::Error> for ErrorReason {
    fn from(err: io::Error) -> Self {
        Self::from_io(&err)
    }
}

/// Structured error returned by every client operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context} failed: {message}")]
pub struct ClientError {
    /// Phase in which the failure occurred.
    pub context: ErrorContext,
    /// Underlying signal.
    pub reason: ErrorReason,
    /// Description derived from `reason`.
    pub message: String,
}

impl ClientError {
    /// Build an error, deriving the message from the reason.
    pub fn new(context: ErrorContext, reason: ErrorReason) -> Self {
        let message = reason.describe();
        Self { context, reason, message }
    }

    /// Connect-phase error.
    pub fn connect(reason: ErrorReason) -> Self {
        Self::new(ErrorContext::Connect, reason)
    }

    /// Send-phase error.
    pub fn send(reason: ErrorReason) -> Self {
        Self::new(ErrorContext::Send, reason)
    }

    /// Receive-phase error.
    pub fn receive(reason: ErrorReason) -> Self {
        Self::new(ErrorContext::Receive, reason)
    }

    /// True if the reply deadline (or connect deadline) elapsed.
    pub fn is_timeout(&self) -> bool {
        self.reason == ErrorReason::Timeout
    }
}
