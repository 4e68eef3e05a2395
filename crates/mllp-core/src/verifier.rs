//! Acknowledgment verification seam.
//!
//! The core never interprets message content. When a caller sends a
//! structured message instead of raw bytes, it supplies an [`AckVerifier`]
//! that judges the unwrapped reply against the message that was sent (for
//! HL7 v2, typically matching `MSA-2` to the sent `MSH-10` and reading the
//! acknowledgment code).

use bytes::Bytes;

/// A message that can be rendered to wire content.
pub trait OutboundMessage {
    /// Content bytes, without the MLLP envelope.
    fn to_bytes(&self) -> Bytes;
}

impl OutboundMessage for Bytes {
    fn to_bytes(&self) -> Bytes {
        self.clone()
    }
}

impl OutboundMessage for String {
    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

/// Judges a reply against the message that produced it.
pub trait AckVerifier<M: ?Sized> {
    /// Result of verification, returned to the caller in place of the raw
    /// reply.
    type Verdict;

    /// Inspect `reply` (unwrapped content) for the sent `message`.
    fn verify(&self, message: &M, reply: &[u8]) -> Self::Verdict;
}

impl<M: ?Sized, V, F> AckVerifier<M> for F
where
    F: Fn(&M, &[u8]) -> V,
{
    type Verdict = V;

    fn verify(&self, message: &M, reply: &[u8]) -> V {
        self(message, reply)
    }
}
