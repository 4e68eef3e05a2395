//! Frame construction and completeness checks.
//!
//! The completeness test is deliberately shape-only: a buffer is a complete
//! frame when it starts with [`START_MARKER`] and its last two bytes are
//! [`END_MARKER`]. Everything between is content, including nothing at all.
//! Content that happens to contain `0x1C 0x0D` in the middle is not treated
//! specially; the reader only ever tests the tail of what it has so far.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::{ProtocolError, Result};

/// Vertical tab. Opens every frame.
pub const START_MARKER: u8 = 0x0B;

/// File separator followed by carriage return. Closes every frame.
pub const END_MARKER: [u8; 2] = [0x1C, 0x0D];

/// Bytes of envelope added around the content.
const ENVELOPE_LEN: usize = 1 + END_MARKER.len();

/// Shape of a (possibly partial) frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Starts with the start marker and ends with the end sequence.
    Complete,
    /// Starts with the start marker (or is empty) but is not terminated yet.
    Incomplete,
    /// Does not start with the start marker. More bytes cannot fix this.
    Invalid,
}

/// Wrap `content` in the MLLP envelope.
pub fn wrap(content: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(content.len() + ENVELOPE_LEN);
    buf.put_u8(START_MARKER);
    buf.put_slice(content);
    buf.put_slice(&END_MARKER);
    buf.freeze()
}

/// Classify a buffer accumulated from the stream.
pub fn inspect(buf: &[u8]) -> FrameStatus {
    match buf.first() {
        None => FrameStatus::Incomplete,
        Some(&first) if first != START_MARKER => FrameStatus::Invalid,
        Some(_) if buf.len() >= ENVELOPE_LEN && buf.ends_with(&END_MARKER) => {
            FrameStatus::Complete
        },
        Some(_) => FrameStatus::Incomplete,
    }
}

/// Strip the envelope from a complete frame and return the content.
///
/// # Errors
///
/// - `MissingStartMarker` if the buffer is empty or starts with another byte
/// - `MissingEndMarker` if the buffer is not terminated
pub fn unwrap(frame: &[u8]) -> Result<&[u8]> {
    match inspect(frame) {
        FrameStatus::Complete => Ok(&frame[1..frame.len() - END_MARKER.len()]),
        FrameStatus::Invalid => Err(ProtocolError::MissingStartMarker),
        FrameStatus::Incomplete if frame.is_empty() => Err(ProtocolError::MissingStartMarker),
        FrameStatus::Incomplete => Err(ProtocolError::MissingEndMarker),
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn wrap_adds_envelope() {
        let framed = wrap(b"MSH|^~\\&");
        assert_eq!(framed.first(), Some(&START_MARKER));
        assert!(framed.ends_with(&END_MARKER));
        assert_eq!(framed.len(), 8 + 3);
    }

    #[test]
    fn empty_content_is_complete() {
        let framed = hex!("0b1c0d");
        assert_eq!(inspect(&framed), FrameStatus::Complete);
        assert_eq!(unwrap(&framed), Ok(&b""[..]));
    }

    #[test]
    fn partial_frames_are_incomplete() {
        assert_eq!(inspect(&[]), FrameStatus::Incomplete);
        assert_eq!(inspect(&hex!("0b")), FrameStatus::Incomplete);
        assert_eq!(inspect(&hex!("0b1c")), FrameStatus::Incomplete);
        assert_eq!(inspect(&hex!("0b41")), FrameStatus::Incomplete);
        assert_eq!(inspect(&hex!("0b411c")), FrameStatus::Incomplete);
    }

    #[test]
    fn wrong_first_byte_is_invalid() {
        assert_eq!(inspect(&hex!("41")), FrameStatus::Invalid);
        assert_eq!(inspect(&hex!("1c0d")), FrameStatus::Invalid);
        assert_eq!(inspect(&hex!("410b1c0d")), FrameStatus::Invalid);
    }

    #[test]
    fn unwrap_errors() {
        assert_eq!(unwrap(&[]), Err(ProtocolError::MissingStartMarker));
        assert_eq!(unwrap(&hex!("41421c0d")), Err(ProtocolError::MissingStartMarker));
        assert_eq!(unwrap(&hex!("0b4142")), Err(ProtocolError::MissingEndMarker));
    }

    #[test]
    fn chunked_frame_completes_on_last_chunk() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&hex!("0b41"));
        assert_eq!(inspect(&buf), FrameStatus::Incomplete);
        buf.extend_from_slice(&hex!("421c0d"));
        assert_eq!(inspect(&buf), FrameStatus::Complete);
        assert_eq!(unwrap(&buf), Ok(&b"AB"[..]));
    }

    proptest! {
        #[test]
        fn wrap_then_unwrap_is_identity(content in proptest::collection::vec(any::<u8>(), 0..512)) {
            let framed = wrap(&content);
            prop_assert_eq!(unwrap(&framed), Ok(content.as_slice()));
        }

        #[test]
        fn complete_iff_enveloped(buf in proptest::collection::vec(any::<u8>(), 0..64)) {
            let enveloped = buf.len() >= 3
                && buf[0] == START_MARKER
                && buf[buf.len() - 2..] == END_MARKER;
            prop_assert_eq!(inspect(&buf) == FrameStatus::Complete, enveloped);
        }
    }
}
