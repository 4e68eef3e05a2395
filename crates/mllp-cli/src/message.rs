//! Message text handling.
//!
//! HL7 v2 separates segments with a carriage return. Files edited by hand
//! usually carry `\n` or `\r\n` instead, so outgoing text is normalised and
//! replies are shown one segment per line.

use bytes::{BufMut, Bytes, BytesMut};

/// Rewrite line endings to `\r`, dropping blank lines. Every segment,
/// including the last, ends in `\r`.
pub fn normalize(input: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(input.len() + 1);
    for segment in input.split(|&b| b == b'\n' || b == b'\r') {
        if segment.is_empty() {
            continue;
        }
        out.put_slice(segment);
        out.put_u8(b'\r');
    }
    out.freeze()
}

/// Render reply content for a terminal: one segment per line, no trailing
/// line break.
pub fn display(reply: &[u8]) -> String {
    String::from_utf8_lossy(reply).trim_end_matches(['\r', '\n']).replace('\r', "\n")
}
