//! Reassembly from arbitrary chunks: once the buffer is invalid it stays
//! invalid, and the first complete prefix is the only frame boundary seen.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mllp_proto::{FrameStatus, inspect};

fuzz_target!(|input: (Vec<u8>, Vec<u8>)| {
    let (data, cuts) = input;
    let mut buf = Vec::with_capacity(data.len());
    let mut rest = &data[..];
    let mut cuts = cuts.into_iter();

    while !rest.is_empty() {
        let take = usize::from(cuts.next().unwrap_or(u8::MAX)).clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(take);
        buf.extend_from_slice(chunk);
        rest = tail;

        match inspect(&buf) {
            FrameStatus::Complete | FrameStatus::Invalid => {
                let bad_start = inspect(&buf[..1]) == FrameStatus::Invalid;
                assert_eq!(bad_start, inspect(&buf) == FrameStatus::Invalid);
                return;
            },
            FrameStatus::Incomplete => {},
        }
    }
});
