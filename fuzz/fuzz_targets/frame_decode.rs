//! Frame inspection and unwrapping never panic, and agree with each other.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mllp_proto::{FrameStatus, inspect, unwrap, wrap};

fuzz_target!(|data: &[u8]| {
    match inspect(data) {
        FrameStatus::Complete => {
            let content = unwrap(data).unwrap();
            assert_eq!(&wrap(content)[..], data);
        },
        FrameStatus::Incomplete | FrameStatus::Invalid => assert!(unwrap(data).is_err()),
    }

    let framed = wrap(data);
    assert_eq!(inspect(&framed), FrameStatus::Complete);
});
