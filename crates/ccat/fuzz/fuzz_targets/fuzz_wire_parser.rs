#![no_main]

use ccat::wire::{OriginalPacket, RecoveryPacket};
use libfuzzer_sys::fuzz_target;

/// Fuzz the wire parsers.
///
/// Both decoders must never panic on any input — only return None for
/// invalid or truncated data — and any packet that decodes must survive a
/// re-encode/decode round trip unchanged.
fuzz_target!(|data: &[u8]| {
    // 1. Original decode — must not panic
    if let Some(pkt) = OriginalPacket::decode(&mut &data[..]) {
        let mut buf = bytes::BytesMut::new();
        pkt.encode(&mut buf);
        let redecoded = OriginalPacket::decode(&mut buf.freeze())
            .expect("re-encode/decode must succeed");
        assert_eq!(redecoded, pkt);
    }

    // 2. Recovery decode — must not panic
    if let Some(pkt) = RecoveryPacket::decode(&mut &data[..]) {
        assert!(pkt.count >= 1 && pkt.count <= 192);
        assert!(pkt.row <= 63);
        let mut buf = bytes::BytesMut::new();
        pkt.encode(&mut buf);
        let redecoded = RecoveryPacket::decode(&mut buf.freeze())
            .expect("re-encode/decode must succeed");
        assert_eq!(redecoded, pkt);
    }
});
