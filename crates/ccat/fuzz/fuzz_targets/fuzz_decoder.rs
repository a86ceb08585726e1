#![no_main]

use ccat::decoder::Decoder;
use ccat::wire::{OriginalPacket, RecoveryPacket};
use libfuzzer_sys::fuzz_target;

/// Fuzz the decoder ingest path.
///
/// The input is interpreted as a stream of wire packets (originals and
/// recoveries interleaved by a tag byte). Whatever arrives, the decoder
/// must not panic; reconstructions may be garbage for garbage input, but
/// every drain must terminate and the decoder must stay internally
/// consistent (it may latch disabled, never corrupt).
fuzz_target!(|data: &[u8]| {
    let mut dec = Decoder::new();
    let mut buf = &data[..];

    while !buf.is_empty() {
        let tag = buf[0];
        buf = &buf[1..];
        if tag & 1 == 0 {
            match OriginalPacket::decode(&mut buf) {
                Some(pkt) => {
                    let _ = dec.accept_original(pkt.sequence, &pkt.payload);
                }
                None => break,
            }
        } else {
            match RecoveryPacket::decode(&mut buf) {
                Some(pkt) => {
                    let _ = dec.accept_recovery(pkt);
                }
                None => break,
            }
        }
        dec.drain_recovered().for_each(drop);
    }
});
