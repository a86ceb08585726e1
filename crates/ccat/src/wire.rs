//! # Wire Format
//!
//! Header layouts for the two packet kinds the codec produces and
//! consumes. The codec does no field compression — the host composes the
//! actual datagram framing around these — but the layouts here are the
//! reference serialization. All multi-byte integers are little-endian.
//!
//! ## Original packet (10-byte header)
//!
//! ```text
//! +----------------+--------------+------------------+
//! | sequence (u64) | length (u16) | payload          |
//! +----------------+--------------+------------------+
//! ```
//!
//! ## Recovery packet (12-byte header)
//!
//! ```text
//! +----------------------+-----------+----------+--------------+---------+
//! | sequence_start (u64) | count(u8) | row (u8) | length (u16) | payload |
//! +----------------------+-----------+----------+--------------+---------+
//! ```
//!
//! Length fields store `length − 1` so the full 65536-byte payload fits in
//! 16 bits; a stored value of 0 means 1 byte.
//!
//! A recovery payload is two bytes longer than its `length` field: every
//! original is mixed into the combination as its own 2-byte length prefix
//! followed by its data, so the receiver reconstructs exact payload sizes
//! along with the data. The prefix uses the same `length − 1` convention.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::cauchy::{MATRIX_COLUMN_COUNT, MATRIX_ROW_COUNT};

// ─── Constants ──────────────────────────────────────────────────────────────

/// Maximum payload size of a single original, in bytes.
pub const MAX_PACKET_SIZE: usize = 65536;

/// Bytes of length prefix mixed in front of each original inside a
/// recovery combination.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Serialized original header size: 8 (sequence) + 2 (length).
pub const ORIGINAL_HEADER_SIZE: usize = 10;

/// Serialized recovery header size: 8 (start) + 1 (count) + 1 (row) + 2 (length).
pub const RECOVERY_HEADER_SIZE: usize = 12;

/// Maximum originals a single recovery may cover. Count values above this
/// are reserved for application escape codes and rejected by `decode`.
pub const MAX_RECOVERY_COUNT: usize = MATRIX_COLUMN_COUNT;

/// Encode a payload length into the 2-byte prefix mixed into recoveries.
#[inline]
pub fn encode_length_prefix(len: usize) -> [u8; 2] {
    debug_assert!((1..=MAX_PACKET_SIZE).contains(&len));
    ((len - 1) as u16).to_le_bytes()
}

/// Decode a recovered 2-byte prefix back into a payload length.
#[inline]
pub fn decode_length_prefix(prefix: [u8; 2]) -> usize {
    u16::from_le_bytes(prefix) as usize + 1
}

// ─── OriginalPacket ─────────────────────────────────────────────────────────

/// An application original as the codec sees it: the sequence the
/// application assigned (never rewritten) plus the payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPacket {
    /// Application-assigned monotonic sequence number.
    pub sequence: u64,
    /// Payload, 1..=65536 bytes.
    pub payload: Bytes,
}

impl OriginalPacket {
    /// Encode header + payload into a buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.sequence);
        buf.put_u16_le((self.payload.len() - 1) as u16);
        buf.extend_from_slice(&self.payload);
    }

    /// Decode from a buffer. Returns `None` on truncation.
    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < ORIGINAL_HEADER_SIZE {
            return None;
        }
        let sequence = buf.get_u64_le();
        let len = buf.get_u16_le() as usize + 1;
        if buf.remaining() < len {
            return None;
        }
        Some(OriginalPacket {
            sequence,
            payload: buf.copy_to_bytes(len),
        })
    }

    /// Total serialized size.
    pub fn encoded_len(&self) -> usize {
        ORIGINAL_HEADER_SIZE + self.payload.len()
    }
}

// ─── RecoveryPacket ─────────────────────────────────────────────────────────

/// A recovery packet: a GF(256) linear combination of the `count`
/// originals starting at `sequence_start`, using coefficient row `row` of
/// the Cauchy matrix. Row 0 is a plain XOR of its window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPacket {
    /// First covered sequence.
    pub sequence_start: u64,
    /// Number of covered originals, 1..=192.
    pub count: u8,
    /// Cauchy matrix row, 0..=63.
    pub row: u8,
    /// The mixed combination: 2-byte length prefix region followed by
    /// `bytes()` data bytes.
    pub payload: Bytes,
}

impl RecoveryPacket {
    /// Maximum original payload length in the covered set (the wire
    /// `length` field). Two bytes shorter than the combination buffer.
    pub fn bytes(&self) -> usize {
        self.payload.len() - LENGTH_PREFIX_SIZE
    }

    /// Last covered sequence, or `None` if the span would wrap u64 (which
    /// a well-formed sender never produces).
    pub fn sequence_end(&self) -> Option<u64> {
        self.sequence_start.checked_add(self.count as u64 - 1)
    }

    /// Encode header + combination payload into a buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.sequence_start);
        buf.put_u8(self.count);
        buf.put_u8(self.row);
        buf.put_u16_le((self.bytes() - 1) as u16);
        buf.extend_from_slice(&self.payload);
    }

    /// Decode from a buffer. Returns `None` on truncation or when `count`
    /// or `row` fall in their reserved ranges.
    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < RECOVERY_HEADER_SIZE {
            return None;
        }
        let sequence_start = buf.get_u64_le();
        let count = buf.get_u8();
        let row = buf.get_u8();
        let bytes = buf.get_u16_le() as usize + 1;
        if count == 0 || count as usize > MAX_RECOVERY_COUNT {
            return None;
        }
        if row as usize >= MATRIX_ROW_COUNT {
            return None;
        }
        let payload_len = bytes + LENGTH_PREFIX_SIZE;
        if buf.remaining() < payload_len {
            return None;
        }
        Some(RecoveryPacket {
            sequence_start,
            count,
            row,
            payload: buf.copy_to_bytes(payload_len),
        })
    }

    /// Total serialized size.
    pub fn encoded_len(&self) -> usize {
        RECOVERY_HEADER_SIZE + self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefix_roundtrip_bounds() {
        for len in [1usize, 2, 255, 256, 65535, 65536] {
            assert_eq!(decode_length_prefix(encode_length_prefix(len)), len);
        }
    }

    #[test]
    fn original_roundtrip() {
        let pkt = OriginalPacket {
            sequence: 0xDEAD_BEEF_CAFE,
            payload: Bytes::from_static(b"hello"),
        };
        let mut buf = BytesMut::new();
        pkt.encode(&mut buf);
        assert_eq!(buf.len(), pkt.encoded_len());
        let decoded = OriginalPacket::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn original_single_byte_payload() {
        let pkt = OriginalPacket {
            sequence: 0,
            payload: Bytes::from_static(&[0x42]),
        };
        let mut buf = BytesMut::new();
        pkt.encode(&mut buf);
        // length field stores len - 1 == 0
        assert_eq!(&buf[8..10], &[0, 0]);
        let decoded = OriginalPacket::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.payload.len(), 1);
    }

    #[test]
    fn original_truncated_returns_none() {
        let pkt = OriginalPacket {
            sequence: 7,
            payload: Bytes::from_static(b"abcdef"),
        };
        let mut buf = BytesMut::new();
        pkt.encode(&mut buf);
        let full = buf.freeze();
        for cut in 0..full.len() {
            let mut partial = full.slice(..cut);
            assert!(OriginalPacket::decode(&mut partial).is_none(), "cut={cut}");
        }
    }

    #[test]
    fn recovery_roundtrip() {
        let pkt = RecoveryPacket {
            sequence_start: 1000,
            count: 10,
            row: 3,
            payload: Bytes::from(vec![0xAB; 8 + LENGTH_PREFIX_SIZE]),
        };
        let mut buf = BytesMut::new();
        pkt.encode(&mut buf);
        assert_eq!(buf.len(), pkt.encoded_len());
        let decoded = RecoveryPacket::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, pkt);
        assert_eq!(decoded.bytes(), 8);
        assert_eq!(decoded.sequence_end(), Some(1009));
    }

    #[test]
    fn recovery_reserved_count_rejected() {
        let pkt = RecoveryPacket {
            sequence_start: 0,
            count: 10,
            row: 0,
            payload: Bytes::from(vec![0u8; 4 + LENGTH_PREFIX_SIZE]),
        };
        let mut buf = BytesMut::new();
        pkt.encode(&mut buf);
        // Patch count to the reserved escape range (>= 193).
        buf[8] = 193;
        assert!(RecoveryPacket::decode(&mut buf.clone().freeze()).is_none());
        buf[8] = 0;
        assert!(RecoveryPacket::decode(&mut buf.freeze()).is_none());
    }

    #[test]
    fn recovery_reserved_row_rejected() {
        let pkt = RecoveryPacket {
            sequence_start: 0,
            count: 1,
            row: 0,
            payload: Bytes::from(vec![0u8; 4 + LENGTH_PREFIX_SIZE]),
        };
        let mut buf = BytesMut::new();
        pkt.encode(&mut buf);
        buf[9] = 64; // high bits reserved
        assert!(RecoveryPacket::decode(&mut buf.freeze()).is_none());
    }

    #[test]
    fn recovery_span_wrap_is_none() {
        let pkt = RecoveryPacket {
            sequence_start: u64::MAX,
            count: 2,
            row: 0,
            payload: Bytes::from(vec![0u8; 1 + LENGTH_PREFIX_SIZE]),
        };
        assert_eq!(pkt.sequence_end(), None);
    }
}
