//! # Encoder Window
//!
//! Sender half of the codec. Keeps a sliding window of recent originals —
//! bounded by both packet count and wall-clock age — and builds recovery
//! packets over it on demand. Pure logic: the host owns pacing, framing,
//! and the socket.
//!
//! ## Responsibilities
//!
//! 1. **Window maintenance**: copy submitted originals into pooled slots,
//!    evict by age (`window_msec`) and by capacity (`window_packets`)
//! 2. **Recovery construction**: mix the live window into one combination
//!    using the next Cauchy row, cycling rows 0..64
//! 3. **Input validation**: payload size and sequence monotonicity
//!
//! A recovery packet covers exactly the originals in the window at build
//! time, so anything older than the window bound at emission time is never
//! covered by a later recovery.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::BytesMut;
use quanta::Instant;

use crate::cauchy::{self, MATRIX_COLUMN_COUNT, MATRIX_ROW_COUNT};
use crate::error::{CodecError, CodecResult};
use crate::gf256;
use crate::pool::{BufferAllocator, HeapAllocator};
use crate::stats::EncoderStats;
use crate::wire::{encode_length_prefix, RecoveryPacket, LENGTH_PREFIX_SIZE, MAX_PACKET_SIZE};

// ─── Configuration ──────────────────────────────────────────────────────────

/// Maximum encoder window size in packets.
pub const MAX_WINDOW_PACKETS: usize = MATRIX_COLUMN_COUNT;

/// Minimum window age bound in milliseconds.
pub const MIN_WINDOW_MSEC: u32 = 10;

/// Maximum window age bound in milliseconds.
pub const MAX_WINDOW_MSEC: u32 = 2_000_000_000;

/// Encoder configuration. The effective window bound at runtime is the
/// stricter of the two limits.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Maximum age of a windowed original in milliseconds, 10..=2·10⁹.
    pub window_msec: u32,
    /// Maximum originals in the window, 1..=192.
    pub window_packets: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            window_msec: 100,
            window_packets: MAX_WINDOW_PACKETS as u32,
        }
    }
}

impl EncoderConfig {
    fn validate(&self) -> CodecResult<()> {
        if !(MIN_WINDOW_MSEC..=MAX_WINDOW_MSEC).contains(&self.window_msec) {
            return Err(CodecError::InvalidInput);
        }
        if !(1..=MAX_WINDOW_PACKETS as u32).contains(&self.window_packets) {
            return Err(CodecError::InvalidInput);
        }
        Ok(())
    }
}

// ─── Encoder ────────────────────────────────────────────────────────────────

struct EncoderSlot {
    sequence: u64,
    payload: BytesMut,
    submitted_at: Instant,
}

/// Encoder state machine.
pub struct Encoder {
    config: EncoderConfig,
    window: VecDeque<EncoderSlot>,
    next_row: u8,
    next_sequence: Option<u64>,
    alloc: Box<dyn BufferAllocator + Send>,
    stats: EncoderStats,
    disabled: bool,
}

impl Encoder {
    /// Create an encoder with heap-backed buffers.
    pub fn new(config: EncoderConfig) -> CodecResult<Self> {
        Self::with_allocator(config, Box::new(HeapAllocator))
    }

    /// Create an encoder with a caller-provided buffer allocator.
    pub fn with_allocator(
        config: EncoderConfig,
        alloc: Box<dyn BufferAllocator + Send>,
    ) -> CodecResult<Self> {
        config.validate()?;
        Ok(Encoder {
            window: VecDeque::with_capacity(config.window_packets as usize),
            config,
            next_row: 0,
            next_sequence: None,
            alloc,
            stats: EncoderStats::new(),
            disabled: false,
        })
    }

    /// Submit an application original into the window.
    ///
    /// Sequences must be strictly increasing over the encoder's lifetime.
    /// A sequence gap clears the window first: a recovery's covered range
    /// is contiguous from its start, so it must never span originals the
    /// encoder did not see.
    pub fn submit_original(&mut self, sequence: u64, data: &[u8]) -> CodecResult<()> {
        if self.disabled {
            return Err(CodecError::Disabled);
        }
        if data.is_empty() || data.len() > MAX_PACKET_SIZE {
            return Err(CodecError::InvalidInput);
        }
        match self.next_sequence {
            Some(next) if sequence < next => return Err(CodecError::InvalidInput),
            Some(next) if sequence > next => {
                tracing::debug!(sequence, expected = next, "sequence gap, window reset");
                self.clear_window();
                self.stats.window_resets += 1;
            }
            _ => {}
        }

        let now = Instant::now();
        self.evict_aged(now);
        if self.window.len() >= self.config.window_packets as usize {
            if let Some(slot) = self.window.pop_front() {
                self.alloc.release(slot.payload);
                self.stats.evicted_by_capacity += 1;
            }
        }

        let mut payload = self
            .alloc
            .allocate(data.len())
            .ok_or(CodecError::OutOfMemory)?;
        payload.extend_from_slice(data);

        self.next_sequence = Some(sequence + 1);
        self.window.push_back(EncoderSlot {
            sequence,
            payload,
            submitted_at: now,
        });
        self.stats.originals_submitted += 1;
        self.stats.bytes_submitted += data.len() as u64;
        Ok(())
    }

    /// Build one recovery packet over the current window.
    ///
    /// The combination covers every live windowed original: each is mixed
    /// in as its 2-byte length prefix followed by its payload, scaled by
    /// the Cauchy coefficient for the next row. Row 0 is a plain XOR.
    pub fn build_recovery(&mut self) -> CodecResult<RecoveryPacket> {
        if self.disabled {
            return Err(CodecError::Disabled);
        }
        self.evict_aged(Instant::now());
        if self.window.is_empty() {
            return Err(CodecError::NotReady);
        }

        let count = self.window.len();
        let sequence_start = self.window[0].sequence;
        let row = self.next_row;
        let bytes = self
            .window
            .iter()
            .map(|s| s.payload.len())
            .max()
            .unwrap_or(0);

        let mut payload = self
            .alloc
            .allocate(LENGTH_PREFIX_SIZE + bytes)
            .ok_or(CodecError::OutOfMemory)?;
        payload.resize(LENGTH_PREFIX_SIZE + bytes, 0);

        for (k, slot) in self.window.iter().enumerate() {
            let coef = cauchy::element(row, k as u8);
            let prefix = encode_length_prefix(slot.payload.len());
            gf256::muladd_mem(&mut payload[..LENGTH_PREFIX_SIZE], coef, &prefix);
            gf256::muladd_mem(&mut payload[LENGTH_PREFIX_SIZE..], coef, &slot.payload);
        }

        self.next_row = (self.next_row + 1) % MATRIX_ROW_COUNT as u8;
        self.stats.recoveries_emitted += 1;

        Ok(RecoveryPacket {
            sequence_start,
            count: count as u8,
            row,
            payload: payload.freeze(),
        })
    }

    /// Originals currently in the window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Sequence of the oldest windowed original.
    pub fn oldest_sequence(&self) -> Option<u64> {
        self.window.front().map(|s| s.sequence)
    }

    /// The row the next recovery will use.
    pub fn next_row(&self) -> u8 {
        self.next_row
    }

    /// Current encoder statistics.
    pub fn stats(&self) -> &EncoderStats {
        &self.stats
    }

    /// Whether a prior fault has disabled this encoder.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    // ─── Internal helpers ───────────────────────────────────────────────

    fn evict_aged(&mut self, now: Instant) {
        let max_age = Duration::from_millis(self.config.window_msec as u64);
        while let Some(front) = self.window.front() {
            if now.duration_since(front.submitted_at) > max_age {
                let slot = self.window.pop_front().unwrap();
                self.alloc.release(slot.payload);
                self.stats.evicted_by_age += 1;
            } else {
                break;
            }
        }
    }

    fn clear_window(&mut self) {
        while let Some(slot) = self.window.pop_front() {
            self.alloc.release(slot.payload);
        }
    }
}
