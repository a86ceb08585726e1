//! # Decoder Window
//!
//! Receiver half of the codec. Pure logic — no I/O. Tracks a ring of
//! recent sequences, deduplicates arrivals, buffers recovery packets
//! against the columns they still need, and drives the solver whenever an
//! arrival might close a gap.
//!
//! ## Responsibilities
//!
//! 1. **Window tracking**: 384-slot ring keyed by `sequence % 384`,
//!    advanced by the highest sequence observed; stale slots expire
//! 2. **Deduplication**: a sequence is accepted at most once, whether it
//!    arrives directly or is reconstructed
//! 3. **Recovery reduction**: strip known originals out of arriving
//!    recoveries so each buffered combination covers only unknowns
//! 4. **Solving**: single-unknown combinations resolve directly (the XOR
//!    fast path for row 0); joint systems go through Gauss–Jordan
//!    elimination
//! 5. **Delivery**: reconstructed originals queue for `drain_recovered`,
//!    pushed only from inside the two `accept_*` calls, in no particular
//!    sequence order
//!
//! Sequence arithmetic assumes the 64-bit space never wraps; at a million
//! packets a second that takes half a million years.

use bytes::{Bytes, BytesMut};

use crate::cauchy::{self, MATRIX_COLUMN_COUNT, MATRIX_ROW_COUNT};
use crate::error::{CodecError, CodecResult};
use crate::gf256;
use crate::pool::{BufferAllocator, HeapAllocator};
use crate::solver::{self, EliminationRow, MAX_RECOVERY_COLUMNS, MAX_RECOVERY_ROWS};
use crate::stats::DecoderStats;
use crate::wire::{
    decode_length_prefix, encode_length_prefix, RecoveryPacket, LENGTH_PREFIX_SIZE,
    MAX_PACKET_SIZE, MAX_RECOVERY_COUNT,
};

/// Receive ring size: twice the maximum recovery span, so a recovery can
/// still be useful even when it arrives a full window late.
pub const DECODER_WINDOW_SIZE: usize = 2 * MATRIX_COLUMN_COUNT;

/// Upper bound on simultaneously buffered recoveries; the oldest is shed
/// beyond this.
const MAX_BUFFERED_RECOVERIES: usize = MAX_RECOVERY_ROWS;

// ─── Receive Slots ──────────────────────────────────────────────────────────

/// Lifecycle of one windowed sequence. Transitions: `Empty → Got`,
/// `Empty → Missing` (inferred from a newer arrival), `Missing → Got`
/// (late original), `Missing → Recovered` (solved).
enum SlotState {
    Empty,
    Missing,
    Got(BytesMut),
    Recovered(Bytes),
}

struct ReceiveSlot {
    sequence: u64,
    state: SlotState,
}

// ─── Buffered Recovery ──────────────────────────────────────────────────────

/// A recovery packet reduced to its unknown columns. The payload holds the
/// combination (length-prefix region plus data region) with every known
/// original's contribution already subtracted; the bitmap tracks which of
/// the covered columns remain unknown, one bit per column relative to
/// `sequence_start`.
struct BufferedRecovery {
    sequence_start: u64,
    count: u8,
    row: u8,
    payload: BytesMut,
    unknowns: [u64; 3],
    unknown_count: u16,
}

impl BufferedRecovery {
    fn covers(&self, sequence: u64) -> bool {
        sequence >= self.sequence_start
            && sequence - self.sequence_start < self.count as u64
    }

    fn offset(&self, sequence: u64) -> u8 {
        (sequence - self.sequence_start) as u8
    }

    fn is_unknown(&self, sequence: u64) -> bool {
        if !self.covers(sequence) {
            return false;
        }
        let k = self.offset(sequence) as usize;
        self.unknowns[k / 64] & (1u64 << (k % 64)) != 0
    }

    fn clear_unknown(&mut self, sequence: u64) {
        let k = self.offset(sequence) as usize;
        let bit = 1u64 << (k % 64);
        if self.unknowns[k / 64] & bit != 0 {
            self.unknowns[k / 64] &= !bit;
            self.unknown_count -= 1;
        }
    }

    fn unknown_sequences(&self) -> impl Iterator<Item = u64> + '_ {
        let start = self.sequence_start;
        (0..self.count as usize).filter_map(move |k| {
            if self.unknowns[k / 64] & (1u64 << (k % 64)) != 0 {
                Some(start + k as u64)
            } else {
                None
            }
        })
    }

    fn first_unknown(&self) -> Option<u64> {
        self.unknown_sequences().next()
    }
}

// ─── Recovered Packet ───────────────────────────────────────────────────────

/// A reconstructed original, delivered at most once per sequence over the
/// decoder's lifetime. Delivery order is unconstrained; the application
/// does its own sequencing.
#[derive(Debug, Clone)]
pub struct RecoveredPacket {
    pub sequence: u64,
    pub payload: Bytes,
}

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Decoder state machine.
pub struct Decoder {
    slots: Vec<ReceiveSlot>,
    max_seen: Option<u64>,
    recoveries: Vec<BufferedRecovery>,
    recovered: Vec<RecoveredPacket>,
    alloc: Box<dyn BufferAllocator + Send>,
    stats: DecoderStats,
    disabled: bool,
}

impl Decoder {
    /// Create a decoder with heap-backed buffers.
    pub fn new() -> Self {
        Self::with_allocator(Box::new(HeapAllocator))
    }

    /// Create a decoder with a caller-provided buffer allocator.
    pub fn with_allocator(alloc: Box<dyn BufferAllocator + Send>) -> Self {
        let slots = (0..DECODER_WINDOW_SIZE)
            .map(|_| ReceiveSlot {
                sequence: 0,
                state: SlotState::Empty,
            })
            .collect();
        Decoder {
            slots,
            max_seen: None,
            recoveries: Vec::new(),
            recovered: Vec::new(),
            alloc,
            stats: DecoderStats::new(),
            disabled: false,
        }
    }

    /// Accept an original from the wire.
    ///
    /// Stale and duplicate sequences are silently ignored (and counted).
    /// Filling a previously missing slot reduces every buffered recovery
    /// that referenced it and may trigger further reconstructions —
    /// collect them with [`drain_recovered`](Self::drain_recovered).
    pub fn accept_original(&mut self, sequence: u64, data: &[u8]) -> CodecResult<()> {
        if self.disabled {
            return Err(CodecError::Disabled);
        }
        if data.is_empty() || data.len() > MAX_PACKET_SIZE {
            return Err(CodecError::InvalidInput);
        }
        self.stats.originals_received += 1;

        match self.max_seen {
            None => self.max_seen = Some(sequence),
            Some(max) if sequence > max => self.advance_window(sequence),
            Some(max) => {
                if sequence < window_start(max) {
                    self.stats.originals_expired += 1;
                    return Ok(());
                }
            }
        }

        let idx = self.check_slot(sequence)?;
        match self.slots[idx].state {
            SlotState::Got(_) | SlotState::Recovered(_) => {
                self.stats.duplicates += 1;
                return Ok(());
            }
            SlotState::Empty | SlotState::Missing => {}
        }
        let was_missing = matches!(self.slots[idx].state, SlotState::Missing);

        let mut buf = self
            .alloc
            .allocate(data.len())
            .ok_or(CodecError::OutOfMemory)?;
        buf.extend_from_slice(data);
        self.slots[idx] = ReceiveSlot {
            sequence,
            state: SlotState::Got(buf),
        };

        if was_missing {
            self.reduce_recoveries_with(sequence);
            self.try_solve()?;
        }
        Ok(())
    }

    /// Accept a recovery packet from the wire.
    ///
    /// Known columns are stripped immediately; the reduced combination is
    /// buffered against its remaining unknowns and the solver runs. A
    /// recovery whose covered span extends past the highest sequence seen
    /// advances the window — it may be the only evidence of a trailing
    /// loss.
    pub fn accept_recovery(&mut self, recovery: RecoveryPacket) -> CodecResult<()> {
        if self.disabled {
            return Err(CodecError::Disabled);
        }
        let count = recovery.count as usize;
        if count == 0 || count > MAX_RECOVERY_COUNT {
            return Err(CodecError::InvalidInput);
        }
        if (recovery.row as usize) >= MATRIX_ROW_COUNT {
            return Err(CodecError::InvalidInput);
        }
        if recovery.payload.len() < LENGTH_PREFIX_SIZE + 1
            || recovery.bytes() > MAX_PACKET_SIZE
        {
            return Err(CodecError::InvalidInput);
        }
        let Some(end) = recovery.sequence_end() else {
            return Err(CodecError::InvalidInput);
        };
        self.stats.recoveries_received += 1;

        match self.max_seen {
            None => self.max_seen = Some(end),
            Some(max) if end > max => self.advance_window(end),
            Some(_) => {}
        }
        let start_bound = window_start(self.max_seen.unwrap_or(end));
        if recovery.sequence_start < start_bound {
            // Columns off the back of the window can never be reduced.
            self.stats.recoveries_expired += 1;
            return Ok(());
        }
        for k in 0..count {
            self.check_slot(recovery.sequence_start + k as u64)?;
        }

        let mut payload = self
            .alloc
            .allocate(recovery.payload.len())
            .ok_or(CodecError::OutOfMemory)?;
        payload.extend_from_slice(&recovery.payload);

        let mut unknowns = [0u64; 3];
        let mut unknown_count = 0u16;
        for k in 0..count {
            let seq = recovery.sequence_start + k as u64;
            let idx = (seq % DECODER_WINDOW_SIZE as u64) as usize;
            let known: Option<&[u8]> = match &self.slots[idx].state {
                SlotState::Got(p) => Some(p.as_ref()),
                SlotState::Recovered(p) => Some(p.as_ref()),
                SlotState::Empty | SlotState::Missing => None,
            };
            if let Some(known) = known {
                let coef = cauchy::element(recovery.row, k as u8);
                let prefix = encode_length_prefix(known.len());
                gf256::muladd_mem(&mut payload[..LENGTH_PREFIX_SIZE], coef, &prefix);
                gf256::muladd_mem(&mut payload[LENGTH_PREFIX_SIZE..], coef, known);
            } else {
                if matches!(self.slots[idx].state, SlotState::Empty) {
                    self.slots[idx] = ReceiveSlot {
                        sequence: seq,
                        state: SlotState::Missing,
                    };
                }
                unknowns[k / 64] |= 1u64 << (k % 64);
                unknown_count += 1;
            }
        }

        if unknown_count == 0 {
            self.alloc.release(payload);
            self.stats.recoveries_redundant += 1;
            return Ok(());
        }

        if self.recoveries.len() >= MAX_BUFFERED_RECOVERIES {
            tracing::debug!("recovery buffer full, shedding oldest");
            let oldest = self.recoveries.remove(0);
            self.alloc.release(oldest.payload);
            self.stats.recoveries_expired += 1;
        }
        self.recoveries.push(BufferedRecovery {
            sequence_start: recovery.sequence_start,
            count: recovery.count,
            row: recovery.row,
            payload,
            unknowns,
            unknown_count,
        });

        self.try_solve()
    }

    /// Drain reconstructed originals queued since the last drain.
    pub fn drain_recovered(&mut self) -> impl Iterator<Item = RecoveredPacket> + '_ {
        self.recovered.drain(..)
    }

    /// Reconstructions waiting to be drained.
    pub fn pending_recovered(&self) -> usize {
        self.recovered.len()
    }

    /// Highest sequence observed, directly or via a recovery span.
    pub fn max_seen(&self) -> Option<u64> {
        self.max_seen
    }

    /// In-window sequences currently known to be missing.
    pub fn missing_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.state, SlotState::Missing))
            .count()
    }

    /// Recoveries buffered against still-missing columns.
    pub fn buffered_recoveries(&self) -> usize {
        self.recoveries.len()
    }

    /// Current decoder statistics.
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Whether a prior fault has disabled this decoder.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    // ─── Window maintenance ─────────────────────────────────────────────

    /// Verify the ring slot for `sequence` holds that sequence (or is
    /// free). A mismatch on a non-empty slot means the ring bookkeeping is
    /// corrupt; the decoder latches disabled rather than mis-deliver.
    fn check_slot(&mut self, sequence: u64) -> CodecResult<usize> {
        let idx = (sequence % DECODER_WINDOW_SIZE as u64) as usize;
        let slot = &self.slots[idx];
        if !matches!(slot.state, SlotState::Empty) && slot.sequence != sequence {
            tracing::warn!(
                sequence,
                occupant = slot.sequence,
                "receive ring corrupted, disabling decoder"
            );
            self.disabled = true;
            return Err(CodecError::Disabled);
        }
        Ok(idx)
    }

    fn advance_window(&mut self, new_max: u64) {
        let old_max = match self.max_seen {
            Some(m) => m,
            None => return,
        };
        let old_start = window_start(old_max);
        let new_start = window_start(new_max);

        // Expire sequences sliding out the back (at most the whole ring).
        let evict_end = new_start.min(old_start + DECODER_WINDOW_SIZE as u64);
        for seq in old_start..evict_end {
            self.evict_slot(seq);
        }

        // Newly covered, previously unseen sequences may yet arrive late or
        // be solved: mark them missing.
        let first_new = (old_max + 1).max(new_start);
        for seq in first_new..=new_max {
            let idx = (seq % DECODER_WINDOW_SIZE as u64) as usize;
            self.slots[idx] = ReceiveSlot {
                sequence: seq,
                state: SlotState::Missing,
            };
        }
        self.max_seen = Some(new_max);
    }

    fn evict_slot(&mut self, sequence: u64) {
        let idx = (sequence % DECODER_WINDOW_SIZE as u64) as usize;
        if self.slots[idx].sequence != sequence {
            return;
        }
        let state = std::mem::replace(&mut self.slots[idx].state, SlotState::Empty);
        match state {
            SlotState::Empty | SlotState::Recovered(_) => {}
            SlotState::Got(buf) => self.alloc.release(buf),
            SlotState::Missing => {
                // The column can never become known now; any combination
                // still waiting on it is dead.
                self.drop_recoveries_referencing(sequence);
            }
        }
    }

    fn drop_recoveries_referencing(&mut self, sequence: u64) {
        let mut i = 0;
        while i < self.recoveries.len() {
            if self.recoveries[i].is_unknown(sequence) {
                tracing::debug!(
                    sequence,
                    start = self.recoveries[i].sequence_start,
                    row = self.recoveries[i].row,
                    "recovery expired with its column"
                );
                let dead = self.recoveries.swap_remove(i);
                self.alloc.release(dead.payload);
                self.stats.recoveries_expired += 1;
            } else {
                i += 1;
            }
        }
    }

    /// Subtract a newly known original (received or recovered) out of
    /// every buffered recovery that still referenced it.
    fn reduce_recoveries_with(&mut self, sequence: u64) {
        let idx = (sequence % DECODER_WINDOW_SIZE as u64) as usize;
        let payload: &[u8] = match &self.slots[idx].state {
            SlotState::Got(p) => p.as_ref(),
            SlotState::Recovered(p) => p.as_ref(),
            SlotState::Empty | SlotState::Missing => return,
        };
        let prefix = encode_length_prefix(payload.len());

        let mut i = 0;
        while i < self.recoveries.len() {
            let r = &mut self.recoveries[i];
            if r.is_unknown(sequence) {
                let coef = cauchy::element(r.row, r.offset(sequence));
                gf256::muladd_mem(&mut r.payload[..LENGTH_PREFIX_SIZE], coef, &prefix);
                gf256::muladd_mem(&mut r.payload[LENGTH_PREFIX_SIZE..], coef, payload);
                r.clear_unknown(sequence);
                if r.unknown_count == 0 {
                    let dead = self.recoveries.swap_remove(i);
                    self.alloc.release(dead.payload);
                    self.stats.recoveries_consumed += 1;
                    continue;
                }
            }
            i += 1;
        }
    }

    // ─── Solving ────────────────────────────────────────────────────────

    fn try_solve(&mut self) -> CodecResult<()> {
        while self.solve_singles()? {}
        if self.solve_elimination()? {
            while self.solve_singles()? {}
        }
        Ok(())
    }

    /// Resolve combinations that are down to one unknown. For row 0 the
    /// coefficient is 1 and the reduced payload already is the missing
    /// original — the XOR fast path.
    fn solve_singles(&mut self) -> CodecResult<bool> {
        let Some(i) = self.recoveries.iter().position(|r| r.unknown_count == 1) else {
            return Ok(false);
        };
        let r = self.recoveries.swap_remove(i);
        let Some(sequence) = r.first_unknown() else {
            self.disabled = true;
            return Err(CodecError::Disabled);
        };
        let coef = cauchy::element(r.row, r.offset(sequence));
        let mut payload = r.payload;
        if coef != 1 {
            gf256::div_mem(&mut payload, coef);
        }
        self.stats.recoveries_consumed += 1;
        self.deliver(sequence, payload.freeze())?;
        Ok(true)
    }

    /// Run one bounded elimination pass over the joint system of buffered
    /// recoveries. Rank deficiency solves nothing and is not an error.
    fn solve_elimination(&mut self) -> CodecResult<bool> {
        if self.recoveries.len() < 2 {
            return Ok(false);
        }

        let mut unknowns: Vec<u64> = Vec::new();
        for r in &self.recoveries {
            for seq in r.unknown_sequences() {
                if let Err(pos) = unknowns.binary_search(&seq) {
                    unknowns.insert(pos, seq);
                }
            }
        }
        let n = unknowns.len();
        let m = self.recoveries.len();
        if n == 0 {
            return Ok(false);
        }
        if n > MAX_RECOVERY_COLUMNS || m > MAX_RECOVERY_ROWS {
            self.stats.solver_deferrals += 1;
            tracing::debug!(unknowns = n, rows = m, "recovery attempt deferred");
            return Ok(false);
        }
        self.stats.solver_runs += 1;

        let coeff_rows: Vec<Vec<u8>> = self
            .recoveries
            .iter()
            .map(|r| {
                let mut coeffs = vec![0u8; n];
                for seq in r.unknown_sequences() {
                    if let Ok(col) = unknowns.binary_search(&seq) {
                        coeffs[col] = cauchy::element(r.row, r.offset(seq));
                    }
                }
                coeffs
            })
            .collect();

        // Probe on coefficients alone first; when the system is rank
        // deficient this skips the payload-width elimination entirely.
        let mut probe: Vec<EliminationRow> = coeff_rows
            .iter()
            .map(|coeffs| EliminationRow {
                coeffs: coeffs.clone(),
                data: Vec::new(),
            })
            .collect();
        if solver::eliminate(&mut probe, n).is_empty() {
            return Ok(false);
        }

        let width = self
            .recoveries
            .iter()
            .map(|r| r.payload.len())
            .max()
            .unwrap_or(0);
        let mut rows: Vec<EliminationRow> = self
            .recoveries
            .iter()
            .zip(coeff_rows)
            .map(|(r, coeffs)| {
                let mut data = vec![0u8; width];
                data[..r.payload.len()].copy_from_slice(&r.payload);
                EliminationRow { coeffs, data }
            })
            .collect();

        let solved = solver::eliminate(&mut rows, n);
        if solved.is_empty() {
            return Ok(false);
        }
        for (col, data) in solved {
            self.deliver(unknowns[col], Bytes::from(data))?;
        }
        Ok(true)
    }

    /// Deliver a solved combination: parse the recovered length prefix,
    /// mark the slot, queue the event, and fold the new value into the
    /// remaining buffered recoveries.
    fn deliver(&mut self, sequence: u64, combination: Bytes) -> CodecResult<()> {
        let idx = (sequence % DECODER_WINDOW_SIZE as u64) as usize;
        let slot = &self.slots[idx];
        if slot.sequence != sequence || !matches!(slot.state, SlotState::Missing) {
            tracing::warn!(sequence, "solved a column that is not missing, disabling");
            self.disabled = true;
            return Err(CodecError::Disabled);
        }

        let len = decode_length_prefix([combination[0], combination[1]]);
        // A corrupted combination can claim more bytes than it carries;
        // clamp rather than read past the buffer.
        let end = (LENGTH_PREFIX_SIZE + len).min(combination.len());
        let payload = combination.slice(LENGTH_PREFIX_SIZE..end);

        self.slots[idx] = ReceiveSlot {
            sequence,
            state: SlotState::Recovered(payload.clone()),
        };
        self.recovered.push(RecoveredPacket { sequence, payload });
        self.stats.packets_recovered += 1;
        self.reduce_recoveries_with(sequence);
        Ok(())
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn window_start(max_seen: u64) -> u64 {
    max_seen.saturating_sub(DECODER_WINDOW_SIZE as u64 - 1)
}
