//! # Packet Buffer Pool
//!
//! Buffer allocation behind a small capability trait so hosts can choose
//! their memory strategy: a capacity-bounded free list for deterministic
//! footprints, or plain heap allocation when bounding is not a concern.
//!
//! Window slots and buffered recoveries hold leases (`BytesMut`) for their
//! whole lifetime and return them on eviction. Buffers handed to the
//! application (frozen into `Bytes` on delivery) are consumed and never
//! return to the pool; size the pool with [`RECOMMENDED_POOL_BUFFERS`] of
//! headroom for the in-flight worst case.

use bytes::BytesMut;

use crate::cauchy::MATRIX_ROW_COUNT;
use crate::decoder::DECODER_WINDOW_SIZE;

/// Buffers needed to guarantee forward progress at worst case: a full
/// decoder window of originals plus a full complement of buffered
/// recoveries, doubled for in-flight slack.
pub const RECOMMENDED_POOL_BUFFERS: usize = 2 * DECODER_WINDOW_SIZE + MATRIX_ROW_COUNT;

/// Allocation capability used by the encoder and decoder windows.
///
/// `allocate` returns an empty buffer with at least `len` bytes of
/// capacity, or `None` when the pool is exhausted (surfaced to the caller
/// as `OutOfMemory`). `release` returns a lease once its window slot is
/// evicted.
pub trait BufferAllocator {
    fn allocate(&mut self, len: usize) -> Option<BytesMut>;
    fn release(&mut self, buf: BytesMut);
}

// ─── HeapAllocator ──────────────────────────────────────────────────────────

/// Unbounded passthrough allocator; `release` simply drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&mut self, len: usize) -> Option<BytesMut> {
        Some(BytesMut::with_capacity(len))
    }

    fn release(&mut self, _buf: BytesMut) {}
}

// ─── BufferPool ─────────────────────────────────────────────────────────────

/// Capacity-bounded free-list allocator.
///
/// Released buffers are recycled rather than freed, so a steady-state
/// codec stops touching the global allocator entirely. The pool never
/// shrinks. `capacity` bounds the number of simultaneously outstanding
/// leases; consumed buffers (delivered to the application) count against
/// it permanently, which is why the recommended sizing carries slack.
#[derive(Debug)]
pub struct BufferPool {
    free: Vec<BytesMut>,
    outstanding: usize,
    capacity: usize,
}

impl BufferPool {
    /// Create a pool allowing up to `capacity` outstanding buffers.
    pub fn new(capacity: usize) -> Self {
        BufferPool {
            free: Vec::with_capacity(capacity.min(64)),
            outstanding: 0,
            capacity,
        }
    }

    /// Number of leases currently out.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Number of recycled buffers waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Maximum outstanding leases.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl BufferAllocator for BufferPool {
    fn allocate(&mut self, len: usize) -> Option<BytesMut> {
        if self.outstanding >= self.capacity {
            return None;
        }
        self.outstanding += 1;
        match self.free.pop() {
            Some(mut buf) => {
                buf.clear();
                if buf.capacity() < len {
                    buf.reserve(len - buf.capacity());
                }
                Some(buf)
            }
            None => Some(BytesMut::with_capacity(len)),
        }
    }

    fn release(&mut self, buf: BytesMut) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.free.push(buf);
    }
}
