//! # Error Types
//!
//! Every fallible codec operation returns a [`CodecError`]. There are no
//! panics on bad input or exhausted memory: invalid calls leave state
//! unchanged, and an internal invariant violation latches the affected
//! codec half into a permanent disabled state instead of corrupting it.

use thiserror::Error;

/// Result kind for all fallible codec operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A size, sequence, or header field was out of range. State unchanged.
    #[error("input field out of range")]
    InvalidInput,
    /// The buffer allocator could not provide a packet buffer.
    #[error("packet buffer pool exhausted")]
    OutOfMemory,
    /// The window is empty; there is nothing to build a recovery from.
    #[error("window is empty")]
    NotReady,
    /// A prior internal fault disabled this codec half; all further calls
    /// return this error.
    #[error("codec disabled after internal fault")]
    Disabled,
}

/// Convenience alias used throughout the crate.
pub type CodecResult<T> = Result<T, CodecError>;
