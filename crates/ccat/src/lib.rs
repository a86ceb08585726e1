//! # ccat
//!
//! Streaming Cauchy-matrix forward error correction for low-latency
//! datagram streams (VoIP, live video, telemetry).
//!
//! A sender interleaves occasional recovery packets into its stream, each
//! a GF(256) linear combination of a short sliding window of recent
//! originals. A receiver that sees enough of the window — originals plus
//! recoveries — reconstructs the missing originals algebraically, with no
//! retransmission and no added round trip. The code is convolutional:
//! recovery windows slide continuously instead of partitioning the stream
//! into blocks, so repair latency stays bounded by the window, not by
//! block boundaries.
//!
//! The codec is pure logic. It never touches a socket; the host feeds it
//! packets and forwards what it produces. Encoder and decoder are
//! independent state machines that share nothing and may live on
//! different threads.
//!
//! ## Crate structure
//!
//! - [`gf256`] — finite-field arithmetic and bulk buffer operations
//! - [`cauchy`] — recovery coefficient generator (all-ones first row)
//! - [`pool`] — buffer allocation behind a capability trait
//! - [`wire`] — original/recovery header serialization
//! - [`encoder`] — sliding window over originals, recovery construction
//! - [`decoder`] — receive window, dedup, recovery buffering, delivery
//! - [`solver`] — Gauss–Jordan elimination over GF(256)
//! - [`stats`] — counter snapshots for both halves
//! - [`error`] — result kinds

pub mod cauchy;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod gf256;
pub mod pool;
pub mod solver;
pub mod stats;
pub mod wire;
