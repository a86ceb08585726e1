//! # Codec Statistics
//!
//! Counter snapshots for both codec halves, designed for JSON export and
//! periodic logging by the host.

use serde::Serialize;

// ─── Encoder Stats ──────────────────────────────────────────────────────────

/// Aggregate encoder-side statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EncoderStats {
    /// Originals accepted into the window.
    pub originals_submitted: u64,
    /// Total payload bytes submitted.
    pub bytes_submitted: u64,
    /// Recovery packets built.
    pub recoveries_emitted: u64,
    /// Window slots evicted because they aged past the window bound.
    pub evicted_by_age: u64,
    /// Window slots evicted because the ring was full.
    pub evicted_by_capacity: u64,
    /// Window resets caused by a sequence gap.
    pub window_resets: u64,
}

impl EncoderStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of emitted traffic that is recovery packets.
    pub fn fec_ratio(&self) -> f64 {
        let total = self.originals_submitted + self.recoveries_emitted;
        if total == 0 {
            0.0
        } else {
            self.recoveries_emitted as f64 / total as f64
        }
    }
}

// ─── Decoder Stats ──────────────────────────────────────────────────────────

/// Aggregate decoder-side statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecoderStats {
    /// Originals received from the wire (including duplicates and stale).
    pub originals_received: u64,
    /// Originals dropped as duplicates of a seen or recovered sequence.
    pub duplicates: u64,
    /// Originals dropped because they fell behind the receive window.
    pub originals_expired: u64,
    /// Recovery packets received.
    pub recoveries_received: u64,
    /// Recoveries dropped because every covered column was already known.
    pub recoveries_redundant: u64,
    /// Recoveries dropped because a column they needed left the window.
    pub recoveries_expired: u64,
    /// Recoveries fully consumed by elimination.
    pub recoveries_consumed: u64,
    /// Lost originals reconstructed and delivered.
    pub packets_recovered: u64,
    /// Elimination passes run.
    pub solver_runs: u64,
    /// Elimination passes deferred because the system exceeded its bounds.
    pub solver_deferrals: u64,
}

impl DecoderStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique originals the application has seen, direct plus recovered.
    pub fn unique_delivered(&self) -> u64 {
        self.originals_received - self.duplicates - self.originals_expired
            + self.packets_recovered
    }

    /// Fraction of received recoveries that reconstructed at least one
    /// original.
    pub fn recovery_yield(&self) -> f64 {
        if self.recoveries_received == 0 {
            0.0
        } else {
            self.packets_recovered as f64 / self.recoveries_received as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fec_ratio_zero_when_idle() {
        assert_eq!(EncoderStats::new().fec_ratio(), 0.0);
    }

    #[test]
    fn fec_ratio_counts_recoveries() {
        let stats = EncoderStats {
            originals_submitted: 9,
            recoveries_emitted: 3,
            ..Default::default()
        };
        assert!((stats.fec_ratio() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn unique_delivered_combines_paths() {
        let stats = DecoderStats {
            originals_received: 10,
            duplicates: 2,
            originals_expired: 1,
            packets_recovered: 3,
            ..Default::default()
        };
        assert_eq!(stats.unique_delivered(), 10);
    }

    #[test]
    fn recovery_yield_ratio() {
        let stats = DecoderStats {
            recoveries_received: 8,
            packets_recovered: 2,
            ..Default::default()
        };
        assert!((stats.recovery_yield() - 0.25).abs() < 1e-9);
    }
}
