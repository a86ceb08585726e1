//! Hot-path latency benchmarks for the ccat codec.
//!
//! Measures the per-packet cost centers:
//! - Original/recovery header encode/decode
//! - Recovery construction across window sizes
//! - Decoder ingest of in-order originals
//! - Full loss-repair passes (single loss and joint two-loss solve)
//!
//! Run with: cargo bench --package ccat

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::time::Duration;

use ccat::decoder::Decoder;
use ccat::encoder::{Encoder, EncoderConfig};
use ccat::wire::{OriginalPacket, RecoveryPacket};

fn wide_encoder() -> Encoder {
    Encoder::new(EncoderConfig {
        window_msec: 2_000_000_000,
        ..Default::default()
    })
    .unwrap()
}

// ─── Wire Codec ──────────────────────────────────────────────────────────

fn bench_original_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("original_encode");
    for size in [100usize, 1200, 8192] {
        let pkt = OriginalPacket {
            sequence: 1_000_000,
            payload: Bytes::from(vec![0xAB; size]),
        };
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{size}B"), |b| {
            b.iter(|| {
                let mut buf = BytesMut::with_capacity(pkt.encoded_len());
                black_box(&pkt).encode(&mut buf);
                black_box(buf);
            });
        });
    }
    group.finish();
}

fn bench_original_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("original_decode");
    for size in [100usize, 1200, 8192] {
        let pkt = OriginalPacket {
            sequence: 1_000_000,
            payload: Bytes::from(vec![0xAB; size]),
        };
        let mut buf = BytesMut::new();
        pkt.encode(&mut buf);
        let encoded = buf.freeze();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{size}B"), |b| {
            b.iter(|| {
                let mut r = encoded.clone();
                black_box(OriginalPacket::decode(&mut r));
            });
        });
    }
    group.finish();
}

fn bench_recovery_header_roundtrip(c: &mut Criterion) {
    let mut enc = wide_encoder();
    for seq in 0..32u64 {
        enc.submit_original(seq, &[seq as u8; 1200]).unwrap();
    }
    let pkt = enc.build_recovery().unwrap();

    c.bench_function("recovery_header_roundtrip", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(pkt.encoded_len());
            pkt.encode(&mut buf);
            let decoded = RecoveryPacket::decode(&mut buf.freeze());
            black_box(decoded);
        });
    });
}

// ─── Recovery Construction ───────────────────────────────────────────────

fn bench_build_recovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_recovery");
    for window in [16usize, 64, 192] {
        let mut enc = wide_encoder();
        for seq in 0..window as u64 {
            enc.submit_original(seq, &[seq as u8; 1200]).unwrap();
        }
        group.throughput(Throughput::Bytes((window * 1200) as u64));
        group.bench_function(format!("window{window}"), |b| {
            b.iter(|| {
                black_box(enc.build_recovery().unwrap());
            });
        });
    }
    group.finish();
}

// ─── Decoder Ingest ──────────────────────────────────────────────────────

fn bench_accept_original(c: &mut Criterion) {
    c.bench_function("accept_original_in_order", |b| {
        let mut dec = Decoder::new();
        let payload = [0x5Au8; 1200];
        let mut seq = 0u64;
        b.iter(|| {
            dec.accept_original(seq, &payload).unwrap();
            seq += 1;
        });
    });
}

// ─── Loss Repair ─────────────────────────────────────────────────────────

fn bench_repair_single_loss(c: &mut Criterion) {
    c.bench_function("repair_single_loss_window32", |b| {
        let mut enc = wide_encoder();
        let payload = [0xC3u8; 1200];
        for seq in 0..32u64 {
            enc.submit_original(seq, &payload).unwrap();
        }
        let recovery = enc.build_recovery().unwrap();

        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            for _ in 0..iters {
                let mut dec = Decoder::new();
                for seq in 0..32u64 {
                    if seq != 13 {
                        dec.accept_original(seq, &payload).unwrap();
                    }
                }
                // Time only the repair itself.
                let start = quanta::Instant::now();
                dec.accept_recovery(recovery.clone()).unwrap();
                total += start.elapsed();
                assert_eq!(dec.drain_recovered().count(), 1);
            }
            total
        });
    });
}

fn bench_repair_joint_two_losses(c: &mut Criterion) {
    c.bench_function("repair_joint_two_losses_window32", |b| {
        let mut enc = wide_encoder();
        let payload = [0x7Eu8; 1200];
        for seq in 0..32u64 {
            enc.submit_original(seq, &payload).unwrap();
        }
        let r0 = enc.build_recovery().unwrap();
        let r1 = enc.build_recovery().unwrap();

        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            for _ in 0..iters {
                let mut dec = Decoder::new();
                for seq in 0..32u64 {
                    if seq != 5 && seq != 20 {
                        dec.accept_original(seq, &payload).unwrap();
                    }
                }
                let start = quanta::Instant::now();
                dec.accept_recovery(r0.clone()).unwrap();
                dec.accept_recovery(r1.clone()).unwrap();
                total += start.elapsed();
                assert_eq!(dec.drain_recovered().count(), 2);
            }
            total
        });
    });
}

criterion_group!(
    benches,
    bench_original_encode,
    bench_original_decode,
    bench_recovery_header_roundtrip,
    bench_build_recovery,
    bench_accept_original,
    bench_repair_single_loss,
    bench_repair_joint_two_losses,
);
criterion_main!(benches);
