//! Benchmarks for the frame hot paths.
//!
//! Run with: `cargo bench`

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use wsline::protocol::{apply_mask, apply_mask_fast, compute_accept_key, OpCode};
use wsline::Frame;

fn encoded_frame(payload_size: usize, key: Option<[u8; 4]>) -> Vec<u8> {
    let frame = Frame::new(true, OpCode::Binary, vec![0xab; payload_size]);
    let mut buf = BytesMut::new();
    frame.encode_into(&mut buf, key);
    buf.to_vec()
}

fn bench_frame_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_parse");
    for size in [16usize, 1024, 65536] {
        let unmasked = encoded_frame(size, None);
        let masked = encoded_frame(size, Some([0x37, 0xfa, 0x21, 0x3d]));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("unmasked_{size}"), |b| {
            b.iter(|| Frame::parse(black_box(&unmasked)))
        });
        group.bench_function(format!("masked_{size}"), |b| {
            b.iter(|| Frame::parse(black_box(&masked)))
        });
    }
    group.finish();
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");
    for size in [16usize, 1024, 65536] {
        let frame = Frame::new(true, OpCode::Binary, vec![0xab; size]);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("unmasked_{size}"), |b| {
            let mut buf = BytesMut::with_capacity(size + 14);
            b.iter(|| {
                buf.clear();
                black_box(&frame).encode_into(&mut buf, None);
            })
        });
        group.bench_function(format!("masked_{size}"), |b| {
            let mut buf = BytesMut::with_capacity(size + 14);
            b.iter(|| {
                buf.clear();
                black_box(&frame).encode_into(&mut buf, Some([0x37, 0xfa, 0x21, 0x3d]));
            })
        });
    }
    group.finish();
}

fn bench_masking(c: &mut Criterion) {
    let mut group = c.benchmark_group("masking");
    for size in [64usize, 4096, 65536] {
        let mut data = vec![0xab; size];
        let key = [0x37, 0xfa, 0x21, 0x3d];

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("scalar_{size}"), |b| {
            b.iter(|| apply_mask(black_box(&mut data), key))
        });
        group.bench_function(format!("word_{size}"), |b| {
            b.iter(|| apply_mask_fast(black_box(&mut data), key))
        });
    }
    group.finish();
}

fn bench_accept_key(c: &mut Criterion) {
    c.bench_function("accept_key", |b| {
        b.iter(|| compute_accept_key(black_box("dGhlIHNhbXBsZSBub25jZQ==")))
    });
}

criterion_group!(
    benches,
    bench_frame_parse,
    bench_frame_encode,
    bench_masking,
    bench_accept_key
);
criterion_main!(benches);
