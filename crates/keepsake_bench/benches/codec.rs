//! Envelope codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use keepsake_bench::utils::{counter_with_tags, random_data};
use keepsake_codec::{compress, decompress, Envelope, Format, RawEnvelope, FIRMWARE};
use keepsake_testkit::{legacy, Counter};

/// Benchmark encoding typed envelopes of growing size.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_encode");

    for tags in [0usize, 16, 128, 255] {
        let counter = counter_with_tags(tags, 24);
        let size = Envelope::new(counter.clone())
            .to_raw()
            .unwrap()
            .payload
            .len();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("compressed", tags), &counter, |b, counter| {
            b.iter(|| {
                let bytes = Envelope::new(black_box(counter.clone())).encode().unwrap();
                black_box(bytes);
            });
        });

        group.bench_with_input(BenchmarkId::new("framed", tags), &counter, |b, counter| {
            b.iter(|| {
                let bytes = Envelope::new(black_box(counter.clone()))
                    .encode_as(Format::Framed { firmware: FIRMWARE })
                    .unwrap();
                black_box(bytes);
            });
        });
    }

    group.finish();
}

/// Benchmark decoding, including the migration and fallback paths.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_decode");

    for tags in [0usize, 16, 128, 255] {
        let bytes = counter_with_tags(tags, 24).to_bytes().unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("current", tags), &bytes, |b, bytes| {
            b.iter(|| {
                let envelope = Envelope::<Counter>::try_decode(black_box(bytes)).unwrap();
                black_box(envelope);
            });
        });
    }

    let v1 = legacy::counter_v1(42, 1_700_000_000).unwrap();
    group.bench_function("migrate_v1", |b| {
        b.iter(|| {
            let envelope = Envelope::<Counter>::try_decode(black_box(&v1)).unwrap();
            black_box(envelope);
        });
    });

    let v2 = legacy::counter_v2(42, "legacy", 1_700_000_000).unwrap();
    group.bench_function("migrate_v2", |b| {
        b.iter(|| {
            let envelope = Envelope::<Counter>::try_decode(black_box(&v2)).unwrap();
            black_box(envelope);
        });
    });

    let garbage = random_data(256);
    group.bench_function("fallback", |b| {
        b.iter(|| {
            let envelope = Envelope::<Counter>::decode(black_box(&garbage));
            black_box(envelope);
        });
    });

    group.finish();
}

/// Benchmark the raw framing and compression layers.
fn bench_raw(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw");

    for size in [64usize, 1024, 16 * 1024, 256 * 1024] {
        let payload = random_data(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("compress", size), &payload, |b, payload| {
            b.iter(|| black_box(compress(black_box(payload)).unwrap()));
        });

        let compressed = compress(&payload).unwrap();
        group.bench_with_input(
            BenchmarkId::new("decompress", size),
            &compressed,
            |b, compressed| {
                b.iter(|| black_box(decompress(black_box(compressed)).unwrap()));
            },
        );

        let raw = RawEnvelope::new(1, 1_700_000_000, payload);
        let framed = raw.encode_framed(FIRMWARE).unwrap();
        group.bench_with_input(BenchmarkId::new("decode_framed", size), &framed, |b, framed| {
            b.iter(|| black_box(RawEnvelope::decode(black_box(framed)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_raw);
criterion_main!(benches);
