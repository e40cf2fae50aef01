//! Benchmarks for the durable writer strategies.
//!
//! Run with: cargo bench -p cfscopy-core

use cfscopy_core::{DurableWriter, WriteConfig, WriteMode};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::io::Cursor;
use tempfile::TempDir;

/// Generate test data of the specified size
fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Benchmark a full durable file copy for each write mode
fn bench_copy_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_file");
    group.sample_size(10);

    let temp = TempDir::new().unwrap();
    let sizes = [(64 * 1024, "64KB"), (1024 * 1024, "1MB"), (8 * 1024 * 1024, "8MB")];

    for (size, size_name) in sizes {
        let source = temp.path().join(format!("source-{}", size_name));
        std::fs::write(&source, generate_test_data(size)).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        for mode in [WriteMode::Buffered, WriteMode::Sync] {
            let Ok(writer) = DurableWriter::for_mode(WriteConfig::new(), mode) else {
                continue;
            };
            let destination = temp.path().join(format!("dest-{}-{}", mode, size_name));

            group.bench_with_input(BenchmarkId::new(mode.name(), size_name), &source, |b, source| {
                b.iter(|| writer.copy_file(black_box(source), black_box(&destination)).unwrap());
            });
        }
    }

    group.finish();
}

/// Benchmark the block loop alone for different block sizes
fn bench_copy_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_stream");
    let size = 4 * 1024 * 1024;
    let data = generate_test_data(size);
    group.throughput(Throughput::Bytes(size as u64));

    for block_size in [4 * 1024, 16 * 1024, 1024 * 1024] {
        let writer = DurableWriter::with_strategy(
            WriteConfig::new().block_size(block_size),
            Box::new(cfscopy_core::writer::BufferedStrategy::new(block_size)),
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(block_size), &data, |b, data| {
            b.iter(|| {
                let mut source = Cursor::new(data);
                let mut sink = Vec::with_capacity(size);
                writer.copy_stream(black_box(&mut source), &mut sink).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_copy_file, bench_copy_stream);
criterion_main!(benches);
