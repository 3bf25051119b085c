//! Benchmarks for toolpath metadata extraction.
//!
//! Run with: cargo bench -p slicekit-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use slicekit_engine::output::{extract, parse_toolpath};
use tempfile::tempdir;

/// Synthetic toolpath with a header, `moves` motion lines and a summary trailer
fn synthetic_toolpath(moves: usize) -> String {
    let mut text = String::with_capacity(moves * 24 + 512);
    text.push_str("; generated by OrcaSlicer 2.3.1\n");
    text.push_str("; model printing time: 1h 2m 3s; total estimated time: 1h 5m 30s\n");
    text.push_str("; HEADER_BLOCK_END\n");
    for i in 0..moves {
        text.push_str(&format!("G1 X{}.{} Y{} E0.0421\n", i % 250, i % 10, i % 200));
    }
    text.push_str("; filament used [mm] = 4120.36\n");
    text.push_str("; filament used [cm3] = 9.91\n");
    text.push_str("; filament used [g] = 12.29\n");
    text.push_str("; filament cost = 0.25\n");
    text
}

fn bench_parse_in_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_toolpath");

    for moves in [1_000, 100_000] {
        let text = synthetic_toolpath(moves);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(moves), &text, |b, text| {
            b.iter(|| parse_toolpath(black_box(text)));
        });
    }

    group.finish();
}

fn bench_extract_file(c: &mut Criterion) {
    let dir = tempdir().expect("failed to create temp dir");
    let mut group = c.benchmark_group("extract_file");

    for moves in [10_000, 500_000] {
        let path = dir.path().join(format!("plate_{}.gcode", moves));
        let text = synthetic_toolpath(moves);
        std::fs::write(&path, &text).expect("failed to write toolpath");

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(moves), &path, |b, path| {
            b.iter(|| extract(black_box(path)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_in_memory, bench_extract_file);
criterion_main!(benches);
