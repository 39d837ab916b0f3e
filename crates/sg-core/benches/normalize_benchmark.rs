//! Markdown Normalization Benchmarks
//!
//! Measures the cost of cleaning request text before synthesis:
//! - Plain text with nothing to strip
//! - Typical LLM-style Markdown answers
//! - Long inputs close to the upstream chunk size

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use sg_core::markdown::{markdown_pipeline, normalize};

const MARKDOWN_ANSWER: &str = "# Summary\n\
    \n\
    Here is what changed[1]:\n\
    \n\
    * Updated the [install guide](https://example.com/install)\n\
    * Fixed ____ in the parser\n\
    > * Quoted item with a [reference][2]\n\
    \n\
    ## Next steps\n";

/// Benchmark short inputs
fn bench_normalize_short(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_short");

    group.bench_function("plain_text", |b| {
        b.iter(|| normalize(black_box("Hello, world! Nothing to strip here.")))
    });

    group.bench_function("markdown_answer", |b| {
        b.iter(|| normalize(black_box(MARKDOWN_ANSWER)))
    });

    group.finish();
}

/// Benchmark inputs of increasing size
fn bench_normalize_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_scaling");

    for repeats in [1usize, 10, 50] {
        let input = MARKDOWN_ANSWER.repeat(repeats);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(repeats), &input, |b, input| {
            b.iter(|| markdown_pipeline().apply(black_box(input)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize_short, bench_normalize_scaling);
criterion_main!(benches);
