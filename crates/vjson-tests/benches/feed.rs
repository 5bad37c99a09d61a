use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use vjson_core::{StreamParser, parse};

/// Tool-call payload with a long streamed `code` field plus metadata.
fn payload(bytes: usize) -> Vec<u8> {
    let mut code = String::new();
    while code.len() < bytes {
        code.push_str("let total = items.iter().map(|i| i.cost).sum::<u64>();\\n");
    }
    format!(
        r#"{{"tool":"write_file","path":"src/main.rs","content":"{code}","overwrite":true}}"#
    )
    .into_bytes()
}

fn bench_oneshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("oneshot_parse");
    for size in [4 * 1024, 64 * 1024] {
        let doc = payload(size);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| parse(doc).status());
        });
    }
    group.finish();
}

/// The motivating comparison: incremental feeding does the work once,
/// the accumulate-and-reparse baseline does O(n²) work over the stream.
fn bench_streaming_vs_reparse(c: &mut Criterion) {
    let doc = payload(16 * 1024);
    let chunk = 24; // tool-call streams arrive in ≈8–32 byte pieces

    let mut group = c.benchmark_group("streaming");
    group.throughput(Throughput::Bytes(doc.len() as u64));

    group.bench_function("incremental_feed", |b| {
        b.iter(|| {
            let mut parser = StreamParser::new();
            for piece in doc.chunks(chunk) {
                parser.feed(piece);
            }
            parser.status()
        });
    });

    group.bench_function("reparse_accumulated", |b| {
        b.iter(|| {
            let mut buf = Vec::new();
            let mut last = None;
            for piece in doc.chunks(chunk) {
                buf.extend_from_slice(piece);
                last = Some(parse(&buf).status());
            }
            last
        });
    });

    group.finish();
}

fn bench_serde_reference(c: &mut Criterion) {
    let doc = payload(64 * 1024);
    let mut group = c.benchmark_group("reference");
    group.throughput(Throughput::Bytes(doc.len() as u64));

    group.bench_function("vjson_oneshot", |b| {
        b.iter(|| parse(&doc).status());
    });
    group.bench_function("serde_json", |b| {
        b.iter(|| serde_json::from_slice::<serde_json::Value>(&doc).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_oneshot,
    bench_streaming_vs_reparse,
    bench_serde_reference
);
criterion_main!(benches);
