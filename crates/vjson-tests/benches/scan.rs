use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use vjson_scan::{PAD_SIZE, Scanner};

/// A code-heavy tool-call payload: long strings with sparse escapes,
/// the shape the scanner sees in practice.
fn payload(bytes: usize) -> Vec<u8> {
    let mut doc = Vec::from(&br#"{"tool":"write_file","path":"src/lib.rs","content":""#[..]);
    while doc.len() < bytes {
        doc.extend_from_slice(br"fn item() -> u32 { let v = \"x\"; 41 + 1 }\n");
    }
    doc.extend_from_slice(b"\"}");
    doc
}

fn bench_scan_whole(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_whole");
    for size in [4 * 1024, 64 * 1024, 1024 * 1024] {
        let mut input = payload(size);
        let len = input.len();
        input.resize(len + PAD_SIZE, 0);

        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| {
                let mut scanner = Scanner::new();
                let mut out = Vec::new();
                scanner.scan(input, len, &mut out);
                out.len()
            });
        });
    }
    group.finish();
}

fn bench_scan_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_chunked");
    let raw = payload(64 * 1024);
    group.throughput(Throughput::Bytes(raw.len() as u64));

    for chunk in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut scanner = Scanner::new();
                let mut out = Vec::new();
                let mut buf = Vec::new();
                let mut len = 0;
                for piece in raw.chunks(chunk) {
                    buf.truncate(len);
                    buf.extend_from_slice(piece);
                    len += piece.len();
                    buf.resize(len + PAD_SIZE, 0);
                    scanner.scan(&buf, len, &mut out);
                }
                out.len()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scan_whole, bench_scan_chunked);
criterion_main!(benches);
