#![no_main]

use libfuzzer_sys::fuzz_target;
use vjson_core::snapshot::{self, SnapshotFormat};
use vjson_core::{ParserStatus, StreamParser};

// Fuzz target: snapshot encode → decode round trip preserves the value.
fuzz_target!(|data: &[u8]| {
    let mut parser = StreamParser::new();
    parser.feed(data);
    if parser.status() == ParserStatus::Error {
        return;
    }

    let blob = parser.snapshot(true, SnapshotFormat::Plain);
    let snap = snapshot::decode(&blob).expect("own snapshots always decode");

    let original = parser.tape_value().map(|v| v.materialize().to_json_string());
    let transferred = snap.value().map(|v| v.materialize().to_json_string());
    assert_eq!(original, transferred);
});
