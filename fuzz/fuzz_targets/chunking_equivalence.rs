#![no_main]

use libfuzzer_sys::fuzz_target;
use vjson_classify::Classifier;
use vjson_core::{ParserStatus, StreamParser};

// Fuzz target: chunking invariance — feeding a split input equals
// parsing it whole, for any split that keeps the prefix legal (a split
// isolating a bare minus is deliberately invalid per the classifier).
//
// Input format: byte 0 selects the split point, the rest is the
// document.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let doc = &data[1..];
    let split = usize::from(data[0]) % (doc.len() + 1);
    if Classifier::classify(&doc[..split]).is_invalid() {
        return;
    }

    let whole = vjson_core::parse(doc);

    let mut chunked = StreamParser::new();
    chunked.feed(&doc[..split]);
    chunked.feed(&doc[split..]);
    chunked.end();

    if whole.status() == ParserStatus::Error || chunked.status() == ParserStatus::Error {
        // Both ways must agree that the input is broken.
        assert_eq!(whole.status(), chunked.status());
        return;
    }

    let whole_value = whole.materialize().map(|v| v.to_json_string());
    let chunked_value = chunked
        .value()
        .ok()
        .flatten()
        .map(|n| n.materialize().to_json_string());
    assert_eq!(whole_value, chunked_value, "split {split} of {doc:?}");
});
