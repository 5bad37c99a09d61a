#![no_main]

use libfuzzer_sys::fuzz_target;
use vjson_classify::Classifier;

// Fuzz target: the classifier must be total over arbitrary bytes.
//
// Catches bugs in:
// - Escape / unicode sub-state transitions
// - Number phase machine dead ends
// - Container stack under/overflow
fuzz_target!(|data: &[u8]| {
    let mut classifier = Classifier::new();
    classifier.advance(data);
    let _ = classifier.status();
    let _ = classifier.status_at_eof();
    let _ = classifier.completion();
    let _ = classifier.tail();
});
