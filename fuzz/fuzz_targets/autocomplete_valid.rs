#![no_main]

use libfuzzer_sys::fuzz_target;
use vjson_classify::{Classifier, Status};
use vjson_core::ParserStatus;

// Fuzz target: autocomplete validity — an incomplete prefix plus its
// completion suffix must always parse.
fuzz_target!(|data: &[u8]| {
    let completion = Classifier::complete_input(data);
    if completion.status != Status::Incomplete {
        return;
    }
    let completed = completion.apply(data);
    let reparsed = vjson_core::parse(&completed);
    assert!(
        matches!(
            reparsed.status(),
            ParserStatus::Complete | ParserStatus::CompleteEarly
        ),
        "completion of {:?} produced {:?} with status {:?}",
        data,
        completed,
        reparsed.status()
    );
});
