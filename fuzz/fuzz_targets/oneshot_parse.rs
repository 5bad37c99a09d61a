#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: one-shot parse over arbitrary bytes.
//
// Exercises the scanner, builder, autocomplete pass, live accessor and
// materialization together; none of them may panic, whatever arrives.
fuzz_target!(|data: &[u8]| {
    let parsed = vjson_core::parse(data);
    if let Some(value) = parsed.value() {
        let _ = value.is_complete();
        let _ = value.materialize();
    }
    let _ = parsed.remaining();
});
