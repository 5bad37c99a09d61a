#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: snapshot blob framing.
//
// Catches bugs in:
// - Header validation (magic, version, reserved flags)
// - Section length arithmetic on truncated or oversized inputs
// - Token record decoding
fuzz_target!(|data: &[u8]| {
    let _ = vjson_core::snapshot::decode(data);
});
