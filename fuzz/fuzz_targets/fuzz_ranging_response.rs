#![no_main]
use clawpick_core::{ProbeOutcome, classify_response};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|line: &str| {
    // Any line from the board classifies without panicking, and a numeric
    // reading is always a usable distance.
    if let ProbeOutcome::Millimeters(mm) = classify_response(line) {
        assert!(mm.is_finite() && mm >= 0.0);
    }
});
