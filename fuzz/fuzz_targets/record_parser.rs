#![no_main]

use libfuzzer_sys::fuzz_target;
use ctcperm::source::{parse_record, RecordSource};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Single lines and whole inputs must fail cleanly, never panic
        let _ = parse_record(input, 3);
        if let Ok(source) = RecordSource::from_reader(input.as_bytes(), 64) {
            for group in source {
                if group.is_err() {
                    break;
                }
            }
        }
    }
});
