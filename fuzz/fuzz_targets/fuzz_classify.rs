#![no_main]
use libfuzzer_sys::fuzz_target;
use sensorlog::line::{classify, Line};

fuzz_target!(|data: &[u8]| {
    let Ok(str) = std::str::from_utf8(data) else {
        return;
    };
    if let Some(line) = classify(str) {
        assert_eq!(line.text(), str.trim());
        assert!(!line.text().is_empty());
        if let Line::Data(data) = line {
            assert!(data.starts_with(|c: char| c == '-' || c.is_ascii_digit()));
        }
    }
});
