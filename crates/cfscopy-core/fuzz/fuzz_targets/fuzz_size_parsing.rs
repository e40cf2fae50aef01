//! Fuzz test for size string parsing
//!
//! Tests that parse_size handles arbitrary input without panicking or
//! overflowing.

#![no_main]

use cfscopy_core::parse_size;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(size) = parse_size(data) {
        let plain = parse_size(&size.to_string()).expect("plain byte counts parse");
        assert_eq!(plain, size);
    }
});
