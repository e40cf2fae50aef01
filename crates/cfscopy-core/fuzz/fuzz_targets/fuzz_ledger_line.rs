//! Fuzz test for run log parsing
//!
//! Arbitrary log contents must never panic, and every completion found must
//! carry a non-empty, trimmed path.

#![no_main]

use cfscopy_core::event::Event;
use cfscopy_core::ledger::{completed_path, parse_completed_from};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let (set, scan) = parse_completed_from(data).expect("in-memory reads do not fail");

    assert!(scan.completions <= scan.lines);
    assert!(set.len() <= scan.completions);

    for path in set.iter() {
        let text = path.to_string_lossy();
        assert!(!text.is_empty());
        assert_eq!(text.trim(), text);
    }

    if let Ok(text) = std::str::from_utf8(data) {
        for line in text.lines() {
            // A parsed line renders back to something that parses the same way
            if let Some(event) = Event::parse_line(line) {
                let again = Event::parse_line(&event.to_line()).expect("rendered line parses");
                assert_eq!(again.level, event.level);
                assert_eq!(again.as_completion(), event.as_completion());
            }
            let _ = completed_path(line);
        }
    }
});
