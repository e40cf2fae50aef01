//! Fuzz test for settings file parsing
//!
//! Tests that arbitrary TOML is rejected cleanly or loads into settings that
//! serialize back.

#![no_main]

use cfscopy_core::Settings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(settings) = toml::from_str::<Settings>(data) {
        let rendered = toml::to_string_pretty(&settings).expect("settings serialize");
        let reparsed: Settings = toml::from_str(&rendered).expect("rendered settings parse");
        assert_eq!(settings, reparsed);
        let _ = settings.block_size_bytes();
    }
});
