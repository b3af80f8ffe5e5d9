//! Fuzz target: `AdapterConfig::from_bytes`
//!
//! Feeds arbitrary bytes to the persisted-config decoder and verifies:
//! - No panics under any byte sequence
//! - Anything accepted also passes validation and re-encodes
//!
//! cargo fuzz run fuzz_config_decode

#![no_main]

use blebridge::AdapterConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(cfg) = AdapterConfig::from_bytes(data) {
        assert!(cfg.validate().is_ok(), "decoded config failed validation");
        assert!(cfg.to_bytes().is_ok(), "decoded config failed to encode");
    }
});
