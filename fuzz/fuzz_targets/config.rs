#![no_main]

use bootscout_core::policy::config::ScanConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = ScanConfig::parse(data);
});
