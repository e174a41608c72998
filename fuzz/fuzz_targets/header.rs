#![no_main]

use bootscout_core::{scan::validate::is_valid_header, system::helper::Arch};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for arch in [Arch::Ia32, Arch::X64, Arch::Arm, Arch::Aa64] {
        let _ = is_valid_header(data, arch);
    }
});
