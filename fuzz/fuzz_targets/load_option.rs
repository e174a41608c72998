#![no_main]

use bootscout_core::scan::{firmware::LoadOption, legacy::bbs::BbsNode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(option) = LoadOption::parse(data) {
        let _ = BbsNode::parse(&option.device_path).map(|x| x.volume_kind());
    }
});
