#![no_main]
use libfuzzer_sys::fuzz_target;
use pixdelta::delta::{ByteDiff, bytes};

fuzz_target!(|data: &[u8]| {
    // The parser must never panic, and anything it accepts must apply
    // to a base of the recorded length.
    if let Ok(diff) = ByteDiff::from_bytes(data) {
        if diff.base_len() <= 1 << 20 {
            let base = vec![0u8; diff.base_len()];
            let _ = diff.apply(&base);
        }
    }

    // Split the input and check the diff rebuilds the longer half.
    let (a, b) = data.split_at(data.len() / 2);
    let diff = bytes::encode(a, b);
    let (shorter, longer) = if a.len() > b.len() { (b, a) } else { (a, b) };
    assert_eq!(diff.apply(shorter).unwrap(), longer);
});
