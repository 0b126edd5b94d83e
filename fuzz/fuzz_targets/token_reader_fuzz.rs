#![no_main]
use libfuzzer_sys::fuzz_target;
use pixdelta::delta::TokenReader;
use pixdelta::pixel::PixelDepth;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must parse to tokens or a single Truncated error.
    for depth in [PixelDepth::Gray8, PixelDepth::Bgr24, PixelDepth::Bgra32] {
        let errors = TokenReader::new(data.iter().copied(), depth)
            .filter(|t| t.is_err())
            .count();
        assert!(errors <= 1);
    }
});
