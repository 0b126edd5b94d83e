#![no_main]
use libfuzzer_sys::fuzz_target;
use pixdelta::delta::{self, MapperOptions, TokenReader, mapper::covered_pixels};
use pixdelta::pixel::{PixelDepth, RawImage};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let width = u32::from(data[0] % 32) + 1;
    let height = u32::from(data[1] % 32) + 1;
    let bits = [8u16, 24, 32][usize::from(data[2] % 3)];
    let pixels = &data[3..];
    let at = |i: usize| pixels.get(i).copied().unwrap_or(0);

    let mut before = RawImage::new(width, height, bits);
    let mut after = RawImage::new(width, height, bits);
    before.fill_with(|x, y| {
        let i = (y * width + x) as usize;
        [at(i), at(i + 1), at(i + 2), 255]
    });
    after.fill_with(|x, y| {
        let i = (y * width + x) as usize + pixels.len() / 2;
        [at(i), at(i + 1), at(i + 2), 255]
    });

    let stream = delta::map_images(&mut before, &mut after, MapperOptions::default()).unwrap();
    let depth = PixelDepth::from_bits(bits).unwrap();
    let tokens: Vec<_> = TokenReader::new(stream, depth)
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(covered_pixels(&tokens) <= u64::from(width) * u64::from(height));
});
