use pixdelta::compress::{self, BackendKind, BackendSet, CompressBackend, CompressOptions};
use pixdelta::delta::{self, MapperOptions};
use pixdelta::pixel::RawImage;

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((s >> 33) as u8);
    }
    out
}

fn token_stream() -> Vec<u8> {
    let mut before = RawImage::new(320, 200, 24);
    let mut after = RawImage::new(320, 200, 24);
    before.fill_with(|x, y| [(x % 7) as u8, (y % 5) as u8, 40, 0]);
    after.fill_with(|x, y| {
        if (x / 16 + y / 16) % 3 == 0 {
            [200, 10, (x ^ y) as u8, 0]
        } else {
            [(x % 7) as u8, (y % 5) as u8, 40, 0]
        }
    });
    delta::map_images(&mut before, &mut after, MapperOptions::default()).unwrap()
}

#[test]
fn every_available_backend_roundtrips() {
    let data = token_stream();
    for quality in [0, 50, 100] {
        let opts = CompressOptions {
            quality,
            dictionary: None,
        };
        for backend in BackendSet::available().build(&opts).unwrap() {
            let packed = backend.compress(&data).unwrap();
            assert_eq!(
                backend.decompress(&packed).unwrap(),
                data,
                "{} at quality {quality}",
                backend.name()
            );
        }
    }
}

#[test]
fn empty_input_roundtrips() {
    for backend in BackendSet::available().build(&CompressOptions::default()).unwrap() {
        let packed = backend.compress(&[]).unwrap();
        assert!(backend.decompress(&packed).unwrap().is_empty(), "{}", backend.name());
    }
}

#[cfg(feature = "zstd")]
#[test]
fn zstd_dictionary_helps_and_is_required() {
    let reference = gen_data(64 * 1024, 3);
    let mut input = reference[1000..9000].to_vec();
    input[100] ^= 0xFF;

    let plain = BackendKind::Zstd.build(&CompressOptions::default()).unwrap();
    let primed = BackendKind::Zstd
        .build(&CompressOptions {
            quality: 50,
            dictionary: Some(reference),
        })
        .unwrap();

    let plain_out = plain.compress(&input).unwrap();
    let primed_out = primed.compress(&input).unwrap();
    assert!(primed_out.len() < plain_out.len() / 4);
    assert_eq!(primed.decompress(&primed_out).unwrap(), input);
    assert_ne!(plain.decompress(&primed_out).ok(), Some(input));
}

#[cfg(feature = "gzip")]
#[test]
fn higher_quality_does_not_grow_output() {
    let data = token_stream();
    let size = |quality| {
        BackendKind::Gzip
            .build(&CompressOptions {
                quality,
                dictionary: None,
            })
            .unwrap()
            .compress(&data)
            .unwrap()
            .len()
    };
    assert!(size(100) <= size(0));
}

#[test]
fn report_over_token_stream() {
    let data = token_stream();
    let baseline = 320 * 200 * 3;
    let backends = BackendSet::available().build(&CompressOptions::default()).unwrap();
    let report = compress::compare(&data, baseline, &backends).unwrap();

    assert_eq!(report.input_len, data.len());
    assert_eq!(report.entries.len(), backends.len());
    for entry in &report.entries {
        let expected = entry.size as f64 * 100.0 / baseline as f64;
        assert!((entry.ratio_percent - expected).abs() < 1e-9);
    }
    assert_eq!(
        report.passed(100.0).count() + report.failed(100.0).count(),
        report.entries.len()
    );
}

#[test]
fn backend_names_parse_back() {
    for kind in BackendKind::ALL {
        assert_eq!(BackendKind::from_name(kind.name()), Some(kind));
        assert_eq!(kind.to_string(), kind.name());
    }
    let set = BackendSet::parse_list(" Zstd , gzip ").unwrap();
    assert_eq!(
        set.kinds().collect::<Vec<_>>(),
        [BackendKind::Gzip, BackendKind::Zstd]
    );
    assert!(BackendSet::parse_list("gzip,bogus").is_err());
}

#[test]
fn custom_backend_joins_report() {
    struct Identity;
    impl CompressBackend for Identity {
        fn name(&self) -> &str {
            "identity"
        }
        fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
            Ok(data.to_vec())
        }
        fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
            Ok(data.to_vec())
        }
    }

    let backends: Vec<Box<dyn CompressBackend>> = vec![Box::new(Identity)];
    let report = compress::compare(b"0123456789", 10, &backends).unwrap();
    assert_eq!(report.entries[0].ratio_percent, 100.0);
    assert_eq!(report.failed(100.0).count(), 1);
}
