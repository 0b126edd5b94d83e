#![cfg(feature = "cli")]

use std::path::Path;
use std::process::Command;

use pixdelta::delta::ByteDiff;
use pixdelta::io::save_image;
use pixdelta::pixel::RawImage;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_pixdelta").to_string()
}

fn write_pair(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let reference = dir.join("before.png");
    let candidate = dir.join("after.png");

    let mut before = RawImage::new(32, 32, 24);
    before.fill_with(|_, _| [10, 20, 30, 0]);
    let mut after = before.clone();
    after.fill_with(|x, y| if x == 5 && y == 5 { [255, 255, 255, 0] } else { [10, 20, 30, 0] });

    save_image(&before, &reference).unwrap();
    save_image(&after, &candidate).unwrap();
    (reference, candidate)
}

#[test]
fn cli_map_writes_token_stream() {
    let dir = tempdir().unwrap();
    let (reference, candidate) = write_pair(dir.path());
    let out = dir.path().join("tokens.bin");

    let st = Command::new(bin())
        .arg("map")
        .arg(&reference)
        .arg(&candidate)
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(st.success());

    // Changed pixel at index 5*32+5 = 165 closes a run of 165 unchanged
    // pixels. The remaining 858 saturate three times; the last 90 are dropped.
    let tokens = std::fs::read(&out).unwrap();
    assert_eq!(
        tokens,
        [
            165, 255, 255, 255, //
            255, 30, 20, 10, //
            255, 30, 20, 10, //
            255, 30, 20, 10,
        ]
    );
}

#[test]
fn cli_refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let (reference, candidate) = write_pair(dir.path());
    let out = dir.path().join("tokens.bin");
    std::fs::write(&out, b"keep").unwrap();

    let st = Command::new(bin())
        .arg("map")
        .arg(&reference)
        .arg(&candidate)
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(!st.success());
    assert_eq!(std::fs::read(&out).unwrap(), b"keep");

    let st = Command::new(bin())
        .arg("-f")
        .arg("map")
        .arg(&reference)
        .arg(&candidate)
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(st.success());
    assert_ne!(std::fs::read(&out).unwrap(), b"keep");
}

#[test]
fn cli_map_size_mismatch_fails() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    save_image(&RawImage::new(4, 4, 24), &a).unwrap();
    save_image(&RawImage::new(4, 5, 24), &b).unwrap();

    let out = Command::new(bin()).arg("map").arg(&a).arg(&b).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("pixdelta:"));
}

#[test]
fn cli_diff_output_applies() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    let out = dir.path().join("diff.bin");
    std::fs::write(&a, b"abcde12345abcde12345").unwrap();
    std::fs::write(&b, b"abcdeXXXXXabcde12345!").unwrap();

    let res = Command::new(bin())
        .arg("--json")
        .arg("diff")
        .arg(&a)
        .arg(&b)
        .arg("-o")
        .arg(&out)
        .output()
        .unwrap();
    assert!(res.status.success());

    let json: serde_json::Value = serde_json::from_slice(&res.stdout).unwrap();
    assert_eq!(json["spans"], 1);
    assert_eq!(json["tail"], 1);
    assert_eq!(json["changed_bytes"], 6);

    let diff = ByteDiff::from_bytes(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(
        diff.apply(&std::fs::read(&a).unwrap()).unwrap(),
        std::fs::read(&b).unwrap()
    );
}

#[test]
fn cli_compare_reports_backends() {
    let dir = tempdir().unwrap();
    let (reference, candidate) = write_pair(dir.path());

    let res = Command::new(bin())
        .arg("--json")
        .arg("compare")
        .arg(&reference)
        .arg(&candidate)
        .args(["--backends", "gzip,zstd", "--quality", "90"])
        .arg("--dictionary-from-reference")
        .output()
        .unwrap();
    assert!(res.status.success());

    let json: serde_json::Value = serde_json::from_slice(&res.stdout).unwrap();
    let entries = json["entries"].as_array().unwrap();
    let names: Vec<&str> = entries
        .iter()
        .map(|e| e["backend"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["gzip", "zstd", "diff"]);
    assert_eq!(json["quality"], 90);
    assert_eq!(
        json["baseline_len"].as_u64().unwrap(),
        std::fs::metadata(&candidate).unwrap().len()
    );

    let changed = pixdelta::delta::bytes::encode(
        &std::fs::read(&reference).unwrap(),
        &std::fs::read(&candidate).unwrap(),
    )
    .count_changed_bytes();
    assert_eq!(entries[2]["size"].as_u64().unwrap(), changed as u64);
}

#[test]
fn cli_compare_sweep_covers_quality_range() {
    let dir = tempdir().unwrap();
    let (reference, candidate) = write_pair(dir.path());

    let res = Command::new(bin())
        .arg("--json")
        .arg("compare")
        .arg(&reference)
        .arg(&candidate)
        .args(["--backends", "gzip", "--sweep"])
        .output()
        .unwrap();
    assert!(res.status.success());

    let json: serde_json::Value = serde_json::from_slice(&res.stdout).unwrap();
    let runs = json["sweep"].as_array().unwrap();
    let qualities: Vec<u64> = runs.iter().map(|r| r["quality"].as_u64().unwrap()).collect();
    let expected: Vec<u64> = (0..=100).rev().step_by(5).collect();
    assert_eq!(qualities, expected);
    for run in runs {
        let names: Vec<&str> = run["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["backend"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["gzip", "diff"]);
    }
}

#[test]
fn cli_compare_text_output() {
    let dir = tempdir().unwrap();
    let (reference, candidate) = write_pair(dir.path());

    let res = Command::new(bin())
        .arg("compare")
        .arg(&reference)
        .arg(&candidate)
        .args(["--backends", "lz4", "--baseline", "1000000"])
        .output()
        .unwrap();
    assert!(res.status.success());
    let text = String::from_utf8_lossy(&res.stdout);
    assert!(text.contains("lz4"));
    assert!(text.contains("passed: lz4"));
}

#[test]
fn cli_missing_input_fails() {
    let dir = tempdir().unwrap();
    let st = Command::new(bin())
        .arg("map")
        .arg(dir.path().join("nope.png"))
        .arg(dir.path().join("nope2.png"))
        .status()
        .unwrap();
    assert!(!st.success());
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("MAX_RUN=255"));
}
