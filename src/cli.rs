// Command-line front end for Pixdelta.
//
// Subcommands:
//   map      — run the pixel run encoder over two images
//   diff     — byte-level diff of two files
//   compare  — run the run encoder, then compress its output with each backend
//   config   — print build/configuration details

use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use log::info;

use crate::compress::backend::{BackendSet, CompressOptions};
use crate::compress::report;
use crate::delta::{self, MapperOptions, bytes};
use crate::io::load_image;
use crate::pixel::{ImageSource, PixelDepth, RawImage, SIMILARITY_THRESHOLD};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Run-based image and byte delta encoder with compression comparisons.
#[derive(Parser, Debug)]
#[command(
    name = "pixdelta",
    version,
    about = "Image/byte delta encoder and compression comparison",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output results as JSON to stdout.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode the pixel changes between two images as run tokens.
    Map(MapArgs),
    /// Sparse byte diff of two files.
    Diff(DiffArgs),
    /// Encode image changes, then compare compressors on the result.
    Compare(CompareArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct PairArgs {
    /// Reference (previous) image.
    #[arg(value_hint = ValueHint::FilePath)]
    reference: PathBuf,

    /// Candidate (current) image.
    #[arg(value_hint = ValueHint::FilePath)]
    candidate: PathBuf,

    /// Similarity percentage at or above which a pixel counts as unchanged.
    #[arg(long, default_value_t = SIMILARITY_THRESHOLD, value_parser = parse_threshold)]
    threshold: f32,
}

#[derive(Args, Debug)]
struct MapArgs {
    #[command(flatten)]
    pair: PairArgs,

    /// Write the token stream to this file.
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Reference file.
    #[arg(value_hint = ValueHint::FilePath)]
    reference: PathBuf,

    /// Candidate file.
    #[arg(value_hint = ValueHint::FilePath)]
    candidate: PathBuf,

    /// Write the serialized diff to this file.
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CompareArgs {
    #[command(flatten)]
    pair: PairArgs,

    /// Quality 0-100, mapped onto each codec's level range.
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100), default_value_t = 50)]
    quality: u32,

    /// Comma-separated backends (gzip, deflate, lzma, lz4, zstd) or "all".
    #[arg(long, value_parser = BackendSet::parse_list, default_value = "all")]
    backends: BackendSet,

    /// Baseline size for ratios (default: candidate file size on disk).
    #[arg(long)]
    baseline: Option<usize>,

    /// Prime Zstandard with the reference image's raw pixels.
    #[arg(long = "dictionary-from-reference")]
    dictionary_from_reference: bool,

    /// Run every quality from 100 down to 0 in steps of 5.
    #[arg(long, conflicts_with = "quality")]
    sweep: bool,
}

const SWEEP_STEP: usize = 5;

/// Qualities one `compare` invocation runs, highest first.
fn compare_qualities(args: &CompareArgs) -> Vec<u32> {
    if args.sweep {
        (0..=100).rev().step_by(SWEEP_STEP).collect()
    } else {
        vec![args.quality]
    }
}

fn parse_threshold(s: &str) -> Result<f32, String> {
    let v: f32 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid threshold '{s}': {e}"))?;
    if (0.0..=100.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("threshold {v} is outside 0-100"))
    }
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Copy)]
struct Globals {
    force: bool,
    quiet: bool,
    json: bool,
}

/// Parse without running anything (fuzz target entry).
#[cfg(feature = "fuzzing")]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("pixdelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    let _ = Cli::try_parse_from(argv);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_or_report(path: &Path) -> Option<RawImage> {
    match load_image(path) {
        Ok(img) => Some(img),
        Err(e) => {
            eprintln!("pixdelta: {e}");
            None
        }
    }
}

fn write_output(path: &Path, data: &[u8], force: bool) -> bool {
    if path.exists() && !force {
        eprintln!(
            "pixdelta: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return false;
    }
    if let Err(e) = std::fs::write(path, data) {
        eprintln!("pixdelta: output file: {}: {e}", path.display());
        return false;
    }
    true
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("pixdelta: json: {e}"),
    }
}

/// Load both images and run the encoder over them.
fn map_pair(pair: &PairArgs) -> Option<(RawImage, RawImage, Vec<u8>)> {
    let mut reference = load_or_report(&pair.reference)?;
    let mut candidate = load_or_report(&pair.candidate)?;
    let opts = MapperOptions {
        threshold: pair.threshold,
    };
    match delta::map_images(&mut reference, &mut candidate, opts) {
        Ok(stream) => Some((reference, candidate, stream)),
        Err(e) => {
            eprintln!("pixdelta: map: {e}");
            None
        }
    }
}

fn token_len(img: &RawImage) -> usize {
    PixelDepth::from_bits(img.bits_per_pixel()).map_or(1, |d| 1 + d.token_sample_len())
}

// ---------------------------------------------------------------------------
// Map command
// ---------------------------------------------------------------------------

fn cmd_map(g: Globals, args: &MapArgs) -> i32 {
    let Some((_, candidate, stream)) = map_pair(&args.pair) else {
        return 1;
    };

    if let Some(path) = &args.output
        && !write_output(path, &stream, g.force)
    {
        return 1;
    }

    let pixels = u64::from(candidate.width()) * u64::from(candidate.height());
    let tokens = stream.len() / token_len(&candidate);
    info!("map: {pixels} pixels -> {tokens} tokens");

    if g.json {
        print_json(&serde_json::json!({
            "command": "map",
            "width": candidate.width(),
            "height": candidate.height(),
            "bits_per_pixel": candidate.bits_per_pixel(),
            "raw_size": candidate.data().len(),
            "tokens": tokens,
            "stream_size": stream.len(),
        }));
    } else if !g.quiet {
        println!(
            "{}x{} {} bpp: raw {} bytes, {tokens} tokens, stream {} bytes",
            candidate.width(),
            candidate.height(),
            candidate.bits_per_pixel(),
            candidate.data().len(),
            stream.len()
        );
    }
    0
}

// ---------------------------------------------------------------------------
// Diff command
// ---------------------------------------------------------------------------

fn cmd_diff(g: Globals, args: &DiffArgs) -> i32 {
    let read = |path: &Path| match std::fs::read(path) {
        Ok(data) => Some(data),
        Err(e) => {
            eprintln!("pixdelta: input file: {}: {e}", path.display());
            None
        }
    };
    let (Some(reference), Some(candidate)) = (read(&args.reference), read(&args.candidate)) else {
        return 1;
    };

    let diff = bytes::encode(&reference, &candidate);

    if let Some(path) = &args.output
        && !write_output(path, &diff.to_bytes(), g.force)
    {
        return 1;
    }

    let changed = diff.count_changed_bytes();
    let tail = diff.tail().map_or(0, <[u8]>::len);
    if g.json {
        print_json(&serde_json::json!({
            "command": "diff",
            "reference_size": reference.len(),
            "candidate_size": candidate.len(),
            "spans": diff.spans().len(),
            "tail": tail,
            "changed_bytes": changed,
        }));
    } else if !g.quiet {
        println!(
            "{} spans, {tail} tail bytes, {changed} changed bytes",
            diff.spans().len()
        );
    }
    0
}

// ---------------------------------------------------------------------------
// Compare command
// ---------------------------------------------------------------------------

fn cmd_compare(g: Globals, args: &CompareArgs) -> i32 {
    let Some((reference, _, stream)) = map_pair(&args.pair) else {
        return 1;
    };

    let baseline = match args.baseline {
        Some(n) => n,
        None => match std::fs::metadata(&args.pair.candidate) {
            Ok(m) => m.len() as usize,
            Err(e) => {
                eprintln!(
                    "pixdelta: candidate file: {}: {e}",
                    args.pair.candidate.display()
                );
                return 1;
            }
        },
    };

    // Byte diff of the encoded files, reported next to the compressors.
    let read = |path: &Path| match std::fs::read(path) {
        Ok(data) => Some(data),
        Err(e) => {
            eprintln!("pixdelta: input file: {}: {e}", path.display());
            None
        }
    };
    let (Some(ref_file), Some(cand_file)) = (read(&args.pair.reference), read(&args.pair.candidate))
    else {
        return 1;
    };
    let start = Instant::now();
    let diff_size = bytes::encode(&ref_file, &cand_file).count_changed_bytes();
    let diff_elapsed = start.elapsed();

    let mut runs = Vec::new();
    for quality in compare_qualities(args) {
        let opts = CompressOptions {
            quality,
            dictionary: args
                .dictionary_from_reference
                .then(|| reference.data().to_vec()),
        };
        let backends = match args.backends.build(&opts) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("pixdelta: {e}");
                return 1;
            }
        };

        let mut report = match report::compare(&stream, baseline, &backends) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("pixdelta: compress: {e}");
                return 1;
            }
        };
        report.push_measured("diff", diff_size, diff_elapsed);
        info!("quality {quality}: best {:?}", report.best().map(|e| &e.backend));
        runs.push((quality, report));
    }

    if g.json {
        let mut values: Vec<serde_json::Value> = runs
            .iter()
            .map(|(quality, report)| {
                let mut v = report.to_json();
                v["quality"] = serde_json::json!(quality);
                v
            })
            .collect();
        if args.sweep {
            print_json(&serde_json::json!({ "sweep": values }));
        } else if let Some(v) = values.pop() {
            print_json(&v);
        }
    } else if !g.quiet {
        for (quality, report) in &runs {
            if args.sweep {
                println!("quality {quality}:");
            }
            print!("{}", report.render());
            println!("passed: {}", entry_names(report.passed(100.0)));
            println!("not passed: {}", entry_names(report.failed(100.0)));
        }
    }
    0
}

fn entry_names<'r>(entries: impl Iterator<Item = &'r report::ReportEntry>) -> String {
    let v: Vec<String> = entries
        .map(|e| format!("{} ({:.3}%)", e.backend, e.ratio_percent))
        .collect();
    if v.is_empty() {
        "none".to_string()
    } else {
        v.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    println!("pixdelta version {version}");
    println!("BACKEND_GZIP={}", cfg!(feature = "gzip") as u8);
    println!("BACKEND_LZMA={}", cfg!(feature = "lzma") as u8);
    println!("BACKEND_LZ4={}", cfg!(feature = "lz4") as u8);
    println!("BACKEND_ZSTD={}", cfg!(feature = "zstd") as u8);
    println!("SIMILARITY_THRESHOLD={SIMILARITY_THRESHOLD}");
    println!("MAX_RUN={}", delta::mapper::MAX_RUN);
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.quiet, cli.verbose)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    let g = Globals {
        force: cli.force,
        quiet: cli.quiet,
        json: cli.json_output,
    };
    log::debug!("{g:?}");

    let exit_code = match &cli.command {
        Cmd::Map(args) => cmd_map(g, args),
        Cmd::Diff(args) => cmd_diff(g, args),
        Cmd::Compare(args) => cmd_compare(g, args),
        Cmd::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
