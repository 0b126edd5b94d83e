// Size / ratio / timing comparison across backends.
//
// One prepared byte stream (a delta token stream, a serialized byte diff,
// raw pixels...) is compressed by every selected backend. Each entry records
// the output size, its ratio against a caller-chosen baseline length (for
// example the size of a conventionally encoded image), wall time and input
// throughput.

use std::fmt::Write as _;
use std::io;
use std::time::{Duration, Instant};

use log::debug;

use super::backend::CompressBackend;

const MIB: f64 = 1024.0 * 1024.0;

/// Result of one backend run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub backend: String,
    /// Compressed size in bytes.
    pub size: usize,
    /// `size` as a percentage of the baseline length.
    pub ratio_percent: f64,
    pub elapsed: Duration,
}

/// Entries for every backend, in run order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionReport {
    /// Bytes fed to each backend.
    pub input_len: usize,
    /// Length ratios are measured against.
    pub baseline_len: usize,
    pub entries: Vec<ReportEntry>,
}

/// Compress `input` with each backend and time it.
pub fn compare(
    input: &[u8],
    baseline_len: usize,
    backends: &[Box<dyn CompressBackend>],
) -> io::Result<CompressionReport> {
    let mut entries = Vec::with_capacity(backends.len());
    for backend in backends {
        let start = Instant::now();
        let out = backend.compress(input)?;
        let elapsed = start.elapsed();

        debug!(
            "{}: {} -> {} bytes in {:.3}s",
            backend.name(),
            input.len(),
            out.len(),
            elapsed.as_secs_f64()
        );

        entries.push(ReportEntry {
            backend: backend.name().to_string(),
            size: out.len(),
            ratio_percent: ratio_percent(out.len(), baseline_len),
            elapsed,
        });
    }
    Ok(CompressionReport {
        input_len: input.len(),
        baseline_len,
        entries,
    })
}

/// `size * 100 / baseline`; an empty baseline counts as one byte.
pub fn ratio_percent(size: usize, baseline: usize) -> f64 {
    size as f64 * 100.0 / baseline.max(1) as f64
}

impl CompressionReport {
    /// Append a size measured outside any backend (e.g. a byte diff's
    /// changed-byte count), rated against the same baseline.
    pub fn push_measured(&mut self, name: &str, size: usize, elapsed: Duration) {
        self.entries.push(ReportEntry {
            backend: name.to_string(),
            size,
            ratio_percent: ratio_percent(size, self.baseline_len),
            elapsed,
        });
    }

    /// Input MiB per second for `entry`, `None` if it took no measurable time.
    pub fn throughput_mib_s(&self, entry: &ReportEntry) -> Option<f64> {
        let secs = entry.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.input_len as f64 / (secs * MIB))
    }

    /// Entries whose ratio beats `threshold_percent`.
    pub fn passed(&self, threshold_percent: f64) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(move |e| e.ratio_percent < threshold_percent)
    }

    /// Entries at or above `threshold_percent`.
    pub fn failed(&self, threshold_percent: f64) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(move |e| e.ratio_percent >= threshold_percent)
    }

    /// Smallest output, if any backend ran.
    pub fn best(&self) -> Option<&ReportEntry> {
        self.entries.iter().min_by_key(|e| e.size)
    }

    /// Human-readable table, one line per backend.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "input: {} bytes, baseline: {} bytes",
            self.input_len, self.baseline_len
        );
        for e in &self.entries {
            let rate = self
                .throughput_mib_s(e)
                .map_or_else(|| "-".to_string(), |r| format!("{r:.2} MB/s"));
            let _ = writeln!(
                out,
                "  {:<8} => size: {:>10}; ratio: {:>8.3}%; elapsed: {:.3}s; rate: {rate}",
                e.backend,
                e.size,
                e.ratio_percent,
                e.elapsed.as_secs_f64()
            );
        }
        out
    }

    /// Structured form for `--json` output.
    #[cfg(feature = "cli")]
    pub fn to_json(&self) -> serde_json::Value {
        let entries: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "backend": e.backend,
                    "size": e.size,
                    "ratio_percent": e.ratio_percent,
                    "elapsed_secs": e.elapsed.as_secs_f64(),
                    "throughput_mib_s": self.throughput_mib_s(e),
                })
            })
            .collect();
        serde_json::json!({
            "input_len": self.input_len,
            "baseline_len": self.baseline_len,
            "entries": entries,
        })
    }
}
