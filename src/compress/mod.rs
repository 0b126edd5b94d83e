// General-purpose compression of prepared byte streams.
//
// - `backend` — CompressBackend trait, built-in codecs, BackendKind/BackendSet
// - `level`   — quality (0-100) to per-codec level mapping
// - `report`  — size/ratio/timing comparison across backends

pub mod backend;
pub mod level;
pub mod report;

pub use backend::{BackendKind, BackendSet, CompressBackend, CompressOptions};
pub use report::{CompressionReport, ReportEntry, compare};
