//! Seed-extension driver and alignment reporting for a short-read
//! aligner.
//!
//! The crate turns ranked seed hits (exact/near-exact anchor matches
//! located through a genome-wide index) into full read-to-reference
//! alignments via banded dynamic programming, and decides which
//! alignments to emit under the configured reporting limits, including
//! paired-end semantics (concordant, discordant, unpaired-mixed).
//!
//! The FM-index, the DP recurrences, and the output formats live behind
//! traits ([`index::Index`], [`dp::SwAligner`], [`sink::Formatter`]); this
//! crate owns the orchestration: walking suffix-array ranges with
//! deduplication and random narrowing, framing band-limited DP problems,
//! suppressing redundant work, and running the per-read reporting state
//! machine.

pub mod cache;
pub mod driver;
pub mod dp;
pub mod framer;
pub mod index;
pub mod metrics;
pub mod pe;
pub mod pipeline;
pub mod policy;
pub mod read;
pub mod redundancy;
pub mod reporting;
pub mod res;
pub mod scoring;
pub mod seeds;
pub mod sink;
pub mod walker;

pub use driver::{ExtendConfig, ScoreParams, SwDriver};
pub use policy::{PolicyError, SeedPolicy};
pub use read::Read;
pub use reporting::{ReportTotals, ReportingParams, ReportingState};
pub use res::AlnRes;
pub use scoring::Scoring;
pub use seeds::{QVal, SeedHit, SeedResults};
pub use sink::{Formatter, RecordKind, ReportSink};
