// External banded-DP filler interface.
//
// The driver frames each subproblem and hands it to an `SwAligner`; the
// filler owns the recurrences, scratch tables, and backtrace.  Alignments
// are pulled one at a time until `done()`.

use crate::framer::DpFrame;
use crate::index::Reference;
use crate::metrics::SwMetrics;
use crate::read::Read;
use crate::res::AlnRes;
use crate::scoring::Scoring;
use rand::RngCore;

/// One framed DP problem: read, orientation, reference window, masks and
/// score limits.
pub struct DpRequest<'a> {
    pub rd: &'a Read,
    /// Align the forward or reverse-complement representation
    pub fw: bool,
    pub color: bool,
    /// Reference sequence to align against
    pub tidx: usize,
    /// Length of that sequence
    pub tlen: u64,
    pub frame: &'a DpFrame,
    pub refs: &'a dyn Reference,
    pub sc: &'a Scoring,
    /// Minimum score for a valid alignment
    pub minsc: i64,
    /// Local-mode cell floor
    pub floorsc: i64,
    /// Maximum N positions permitted
    pub nceil: usize,
}

/// Banded DP filler consumed by the extension driver.
pub trait SwAligner {
    /// Accept a framed problem.  Clears any previous state.
    fn init(&mut self, req: DpRequest<'_>);

    /// Fill the table; true iff at least one valid alignment exists.
    fn align(&mut self, rnd: &mut dyn RngCore) -> bool;

    /// No more alignments will come out of `next_alignment`.
    fn done(&self) -> bool;

    /// Backtrace and return the next valid alignment, if any.
    fn next_alignment(&mut self, rnd: &mut dyn RngCore) -> Option<AlnRes>;

    /// Fold fill-phase counters into `m`, leaving this filler's zeroed.
    fn merge_align_counters(&mut self, m: &mut SwMetrics);

    fn reset_align_counters(&mut self);

    /// Fold backtrace counters into `m`.
    fn merge_backtrace_counters(&mut self, m: &mut SwMetrics);

    fn reset_backtrace_counters(&mut self);
}
