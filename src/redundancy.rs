// Redundancy suppression for anchor coordinates and emitted alignments.
//
// Two layers: a coordinate set that stops us re-running DP at an anchor
// position we already tried, and an interval set that stops us emitting a
// second alignment overlapping one we already reported on the same
// reference and strand.

use crate::res::{AlnRes, Coord};
use std::collections::{HashMap, HashSet};

/// Set of anchor coordinates already tried for a read.
#[derive(Debug, Default)]
pub struct CoordSet {
    set: HashSet<Coord>,
}

impl CoordSet {
    pub fn new() -> Self {
        CoordSet::default()
    }

    /// Insert `c`; returns `false` iff it was already present.
    pub fn insert(&mut self, c: Coord) -> bool {
        self.set.insert(c)
    }

    pub fn contains(&self, c: &Coord) -> bool {
        self.set.contains(c)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }
}

/// Reference intervals of alignments already emitted, per (refid, strand).
///
/// Two alignments are redundant iff they share refid and orientation and
/// their `[refoff, refoff+extent)` intervals intersect.  Interval lists
/// stay sorted by start; cardinality per key is small.
#[derive(Debug, Default)]
pub struct AlnSet {
    ivals: HashMap<(usize, bool), Vec<(i64, i64)>>,
}

impl AlnSet {
    pub fn new() -> Self {
        AlnSet::default()
    }

    /// Does `res` overlap an alignment already in the set?
    pub fn overlap(&self, res: &AlnRes) -> bool {
        let (start, end) = res.ref_interval();
        let Some(list) = self.ivals.get(&(res.refid, res.fw)) else {
            return false;
        };
        // First interval starting at or after `end` cannot overlap; check
        // the predecessor.
        let i = list.partition_point(|iv| iv.0 < end);
        i > 0 && list[i - 1].1 > start
    }

    /// Add `res`'s interval to the set.
    pub fn add(&mut self, res: &AlnRes) {
        let (start, end) = res.ref_interval();
        let list = self.ivals.entry((res.refid, res.fw)).or_default();
        let i = list.partition_point(|iv| iv.0 < start);
        list.insert(i, (start, end));
    }

    pub fn is_empty(&self) -> bool {
        self.ivals.is_empty()
    }

    pub fn clear(&mut self) {
        self.ivals.clear();
    }
}
