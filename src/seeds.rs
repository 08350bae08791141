// Seed hits produced by upstream seed discovery, ranked for extension.
//
// A seed hit pairs a seed's placement on the read with the suffix-array
// range its exact/near-exact matches occupy.  Hits with smaller ranges are
// more specific and are extended first.

/// One suffix-array range: `len` rows starting at `top`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QVal {
    /// First suffix-array row of the range
    pub top: u64,
    /// Number of rows in the range; 0 means the seed did not match
    pub len: u32,
}

impl QVal {
    pub fn new(top: u64, len: u32) -> Self {
        QVal { top, len }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A seed placement and the range of reference positions it matched.
#[derive(Debug, Clone, Copy)]
pub struct SeedHit {
    /// Index of the seed offset within the read's seed layout
    pub offidx: u32,
    /// Offset of the seed from the 5' end of the forward representation,
    /// regardless of which representation it was extracted from
    pub rdoff: u32,
    /// Seed length
    pub seedlen: u32,
    /// True iff extracted from the forward representation
    pub fw: bool,
    /// Matching suffix-array range
    pub qv: QVal,
}

/// Fw/rc breakdown of seed search work, for per-read summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub seeds_tried: usize,
    pub nonzero: usize,
    pub ranges: u64,
    pub elts: u64,
    pub seeds_tried_fw: usize,
    pub nonzero_fw: usize,
    pub ranges_fw: u64,
    pub elts_fw: u64,
    pub seeds_tried_rc: usize,
    pub nonzero_rc: usize,
    pub ranges_rc: u64,
    pub elts_rc: u64,
}

/// All seed hits for one read, ordered by rank (smaller range first).
#[derive(Debug, Clone, Default)]
pub struct SeedResults {
    hits: Vec<SeedHit>,
    /// Seed offsets tried per strand
    num_offs: usize,
    tried_fw: usize,
    tried_rc: usize,
    sorted: bool,
}

impl SeedResults {
    pub fn new(num_offs: usize) -> Self {
        SeedResults {
            hits: Vec::new(),
            num_offs,
            tried_fw: num_offs,
            tried_rc: num_offs,
            sorted: false,
        }
    }

    /// Record the outcome of one seed lookup.  Empty ranges contribute to
    /// the tallies but are not ranked for extension.
    pub fn add(&mut self, hit: SeedHit) {
        if !hit.qv.is_empty() {
            self.hits.push(hit);
            self.sorted = false;
        }
    }

    /// Sort hits so rank 0 has the smallest (most specific) range.  Ties
    /// keep insertion order.
    pub fn rank(&mut self) {
        self.hits.sort_by_key(|h| h.qv.len);
        self.sorted = true;
    }

    /// Number of seeds with a non-empty range.
    #[inline]
    pub fn nonzero_offsets(&self) -> usize {
        self.hits.len()
    }

    /// Hit at the given rank.  `rank()` must have been called.
    #[inline]
    pub fn hit_by_rank(&self, i: usize) -> &SeedHit {
        debug_assert!(self.sorted || self.hits.len() <= 1);
        &self.hits[i]
    }

    #[inline]
    pub fn num_offs(&self) -> usize {
        self.num_offs
    }

    pub fn summary(&self) -> SeedSummary {
        let mut s = SeedSummary {
            seeds_tried: self.tried_fw + self.tried_rc,
            seeds_tried_fw: self.tried_fw,
            seeds_tried_rc: self.tried_rc,
            ..SeedSummary::default()
        };
        for h in &self.hits {
            s.nonzero += 1;
            s.ranges += 1;
            s.elts += h.qv.len as u64;
            if h.fw {
                s.nonzero_fw += 1;
                s.ranges_fw += 1;
                s.elts_fw += h.qv.len as u64;
            } else {
                s.nonzero_rc += 1;
                s.ranges_rc += 1;
                s.elts_rc += h.qv.len as u64;
            }
        }
        s
    }
}
