// Suffix-array range walker.
//
// A walker drains the SA range of one seed hit, yielding the joined
// reference offset of one element per call.  When the range is larger
// than the row budget it is first narrowed to an exact-size uniform
// sample (without replacement), so a walker never yields more than
// `maxrows` elements.  Resolutions are shared through the AlignmentCache;
// the walker keeps a lock-free local snapshot and only takes the range
// lock for elements nobody has resolved yet.

use crate::cache::{AlignmentCache, SaTuple};
use crate::index::Index;
use crate::metrics::WalkMetrics;
use crate::seeds::QVal;
use rand::RngCore;
use std::collections::BTreeSet;

/// One resolved suffix-array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkResult {
    /// Element index within the (un-narrowed) range
    pub elt: usize,
    /// Length of the seed hit the range belongs to
    pub len: u32,
    /// Joined-genome offset of the element
    pub joined: u64,
}

/// Walks one seed hit's SA range, at most `maxrows` elements.
#[derive(Debug)]
pub struct SaRangeWalker {
    qv: QVal,
    seedlen: u32,
    satups: Vec<SaTuple>,
    /// Sorted element sample when the range was narrowed
    sample: Option<Vec<usize>>,
    cur: usize,
}

impl SaRangeWalker {
    /// Set up a walker for `qv`.  `maxrows == 0` disables narrowing.
    pub fn init(
        qv: QVal,
        seedlen: u32,
        maxrows: usize,
        cache: &AlignmentCache,
        rnd: &mut dyn RngCore,
        wlm: &mut WalkMetrics,
    ) -> Self {
        let satups = cache.query_qval(&qv);
        let total = qv.len as usize;
        let sample = if maxrows != 0 && total > maxrows {
            wlm.narrowed += 1;
            Some(sample_without_replacement(total, maxrows, rnd))
        } else {
            None
        };
        SaRangeWalker {
            qv,
            seedlen,
            satups,
            sample,
            cur: 0,
        }
    }

    /// Number of elements this walker will yield in total.
    pub fn total(&self) -> usize {
        match &self.sample {
            Some(s) => s.len(),
            None => self.qv.len as usize,
        }
    }

    #[inline]
    pub fn done(&self) -> bool {
        self.cur >= self.total()
    }

    /// Yield the next element, resolving through the cache or the index.
    pub fn next<I: Index + ?Sized>(
        &mut self,
        idx: &I,
        cache: &AlignmentCache,
        wlm: &mut WalkMetrics,
    ) -> Option<WalkResult> {
        if self.done() {
            return None;
        }
        let elt = match &self.sample {
            Some(s) => s[self.cur],
            None => self.cur,
        };
        self.cur += 1;
        let joined = match self.lookup(elt) {
            Some(j) => {
                wlm.cache_hits += 1;
                j
            }
            None => {
                // Another worker may beat us to this element; the range
                // lock makes exactly one of us run the lookup
                let qv = self.qv;
                let (j, was_cached) =
                    cache.resolve(&qv, elt, || idx.resolve_sa(qv.top + elt as u64));
                if was_cached {
                    wlm.cache_hits += 1;
                } else {
                    wlm.resolves += 1;
                }
                self.store(elt, j);
                j
            }
        };
        wlm.elts += 1;
        Some(WalkResult {
            elt,
            len: self.seedlen,
            joined,
        })
    }

    fn lookup(&self, elt: usize) -> Option<u64> {
        let (t, i) = self.tuple_pos(elt);
        self.satups[t].offs[i]
    }

    fn store(&mut self, elt: usize, joined: u64) {
        let (t, i) = self.tuple_pos(elt);
        self.satups[t].offs[i] = Some(joined);
    }

    fn tuple_pos(&self, elt: usize) -> (usize, usize) {
        let mut rem = elt;
        for (t, tup) in self.satups.iter().enumerate() {
            if rem < tup.len() {
                return (t, rem);
            }
            rem -= tup.len();
        }
        unreachable!("element index beyond range")
    }
}

/// Choose `k` distinct indices uniformly from `0..n`, returned in
/// ascending order so narrowed walkers still yield in SA order.
fn sample_without_replacement(n: usize, k: usize, rnd: &mut dyn RngCore) -> Vec<usize> {
    debug_assert!(k <= n);
    // Floyd's sampling: k iterations regardless of n.
    let mut chosen = BTreeSet::new();
    for j in (n - k)..n {
        let t = (rnd.next_u32() as usize) % (j + 1);
        if !chosen.insert(t) {
            chosen.insert(j);
        }
    }
    chosen.into_iter().collect()
}
