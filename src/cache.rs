// Suffix-array resolution cache.
//
// Resolving a suffix-array row to a joined-genome offset is the expensive
// step of walking a seed hit's range.  The cache remembers resolutions per
// range so walkers for the same range (within a read, across a worker's
// reads, or on other workers entirely) skip the lookup.
//
// One cache is shared by all workers.  Locking is per range: each range's
// resolution array sits behind its own mutex, and a resolver holds that
// lock for the duration of one lookup, so at most one worker resolves a
// given element and queries snapshot a consistent view of the array.  The
// cache is valid for one reference epoch; clear it if the index changes.

use crate::seeds::QVal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A large range is handed out as several tuples of at most this many
/// elements, so partially-walked ranges keep their resolution arrays small.
pub const SA_TUPLE_CHUNK: usize = 4096;

type RangeSlots = Arc<Mutex<Vec<Option<u64>>>>;

/// One chunk of a suffix-array range together with the cached resolutions
/// known so far.  `offs[i]` is the joined offset of row `top + i`, or
/// `None` if not yet resolved.
#[derive(Debug, Clone)]
pub struct SaTuple {
    pub top: u64,
    pub offs: Vec<Option<u64>>,
}

impl SaTuple {
    #[inline]
    pub fn len(&self) -> usize {
        self.offs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offs.is_empty()
    }
}

/// Cross-worker cache mapping SA ranges to partially resolved offsets.
#[derive(Debug, Default)]
pub struct AlignmentCache {
    ranges: RwLock<HashMap<(u64, u32), RangeSlots>>,
}

impl AlignmentCache {
    pub fn new() -> Self {
        AlignmentCache::default()
    }

    /// Per-range lock entry, created on first sight of the range.
    fn range(&self, qv: &QVal) -> RangeSlots {
        let key = (qv.top, qv.len);
        {
            let map = self.ranges.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = map.get(&key) {
                return Arc::clone(entry);
            }
        }
        let mut map = self.ranges.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            map.entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(vec![None; qv.len as usize]))),
        )
    }

    /// Decompose a range into SA tuples, snapshotting whatever
    /// resolutions the cache already holds.  An unseen range gets a fresh
    /// entry.
    pub fn query_qval(&self, qv: &QVal) -> Vec<SaTuple> {
        let entry = self.range(qv);
        let slots = entry.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tups = Vec::with_capacity(slots.len().div_ceil(SA_TUPLE_CHUNK));
        let mut start = 0usize;
        while start < slots.len() {
            let end = (start + SA_TUPLE_CHUNK).min(slots.len());
            tups.push(SaTuple {
                top: qv.top + start as u64,
                offs: slots[start..end].to_vec(),
            });
            start = end;
        }
        tups
    }

    /// Look up element `elt` (relative to the range start), running
    /// `resolver` under the range lock if it has not been resolved yet.
    /// Returns the joined offset and whether it came from the cache.
    pub fn resolve<F>(&self, qv: &QVal, elt: usize, resolver: F) -> (u64, bool)
    where
        F: FnOnce() -> u64,
    {
        let entry = self.range(qv);
        let mut slots = entry.lock().unwrap_or_else(PoisonError::into_inner);
        match slots[elt] {
            Some(joined) => (joined, true),
            None => {
                let joined = resolver();
                slots[elt] = Some(joined);
                (joined, false)
            }
        }
    }

    /// Cached resolution for element `elt`, if any.  Does not create an
    /// entry for an unseen range.
    pub fn resolved(&self, qv: &QVal, elt: usize) -> Option<u64> {
        let map = self.ranges.read().unwrap_or_else(PoisonError::into_inner);
        let entry = Arc::clone(map.get(&(qv.top, qv.len))?);
        drop(map);
        let slots = entry.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(elt).copied().flatten()
    }

    /// Number of ranges seen so far.
    pub fn len(&self) -> usize {
        self.ranges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached range, e.g. at a reference epoch boundary.
    pub fn clear(&self) {
        self.ranges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
