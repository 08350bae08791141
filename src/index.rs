// Interfaces to the genome index and the reference sequence store.
//
// The FM-index itself lives upstream; the driver only needs to resolve
// suffix-array rows to joined-genome offsets and to map joined offsets
// back into (sequence, offset, length) coordinates.

/// Base code used for positions outside the reference or masked bases.
pub const AMBIG_BASE: u8 = 4;

/// Suffix-array / joined-genome surface consumed by the range walker and
/// the extension driver.
pub trait Index {
    /// Total length of the joined (concatenated) reference.
    fn joined_len(&self) -> u64;

    /// Resolve one suffix-array row to its joined-genome offset.
    fn resolve_sa(&self, row: u64) -> u64;

    /// Map a joined offset for a `len`-character hit to
    /// `(sequence index, offset within sequence, sequence length)`.
    /// Returns `None` when the hit straddles a sequence boundary.
    fn joined_to_text_off(&self, len: u32, joined: u64) -> Option<(usize, u64, u64)>;
}

/// Random-access reader over the individual reference sequences.
pub trait Reference {
    fn num_seqs(&self) -> usize;

    fn seq_len(&self, tidx: usize) -> u64;

    /// Copy `count` coded bases of sequence `tidx` starting at `start`
    /// into `dst` (which is cleared first).  Positions outside the
    /// sequence are filled with `AMBIG_BASE`, so callers may request
    /// windows that overhang either end.
    fn get_stretch(&self, tidx: usize, start: i64, count: usize, dst: &mut Vec<u8>);
}
