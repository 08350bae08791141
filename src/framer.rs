// Banded DP framing.
//
// Given a tentative reference offset for a read, the framer lays out a
// parallelogram-shaped band wide enough to cover every cell reachable
// within the gap budget, then reconciles it with the reference
// boundaries.  Columns are diagonals: column `j` of a `rows`-row problem
// occupies reference positions `refl + j` (first row) through
// `refl + j + rows - 1` (last row).

use crate::pe::MateSearchWindow;

/// A framed band: geometry plus the start/end column masks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpFrame {
    /// Number of band columns
    pub width: usize,
    /// Columns dropped from the upstream side for reference bounds
    pub trimup: usize,
    /// Columns dropped from the downstream side
    pub trimdn: usize,
    /// Reference position of the first row of the first column
    pub refl: i64,
    /// Reference position of the last row of the last column
    pub refr: i64,
    /// Columns an alignment may legally start in
    pub st: Vec<bool>,
    /// Columns an alignment may legally end in
    pub en: Vec<bool>,
}

impl DpFrame {
    /// Band-geometry identity: `refr - refl + 1 == width + rows - 1`.
    pub fn rows(&self) -> usize {
        (self.refr - self.refl + 1) as usize - self.width + 1
    }
}

/// Frames seed-extension and mate-search DP problems.
#[derive(Debug, Clone, Copy)]
pub struct DpFramer {
    /// Disallow bands that extend past reference ends
    trim_to_ref: bool,
}

impl DpFramer {
    pub fn new(trim_to_ref: bool) -> Self {
        DpFramer { trim_to_ref }
    }

    /// Frame the band for extending a seed hit whose gapless placement
    /// puts the read's first character at reference offset `refoff`.
    ///
    /// Returns `None` when no legal band remains (the hit hangs off the
    /// reference and overhangs are disallowed).
    pub fn frame_seed_extension(
        &self,
        refoff: i64,
        rows: usize,
        tlen: u64,
        max_read_gaps: usize,
        max_ref_gaps: usize,
        maxhalf: usize,
    ) -> Option<DpFrame> {
        debug_assert!(rows > 0);
        let half = max_read_gaps.max(max_ref_gaps).min(maxhalf) as i64;
        let width = (2 * half + 1) as usize;
        let refl = refoff - half;
        let refr = refoff + half + rows as i64 - 1;
        let mut frame = DpFrame {
            width,
            trimup: 0,
            trimdn: 0,
            refl,
            refr,
            st: vec![true; width],
            en: vec![true; width],
        };
        if self.trim_to_ref {
            self.trim(&mut frame, rows, tlen)?;
        }
        Some(frame)
    }

    /// Frame the band for locating the opposite mate inside the fragment
    /// window supplied by the paired-end policy: the mate's leftmost
    /// character must fall in `[ll, lr]` and its rightmost in `[rl, rr]`.
    pub fn frame_find_mate(
        &self,
        win: &MateSearchWindow,
        rows: usize,
        tlen: u64,
        max_read_gaps: usize,
        max_ref_gaps: usize,
        maxhalf: usize,
    ) -> Option<DpFrame> {
        debug_assert!(rows > 0);
        if win.lr < win.ll || win.rr < win.rl {
            return None;
        }
        // Band covers every diagonal that can host a legal start or end,
        // padded by the gap budget so a gapped path may wander outside
        // that range and come back.
        let pad = max_read_gaps.max(max_ref_gaps).min(maxhalf) as i64;
        let first_diag = win.ll.min(win.rl - rows as i64 + 1) - pad;
        let last_diag = win.lr.max(win.rr - rows as i64 + 1) + pad;
        if last_diag < first_diag {
            return None;
        }
        let width = (last_diag - first_diag + 1) as usize;
        let refl = first_diag;
        let refr = last_diag + rows as i64 - 1;
        let mut st = vec![false; width];
        let mut en = vec![false; width];
        for j in 0..width {
            let diag = refl + j as i64;
            st[j] = diag >= win.ll && diag <= win.lr;
            let end = diag + rows as i64 - 1;
            en[j] = end >= win.rl && end <= win.rr;
        }
        let mut frame = DpFrame {
            width,
            trimup: 0,
            trimdn: 0,
            refl,
            refr,
            st,
            en,
        };
        if self.trim_to_ref {
            self.trim(&mut frame, rows, tlen)?;
        }
        if !frame.st.iter().any(|&b| b) || !frame.en.iter().any(|&b| b) {
            return None;
        }
        Some(frame)
    }

    /// Remove columns lying entirely outside the reference and mask
    /// starts/ends that would overhang.  Fails when nothing legal is left.
    fn trim(&self, frame: &mut DpFrame, rows: usize, tlen: u64) -> Option<()> {
        let width = frame.width as i64;
        let rows = rows as i64;
        let tlen = tlen as i64;
        // Column j is entirely left of the reference when even its last
        // row is negative, entirely right when its first row is past the
        // end.
        let mut trimup = 0i64;
        while trimup < width && frame.refl + trimup + rows - 1 < 0 {
            trimup += 1;
        }
        let mut trimdn = 0i64;
        while trimdn < width - trimup && frame.refl + (width - 1 - trimdn) >= tlen {
            trimdn += 1;
        }
        if trimup + trimdn >= width {
            return None;
        }
        let new_width = (width - trimup - trimdn) as usize;
        frame.st.drain(..trimup as usize);
        frame.st.truncate(new_width);
        frame.en.drain(..trimup as usize);
        frame.en.truncate(new_width);
        frame.refl += trimup;
        frame.refr -= trimdn;
        frame.width = new_width;
        frame.trimup = trimup as usize;
        frame.trimdn = trimdn as usize;
        for j in 0..new_width {
            let diag = frame.refl + j as i64;
            if diag < 0 {
                frame.st[j] = false;
            }
            if diag + rows - 1 >= tlen {
                frame.en[j] = false;
            }
        }
        if !frame.st.iter().any(|&b| b) || !frame.en.iter().any(|&b| b) {
            return None;
        }
        Some(())
    }
}
