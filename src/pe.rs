// Paired-end policy surface.
//
// The policy decides where the opposite mate of an anchor alignment may
// land and whether a candidate pair satisfies the fragment constraints.
// The driver consumes the trait; a fragment-length/orientation
// implementation is provided for the common forward/reverse library
// layout.

/// Verdict on a candidate mate pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairClass {
    /// Mates satisfy the fragment constraints
    Concordant,
    /// Concordant, with the mates' extents overlapping
    Overlap,
    /// Concordant, with one mate containing the other
    Contained,
    /// Mates violate the fragment constraints
    Discordant,
}

/// Where the opposite mate may be placed, relative to the anchor.
///
/// The mate's leftmost reference position must fall within `[ll, lr]` and
/// its rightmost within `[rl, rr]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MateSearchWindow {
    /// True iff the window lies to the left of the anchor
    pub left: bool,
    /// Orientation the mate is expected to align in
    pub fw: bool,
    pub ll: i64,
    pub lr: i64,
    pub rl: i64,
    pub rr: i64,
}

/// Fragment-placement policy consumed by the paired extension path.
pub trait PairedEndPolicy {
    /// Compute the search window for the mate opposite an anchor
    /// alignment, or `None` when no placement could satisfy the
    /// constraints.  `ocols` is the maximum number of reference columns
    /// the mate alignment may span.
    #[allow(clippy::too_many_arguments)]
    fn other_mate(
        &self,
        anchor1: bool,
        anchor_fw: bool,
        anchor_off: i64,
        ocols: u64,
        tlen: u64,
        len1: u64,
        len2: u64,
    ) -> Option<MateSearchWindow>;

    /// Classify a finished candidate pair.
    #[allow(clippy::too_many_arguments)]
    fn classify_pair(
        &self,
        off1: i64,
        len1: u64,
        fw1: bool,
        off2: i64,
        len2: u64,
        fw2: bool,
    ) -> PairClass;
}

/// Forward/reverse ("FR") fragment policy: mates face each other and the
/// fragment length must fall within `[min_frag, max_frag]`.
#[derive(Debug, Clone, Copy)]
pub struct FrFragmentPolicy {
    pub min_frag: u64,
    pub max_frag: u64,
}

impl PairedEndPolicy for FrFragmentPolicy {
    fn other_mate(
        &self,
        anchor1: bool,
        anchor_fw: bool,
        anchor_off: i64,
        ocols: u64,
        tlen: u64,
        len1: u64,
        len2: u64,
    ) -> Option<MateSearchWindow> {
        let min_frag = self.min_frag as i64;
        let max_frag = self.max_frag as i64;
        let ocols = ocols as i64;
        if anchor_fw {
            // Mate lies downstream, reverse-complemented.  Its rightmost
            // character ends the fragment.
            let rl = anchor_off + min_frag - 1;
            let rr = anchor_off + max_frag - 1;
            if rl >= tlen as i64 {
                return None;
            }
            Some(MateSearchWindow {
                left: false,
                fw: false,
                ll: (rl - ocols + 1).max(anchor_off),
                lr: rr,
                rl,
                rr,
            })
        } else {
            // Anchor is the downstream mate; the fragment ends at its
            // rightmost character, so the opposite mate starts it.
            let anchor_len = (if anchor1 { len1 } else { len2 }) as i64;
            let frag_end = anchor_off + anchor_len;
            let ll = frag_end - max_frag;
            let lr = frag_end - min_frag;
            if lr < 0 {
                return None;
            }
            Some(MateSearchWindow {
                left: true,
                fw: true,
                ll,
                lr,
                rl: ll,
                rr: frag_end.min(tlen as i64),
            })
        }
    }

    fn classify_pair(
        &self,
        off1: i64,
        len1: u64,
        fw1: bool,
        off2: i64,
        len2: u64,
        fw2: bool,
    ) -> PairClass {
        // FR layout: exactly one mate forward, and the forward mate
        // upstream of the reverse mate.
        if fw1 == fw2 {
            return PairClass::Discordant;
        }
        let (fw_off, fw_end, rc_off, rc_end) = if fw1 {
            (off1, off1 + len1 as i64, off2, off2 + len2 as i64)
        } else {
            (off2, off2 + len2 as i64, off1, off1 + len1 as i64)
        };
        if fw_off > rc_off {
            return PairClass::Discordant;
        }
        let frag = (rc_end - fw_off) as u64;
        if frag < self.min_frag || frag > self.max_frag {
            return PairClass::Discordant;
        }
        if fw_off <= rc_off && fw_end >= rc_end {
            PairClass::Contained
        } else if fw_end > rc_off {
            PairClass::Overlap
        } else {
            PairClass::Concordant
        }
    }
}
