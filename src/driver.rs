// Seed-extension driver.
//
// Drains ranked seed hits into full alignments: each hit's suffix-array
// range is walked element by element; every fresh anchor coordinate is
// framed into a banded DP problem and handed to the filler; surviving
// alignments are deduplicated and offered to the sink.  The paired path
// additionally searches for the opposite mate inside the fragment window
// after every successful anchor alignment.
//
// Redundancy control is layered: a coordinate set per mate stops repeat
// DP work at an anchor position, an interval set over emitted alignments
// stops duplicate results, and separate per-mate interval sets guard
// unpaired reporting in mixed mode.

use crate::cache::AlignmentCache;
use crate::dp::{DpRequest, SwAligner};
use crate::framer::DpFramer;
use crate::index::{Index, Reference};
use crate::metrics::{SwMetrics, WalkMetrics};
use crate::pe::{PairClass, PairedEndPolicy};
use crate::read::Read;
use crate::redundancy::{AlnSet, CoordSet};
use crate::res::{AlnRes, Coord};
use crate::scoring::Scoring;
use crate::seeds::SeedResults;
use crate::sink::{Formatter, ReportSink};
use crate::walker::SaRangeWalker;
use rand::RngCore;

/// Driver knobs that stay fixed across reads.
#[derive(Debug, Clone)]
pub struct ExtendConfig {
    /// Mismatches allowed in a seed (annotation only)
    pub seedmms: u32,
    /// Seed length (annotation only)
    pub seedlen: u32,
    /// Interval between seeds (annotation only)
    pub seedival: u32,
    /// Seed positions examined: at least `posmin`, plus `posfrac` of the
    /// remainder
    pub posmin: f32,
    pub posfrac: f32,
    /// Extension budget coefficients; only `rowmult` is consulted (it
    /// rounds to the per-seed row budget)
    pub rowmin: f32,
    pub rowmult: f32,
    /// Cap on band half-width
    pub maxhalf: usize,
    /// Keep alignments that overhang reference ends
    pub report_overhangs: bool,
}

impl ExtendConfig {
    /// Per-position row budget implied by `rowmult`.
    #[inline]
    pub fn max_rows(&self) -> usize {
        (self.rowmult + 0.5) as usize
    }
}

/// Score limits for one mate, computed per read length.
#[derive(Debug, Clone, Copy)]
pub struct ScoreParams {
    /// Minimum score for a valid alignment
    pub minsc: i64,
    /// Local-mode cell floor
    pub floorsc: i64,
    /// Maximum N positions
    pub nceil: usize,
}

/// Per-read extension state.  Reset with `next_read` at each new read.
#[derive(Default)]
pub struct SwDriver {
    walkers: Vec<SaRangeWalker>,
    red_seed1: CoordSet,
    red_seed2: CoordSet,
    red_anchor: AlnSet,
    red_mate1: AlnSet,
    red_mate2: AlnSet,
}

impl SwDriver {
    pub fn new() -> Self {
        SwDriver::default()
    }

    /// Clear all per-read state.
    pub fn next_read(&mut self) {
        self.walkers.clear();
        self.red_seed1.clear();
        self.red_seed2.clear();
        self.red_anchor.clear();
        self.red_mate1.clear();
        self.red_mate2.clear();
    }

    /// Wire one walker per non-empty seed hit, narrowing ranges to the
    /// row budget.
    pub fn set_up_sa_range_state(
        &mut self,
        sh: &SeedResults,
        maxrows: usize,
        cache: &AlignmentCache,
        rnd: &mut dyn RngCore,
        wlm: &mut WalkMetrics,
    ) {
        let nonz = sh.nonzero_offsets();
        self.walkers.clear();
        self.walkers.reserve(nonz);
        for i in 0..nonz {
            let hit = sh.hit_by_rank(i);
            self.walkers
                .push(SaRangeWalker::init(hit.qv, hit.seedlen, maxrows, cache, rnd, wlm));
        }
    }

    /// Number of ranked seed positions to examine for `nonz` non-empty
    /// seeds.
    fn positions_to_examine(cfg: &ExtendConfig, nonz: usize) -> usize {
        let mut possf = cfg.posmin + cfg.posfrac * (nonz as f32 - cfg.posmin) + 0.5;
        possf = possf.max(1.0);
        possf = possf.min(nonz as f32);
        possf as usize
    }

    /// Extend the seed hits of an unpaired read (or one mate treated as
    /// unpaired) into full alignments, reporting each to the sink.
    ///
    /// Returns true iff the sink short-circuited the search.
    #[allow(clippy::too_many_arguments)]
    pub fn extend_seeds<I, R, A, F>(
        &mut self,
        rd: &Read,
        mate1: bool,
        sh: &SeedResults,
        idx: &I,
        refs: &R,
        swa: &mut A,
        sc: &Scoring,
        cfg: &ExtendConfig,
        sp: &ScoreParams,
        cache: &AlignmentCache,
        rnd: &mut dyn RngCore,
        wlm: &mut WalkMetrics,
        swm: &mut SwMetrics,
        sink: &mut ReportSink<'_, F>,
    ) -> bool
    where
        I: Index + ?Sized,
        R: Reference,
        A: SwAligner,
        F: Formatter,
    {
        let rdlen = rd.len();
        let read_gaps = sc.max_read_gaps(sp.minsc, rdlen);
        let ref_gaps = sc.max_ref_gaps(sp.minsc, rdlen);
        let maxrows = cfg.max_rows();
        let framer = DpFramer::new(!cfg.report_overhangs);
        self.set_up_sa_range_state(sh, maxrows, cache, rnd, wlm);
        let nonz = sh.nonzero_offsets();
        let poss = Self::positions_to_examine(cfg, nonz);
        let rows = rdlen + usize::from(rd.color);
        for i in 0..poss {
            let hit = *sh.hit_by_rank(i);
            // Rebase a reverse-complement seed offset onto the upstream
            // end of the forward read
            let rdoff = if hit.fw {
                hit.rdoff
            } else {
                rdlen as u32 - hit.rdoff - hit.seedlen
            };
            while !self.walkers[i].done() {
                let Some(wr) = self.walkers[i].next(idx, cache, wlm) else {
                    break;
                };
                let c = Coord::new(0, wr.joined as i64 - rdoff as i64, hit.fw);
                if !self.red_seed1.insert(c) {
                    // Anchor position already tried
                    swm.rshit += 1;
                    continue;
                }
                let Some((tidx, toff, tlen)) = idx.joined_to_text_off(wr.len, wr.joined) else {
                    // Hit straddles a sequence boundary
                    continue;
                };
                let tlen = tlen + u64::from(rd.color);
                let refoff = toff as i64 - rdoff as i64;
                let Some(frame) = framer.frame_seed_extension(
                    refoff,
                    rows,
                    tlen,
                    read_gaps,
                    ref_gaps,
                    cfg.maxhalf,
                ) else {
                    continue;
                };
                swa.init(DpRequest {
                    rd,
                    fw: hit.fw,
                    color: rd.color,
                    tidx,
                    tlen,
                    frame: &frame,
                    refs,
                    sc,
                    minsc: sp.minsc,
                    floorsc: sp.floorsc,
                    nceil: sp.nceil,
                });
                let found = swa.align(rnd);
                swa.merge_align_counters(swm);
                swa.reset_align_counters();
                if !found {
                    continue;
                }
                while !swa.done() {
                    let Some(mut res) = swa.next_alignment(rnd) else {
                        break;
                    };
                    swa.merge_backtrace_counters(swm);
                    swa.reset_backtrace_counters();
                    if !cfg.report_overhangs && !res.within(tidx, tlen) {
                        continue;
                    }
                    if self.red_anchor.overlap(&res) {
                        continue;
                    }
                    self.red_anchor.add(&res);
                    res.set_params(cfg.seedmms, cfg.seedlen, cfg.seedival, sp.minsc, sp.floorsc);
                    let (r1, r2) = if mate1 {
                        (Some(&res), None)
                    } else {
                        (None, Some(&res))
                    };
                    if sink.report(r1, r2) {
                        // Limit reached; search is over
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Extend the anchor mate's seed hits and, for each anchor alignment,
    /// search for the opposite mate inside the fragment window.  Pairs
    /// are classified and reported; in mixed mode the individual mates
    /// are offered as unpaired candidates too.
    ///
    /// Returns true iff the sink short-circuited the whole read.
    #[allow(clippy::too_many_arguments)]
    pub fn extend_seeds_paired<I, R, A, P, F>(
        &mut self,
        rd: &Read,
        ord: &Read,
        anchor1: bool,
        sh: &SeedResults,
        idx: &I,
        refs: &R,
        swa: &mut A,
        oswa: &mut A,
        sc: &Scoring,
        pepol: &P,
        cfg: &ExtendConfig,
        sp: &ScoreParams,
        osp: &ScoreParams,
        cache: &AlignmentCache,
        rnd: &mut dyn RngCore,
        wlm: &mut WalkMetrics,
        swm_seed: &mut SwMetrics,
        swm_mate: &mut SwMetrics,
        sink: &mut ReportSink<'_, F>,
        mut sw_mate_immediately: bool,
    ) -> bool
    where
        I: Index + ?Sized,
        R: Reference,
        A: SwAligner,
        P: PairedEndPolicy,
        F: Formatter,
    {
        if sink.state().done_with_mate(anchor1) {
            return false;
        }
        let mixed = sink.state().params().mixed;
        let discord = sink.state().params().discord;
        let rdlen = rd.len();
        let ordlen = ord.len();
        let read_gaps = sc.max_read_gaps(sp.minsc, rdlen);
        let ref_gaps = sc.max_ref_gaps(sp.minsc, rdlen);
        let oread_gaps = sc.max_read_gaps(osp.minsc, ordlen);
        let oref_gaps = sc.max_ref_gaps(osp.minsc, ordlen);
        let maxrows = cfg.max_rows();
        let framer = DpFramer::new(!cfg.report_overhangs);
        self.set_up_sa_range_state(sh, maxrows, cache, rnd, wlm);
        let nonz = sh.nonzero_offsets();
        let poss = Self::positions_to_examine(cfg, nonz);
        let rows = rdlen + usize::from(rd.color);
        let orows = ordlen + usize::from(ord.color);
        for i in 0..poss {
            let hit = *sh.hit_by_rank(i);
            let rdoff = if hit.fw {
                hit.rdoff
            } else {
                rdlen as u32 - hit.rdoff - hit.seedlen
            };
            while !self.walkers[i].done() {
                let Some(wr) = self.walkers[i].next(idx, cache, wlm) else {
                    break;
                };
                let c = Coord::new(0, wr.joined as i64 - rdoff as i64, hit.fw);
                let red_seed = if anchor1 {
                    &mut self.red_seed1
                } else {
                    &mut self.red_seed2
                };
                if !red_seed.insert(c) {
                    swm_seed.rshit += 1;
                    continue;
                }
                let Some((tidx, toff, tlen)) = idx.joined_to_text_off(wr.len, wr.joined) else {
                    continue;
                };
                let tlen = tlen + u64::from(rd.color);
                let refoff = toff as i64 - rdoff as i64;
                let Some(frame) = framer.frame_seed_extension(
                    refoff,
                    rows,
                    tlen,
                    read_gaps,
                    ref_gaps,
                    cfg.maxhalf,
                ) else {
                    continue;
                };
                swa.init(DpRequest {
                    rd,
                    fw: hit.fw,
                    color: rd.color,
                    tidx,
                    tlen,
                    frame: &frame,
                    refs,
                    sc,
                    minsc: sp.minsc,
                    floorsc: sp.floorsc,
                    nceil: sp.nceil,
                });
                let found = swa.align(rnd);
                swa.merge_align_counters(swm_seed);
                swa.reset_align_counters();
                if !found {
                    continue;
                }
                // Each anchor alignment pulled out of the problem
                while !swa.done() {
                    let Some(mut res) = swa.next_alignment(rnd) else {
                        break;
                    };
                    swa.merge_backtrace_counters(swm_seed);
                    swa.reset_backtrace_counters();
                    if !cfg.report_overhangs && !res.within(tidx, tlen) {
                        continue;
                    }
                    if self.red_anchor.overlap(&res) {
                        continue;
                    }
                    self.red_anchor.add(&res);
                    res.set_params(cfg.seedmms, cfg.seedlen, cfg.seedival, sp.minsc, sp.floorsc);
                    if sink.state().done_with_mate(!anchor1)
                        && !sink.state().done_with_mate(anchor1)
                    {
                        // Opposite mate is finished; pairing up the
                        // anchor can't produce anything new
                        sw_mate_immediately = false;
                    }
                    if sw_mate_immediately {
                        // Prepare the opposite-mate problem
                        let mut mate_ready = false;
                        if !sink.state().done_concordant() {
                            if let Some(win) = pepol.other_mate(
                                anchor1,
                                res.fw,
                                res.refoff,
                                (orows + oread_gaps) as u64,
                                tlen,
                                (if anchor1 { rdlen } else { ordlen }) as u64,
                                (if anchor1 { ordlen } else { rdlen }) as u64,
                            ) {
                                if let Some(oframe) = framer.frame_find_mate(
                                    &win,
                                    orows,
                                    tlen,
                                    oread_gaps,
                                    oref_gaps,
                                    cfg.maxhalf,
                                ) {
                                    oswa.init(DpRequest {
                                        rd: ord,
                                        fw: win.fw,
                                        color: ord.color,
                                        tidx,
                                        tlen,
                                        frame: &oframe,
                                        refs,
                                        sc,
                                        minsc: osp.minsc,
                                        floorsc: osp.floorsc,
                                        nceil: osp.nceil,
                                    });
                                    mate_ready = oswa.align(rnd);
                                    oswa.merge_align_counters(swm_mate);
                                    oswa.reset_align_counters();
                                }
                            }
                        }
                        // Pull mate alignments; one pass runs even when
                        // the mate search came up empty so the anchor can
                        // be offered as an unpaired candidate.
                        loop {
                            let mut ores: Option<AlnRes> = None;
                            let mut found_mate = mate_ready;
                            if found_mate {
                                if oswa.done() {
                                    found_mate = false;
                                } else {
                                    ores = oswa.next_alignment(rnd);
                                    oswa.merge_backtrace_counters(swm_mate);
                                    oswa.reset_backtrace_counters();
                                    found_mate = ores.is_some();
                                }
                            }
                            if let Some(r) = ores.as_mut() {
                                if !self.red_anchor.overlap(r) {
                                    self.red_anchor.add(r);
                                }
                                r.set_params(
                                    cfg.seedmms,
                                    cfg.seedlen,
                                    cfg.seedival,
                                    osp.minsc,
                                    osp.floorsc,
                                );
                                if !cfg.report_overhangs && !r.within(tidx, tlen) {
                                    found_mate = false;
                                }
                            }
                            if found_mate {
                                let r = ores.as_ref().unwrap();
                                let (off1, len1, fw1, off2, len2, fw2) = if anchor1 {
                                    (res.refoff, res.extent, res.fw, r.refoff, r.extent, r.fw)
                                } else {
                                    (r.refoff, r.extent, r.fw, res.refoff, res.extent, res.fw)
                                };
                                found_mate = pepol
                                    .classify_pair(off1, len1, fw1, off2, len2, fw2)
                                    != PairClass::Discordant;
                            }
                            if sink.state().done_concordant() {
                                found_mate = false;
                            }
                            if found_mate {
                                let r = ores.as_ref().unwrap();
                                let (r1, r2) = if anchor1 { (&res, r) } else { (r, &res) };
                                if sink.report(Some(r1), Some(r2)) {
                                    return true;
                                }
                                if mixed || discord {
                                    // Offer each mate alone as well
                                    if !sink.state().done_unpaired(true)
                                        && !self.red_mate1.overlap(r1)
                                    {
                                        self.red_mate1.add(r1);
                                        if sink.report(Some(r1), None) {
                                            return true;
                                        }
                                    }
                                    if !sink.state().done_unpaired(false)
                                        && !self.red_mate2.overlap(r2)
                                    {
                                        self.red_mate2.add(r2);
                                        if sink.report(None, Some(r2)) {
                                            return true;
                                        }
                                    }
                                }
                                if sink.state().done_with_mate(anchor1) {
                                    // Done with this mate, not the read
                                    return false;
                                }
                            } else if mixed || discord {
                                if !sink.state().done_unpaired(anchor1) {
                                    let red = if anchor1 {
                                        &mut self.red_mate1
                                    } else {
                                        &mut self.red_mate2
                                    };
                                    if !red.overlap(&res) {
                                        red.add(&res);
                                        let (r1, r2) = if anchor1 {
                                            (Some(&res), None)
                                        } else {
                                            (None, Some(&res))
                                        };
                                        if sink.report(r1, r2) {
                                            return true;
                                        }
                                    }
                                }
                                if sink.state().done_with_mate(anchor1) {
                                    return false;
                                }
                            }
                            if ores.is_none() {
                                break;
                            }
                        }
                    } else if mixed || discord {
                        // Anchor aligned but no mate search was attempted
                        if !sink.state().done_unpaired(anchor1) {
                            let red = if anchor1 {
                                &mut self.red_mate1
                            } else {
                                &mut self.red_mate2
                            };
                            if !red.overlap(&res) {
                                red.add(&res);
                                let (r1, r2) = if anchor1 {
                                    (Some(&res), None)
                                } else {
                                    (None, Some(&res))
                                };
                                if sink.report(r1, r2) {
                                    return true;
                                }
                            }
                        }
                        if sink.state().done_with_mate(anchor1) {
                            return false;
                        }
                    }
                }
            }
        }
        false
    }
}
