// Per-read alignment sink.
//
// The driver feeds candidate alignments into a `ReportSink` as it finds
// them; the sink keeps the per-read reporting state machine current and
// answers whether the search can stop.  At the end of the read it asks
// the state machine what to report, picks a random subset where required,
// and emits records through the formatter it borrows.

use crate::metrics::ReportingMetrics;
use crate::read::Read;
use crate::reporting::{ReportTotals, ReportingParams, ReportingState};
use crate::res::AlnRes;
use crate::seeds::{SeedResults, SeedSummary};
use rand::RngCore;
use std::io;

/// What kind of record a formatter is being handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    ConcordantPair,
    DiscordantPair,
    /// Mate 1 of a pair, reported alone
    UnpairedMate1,
    /// Mate 2 of a pair, reported alone
    UnpairedMate2,
    /// A read that was never part of a pair
    Unpaired,
}

/// Output surface for finished reads.  Implementations format SAM,
/// verbose records, or anything else; the sink only decides what gets
/// emitted.
pub trait Formatter {
    /// Emit the selected alignments for a read or pair.  `select[i] > 0`
    /// marks `rs*[i]` as selected, with `select[i] == 1` the primary.
    #[allow(clippy::too_many_arguments)]
    fn report_hits(
        &mut self,
        rd1: Option<&Read>,
        rd2: Option<&Read>,
        rdid: u64,
        kind: RecordKind,
        select: &[usize],
        rs1: Option<&[AlnRes]>,
        rs2: Option<&[AlnRes]>,
        maxed: bool,
    ) -> io::Result<()>;

    /// Emit a record for a read whose category exceeded the repeat
    /// ceiling; `rs` holds the accumulated candidates.
    fn report_maxed(
        &mut self,
        rd: &Read,
        rdid: u64,
        kind: RecordKind,
        rs: &[AlnRes],
    ) -> io::Result<()>;

    /// Emit a record for a read with nothing to report.
    fn report_unaligned(&mut self, rd: &Read, rdid: u64, kind: RecordKind) -> io::Result<()>;

    /// Emit a per-read seed summary.
    fn report_seed_summary(
        &mut self,
        rd: &Read,
        rdid: u64,
        summ: &SeedSummary,
    ) -> io::Result<()>;
}

/// Accumulates a read's candidate alignments and emits the final records.
pub struct ReportSink<'a, F: Formatter> {
    fmt: &'a mut F,
    st: ReportingState,
    rd1: Option<Read>,
    rd2: Option<Read>,
    rdid: u64,
    /// Concordant (or prepared discordant) results, parallel vectors
    rs1: Vec<AlnRes>,
    rs2: Vec<AlnRes>,
    /// Unpaired results per mate
    rs1u: Vec<AlnRes>,
    rs2u: Vec<AlnRes>,
    select: Vec<usize>,
    best_score: i64,
    init: bool,
}

impl<'a, F: Formatter> ReportSink<'a, F> {
    pub fn new(fmt: &'a mut F, params: ReportingParams) -> Self {
        ReportSink {
            fmt,
            st: ReportingState::new(params),
            rd1: None,
            rd2: None,
            rdid: 0,
            rs1: Vec::new(),
            rs2: Vec::new(),
            rs1u: Vec::new(),
            rs2u: Vec::new(),
            select: Vec::new(),
            best_score: i64::MIN,
            init: false,
        }
    }

    /// True iff the given pair is byte-identical to the previous read.
    pub fn same_read(&self, rd1: Option<&Read>, rd2: Option<&Read>, quals_matter: bool) -> bool {
        Read::same(rd1, self.rd1.as_ref(), quals_matter)
            && Read::same(rd2, self.rd2.as_ref(), quals_matter)
    }

    /// Begin a new read or pair, clearing all per-read state.
    pub fn next_read(&mut self, rd1: Option<&Read>, rd2: Option<&Read>, rdid: u64) {
        debug_assert!(!self.init);
        debug_assert!(rd1.is_some() || rd2.is_some());
        self.rd1 = rd1.cloned();
        self.rd2 = rd2.cloned();
        self.rdid = rdid;
        self.rs1.clear();
        self.rs2.clear();
        self.rs1u.clear();
        self.rs2u.clear();
        self.best_score = i64::MIN;
        self.st.next_read(self.read_is_pair());
        self.init = true;
    }

    #[inline]
    pub fn read_is_pair(&self) -> bool {
        self.rd1.is_some() && self.rd2.is_some()
    }

    #[inline]
    pub fn state(&self) -> &ReportingState {
        &self.st
    }

    pub fn empty(&self) -> bool {
        self.rs1.is_empty() && self.rs2.is_empty() && self.rs1u.is_empty() && self.rs2u.is_empty()
    }

    pub fn best_score(&self) -> i64 {
        self.best_score
    }

    /// Offer one alignment (or a concordant pair).  Returns true when the
    /// reporting policy is satisfied and the search can stop.
    pub fn report(&mut self, rs1: Option<&AlnRes>, rs2: Option<&AlnRes>) -> bool {
        debug_assert!(self.init);
        debug_assert!(rs1.is_some() || rs2.is_some());
        let paired = rs1.is_some() && rs2.is_some();
        let score;
        if paired {
            debug_assert!(self.read_is_pair());
            self.st.found_concordant();
            let mut a = rs1.unwrap().clone();
            let mut b = rs2.unwrap().clone();
            a.set_fragment(&b);
            b.set_fragment(&a);
            score = a.score + b.score;
            self.rs1.push(a);
            self.rs2.push(b);
        } else {
            let one = rs1.is_some();
            self.st.found_unpaired(one);
            let r = if one { rs1.unwrap() } else { rs2.unwrap() };
            score = r.score;
            if one {
                self.rs1u.push(r.clone());
            } else {
                self.rs2u.push(r.clone());
            }
        }
        if score > self.best_score {
            self.best_score = score;
        }
        self.st.done()
    }

    /// Close the read: finalize the state machine, select what to report,
    /// emit records, and update `met`.  Returns the per-category totals.
    pub fn finish_read(
        &mut self,
        sr1: Option<&SeedResults>,
        sr2: Option<&SeedResults>,
        rnd: &mut dyn RngCore,
        met: &mut ReportingMetrics,
        suppress_seed_summary: bool,
    ) -> io::Result<ReportTotals> {
        debug_assert!(self.init);
        if !suppress_seed_summary {
            if let Some(rd1) = &self.rd1 {
                let summ = sr1.map(|s| s.summary()).unwrap_or_default();
                self.fmt.report_seed_summary(rd1, self.rdid, &summ)?;
            }
            if let Some(rd2) = &self.rd2 {
                let summ = sr2.map(|s| s.summary()).unwrap_or_default();
                self.fmt.report_seed_summary(rd2, self.rdid, &summ)?;
            }
        }
        self.st.finish();
        let t = self.st.get_report();
        debug_assert!(t.nconcord as usize <= self.rs1.len());
        debug_assert!(t.nunpair1 as usize <= self.rs1u.len());
        debug_assert!(t.nunpair2 as usize <= self.rs2u.len());
        let paired = self.read_is_pair();
        met.nread += 1;
        if paired {
            met.npaired += 1;
        } else {
            met.nunpaired += 1;
        }
        if t.nconcord > 0 {
            select_alns_to_report(&self.rs1, t.nconcord, &mut self.select, rnd);
            self.fmt.report_hits(
                self.rd1.as_ref(),
                self.rd2.as_ref(),
                self.rdid,
                RecordKind::ConcordantPair,
                &self.select,
                Some(&self.rs1),
                Some(&self.rs2),
                t.pair_max,
            )?;
            if t.pair_max {
                met.nconcord_rep += 1;
            } else {
                met.nconcord_uni += 1;
            }
        } else if t.ndiscord > 0 {
            self.prepare_discordants();
            debug_assert_eq!(self.rs1.len(), 1);
            debug_assert_eq!(self.rs2.len(), 1);
            select_alns_to_report(&self.rs1, t.ndiscord, &mut self.select, rnd);
            self.fmt.report_hits(
                self.rd1.as_ref(),
                self.rd2.as_ref(),
                self.rdid,
                RecordKind::DiscordantPair,
                &self.select,
                Some(&self.rs1),
                Some(&self.rs2),
                false,
            )?;
            met.nconcord_0 += 1;
            met.ndiscord += 1;
        }
        if !paired || (t.nconcord == 0 && t.ndiscord == 0) || t.pair_max {
            if !t.pair_max && paired {
                met.nconcord_0 += 1;
            }
            if self.rd1.is_some() {
                tally_unpaired(met, paired, t.pair_max, t.nunpair1, t.unpair1_max);
            }
            if self.rd2.is_some() {
                tally_unpaired(met, paired, t.pair_max, t.nunpair2, t.unpair2_max);
            }
            if !t.pair_max || t.nconcord == 0 {
                let kind1 = if paired {
                    RecordKind::UnpairedMate1
                } else {
                    RecordKind::Unpaired
                };
                let kind2 = if paired {
                    RecordKind::UnpairedMate2
                } else {
                    RecordKind::Unpaired
                };
                if self.rd1.is_some() && t.nunpair1 > 0 {
                    select_alns_to_report(&self.rs1u, t.nunpair1, &mut self.select, rnd);
                    self.fmt.report_hits(
                        self.rd1.as_ref(),
                        None,
                        self.rdid,
                        kind1,
                        &self.select,
                        Some(&self.rs1u),
                        None,
                        t.unpair1_max,
                    )?;
                }
                if self.rd2.is_some() && t.nunpair2 > 0 {
                    select_alns_to_report(&self.rs2u, t.nunpair2, &mut self.select, rnd);
                    self.fmt.report_hits(
                        self.rd2.as_ref(),
                        None,
                        self.rdid,
                        kind2,
                        &self.select,
                        Some(&self.rs2u),
                        None,
                        t.unpair2_max,
                    )?;
                }
                if let Some(rd1) = &self.rd1 {
                    if t.nunpair1 == 0 {
                        if t.unpair1_max {
                            debug_assert!(!self.rs1u.is_empty());
                            self.fmt.report_maxed(rd1, self.rdid, kind1, &self.rs1u)?;
                        } else {
                            self.fmt.report_unaligned(rd1, self.rdid, kind1)?;
                        }
                    }
                }
                if let Some(rd2) = &self.rd2 {
                    if t.nunpair2 == 0 {
                        if t.unpair2_max {
                            debug_assert!(!self.rs2u.is_empty());
                            self.fmt.report_maxed(rd2, self.rdid, kind2, &self.rs2u)?;
                        } else {
                            self.fmt.report_unaligned(rd2, self.rdid, kind2)?;
                        }
                    }
                }
            }
        }
        self.init = false;
        Ok(t)
    }

    /// Copy the two unique unpaired results into the pair slate.  The
    /// unpaired vectors keep their contents; downstream consumers see a
    /// fresh pair.
    fn prepare_discordants(&mut self) {
        if self.rs1u.len() == 1 && self.rs2u.len() == 1 {
            debug_assert!(self.rs1.is_empty());
            debug_assert!(self.rs2.is_empty());
            let mut a = self.rs1u[0].clone();
            let mut b = self.rs2u[0].clone();
            a.set_fragment(&b);
            b.set_fragment(&a);
            self.rs1.push(a);
            self.rs2.push(b);
        }
    }
}

/// Mark `num` alignments for reporting: a uniformly random contiguous run
/// (wrapping) of the candidate list.  `select[i]` gets the 1-based pick
/// order, 0 for unselected; the returned index is the first pick, which
/// becomes the primary record.
pub fn select_alns_to_report(
    rs: &[AlnRes],
    num: u64,
    select: &mut Vec<usize>,
    rnd: &mut dyn RngCore,
) -> usize {
    debug_assert!(num > 0);
    let sz = rs.len();
    select.clear();
    select.resize(sz, 0);
    if sz == 0 {
        return 0;
    }
    if sz == 1 {
        select[0] = 1;
        return 0;
    }
    let mut off = (rnd.next_u32() as usize) % sz;
    let off_orig = off;
    let num = (num as usize).min(sz);
    for i in 1..=num {
        select[off] = i;
        off += 1;
        if off == sz {
            off = 0;
        }
    }
    off_orig
}

/// Per-mate contribution to the reporting tallies for a finished read.
fn tally_unpaired(
    met: &mut ReportingMetrics,
    paired: bool,
    pair_max: bool,
    nunpair: u64,
    unpair_max: bool,
) {
    if nunpair > 0 {
        if paired {
            if pair_max {
                if unpair_max {
                    met.nunp_rep_rep += 1;
                } else {
                    met.nunp_rep_uni += 1;
                }
            } else if unpair_max {
                met.nunp_0_rep += 1;
            } else {
                met.nunp_0_uni += 1;
            }
        } else if unpair_max {
            met.nunp_rep += 1;
        } else {
            met.nunp_uni += 1;
        }
    } else if unpair_max {
        if paired {
            if pair_max {
                met.nunp_rep_rep += 1;
            } else {
                met.nunp_0_rep += 1;
            }
        } else {
            met.nunp_rep += 1;
        }
    } else if paired {
        if pair_max {
            met.nunp_rep_0 += 1;
        } else {
            met.nunp_0_0 += 1;
        }
    } else {
        met.nunp_0 += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::ReportingParams;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct RecordingFormatter {
        hits: Vec<(RecordKind, usize, bool)>,
        maxed: Vec<RecordKind>,
        unaligned: Vec<RecordKind>,
        summaries: usize,
    }

    impl Formatter for RecordingFormatter {
        fn report_hits(
            &mut self,
            _rd1: Option<&Read>,
            _rd2: Option<&Read>,
            _rdid: u64,
            kind: RecordKind,
            select: &[usize],
            _rs1: Option<&[AlnRes]>,
            _rs2: Option<&[AlnRes]>,
            maxed: bool,
        ) -> io::Result<()> {
            let n = select.iter().filter(|&&s| s > 0).count();
            self.hits.push((kind, n, maxed));
            Ok(())
        }

        fn report_maxed(
            &mut self,
            _rd: &Read,
            _rdid: u64,
            kind: RecordKind,
            _rs: &[AlnRes],
        ) -> io::Result<()> {
            self.maxed.push(kind);
            Ok(())
        }

        fn report_unaligned(&mut self, _rd: &Read, _rdid: u64, kind: RecordKind) -> io::Result<()> {
            self.unaligned.push(kind);
            Ok(())
        }

        fn report_seed_summary(
            &mut self,
            _rd: &Read,
            _rdid: u64,
            _summ: &SeedSummary,
        ) -> io::Result<()> {
            self.summaries += 1;
            Ok(())
        }
    }

    fn res(off: i64) -> AlnRes {
        AlnRes::new(0, off, 50, true, 10, vec![])
    }

    fn read(name: &str, mate: u8) -> Read {
        Read::new(name, b"ACGTACGTAC", b"", mate)
    }

    #[test]
    fn test_selection_contiguous_wrap() {
        let rs: Vec<AlnRes> = (0..5).map(|i| res(i * 100)).collect();
        let mut select = Vec::new();
        let mut rnd = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            let off = select_alns_to_report(&rs, 3, &mut select, &mut rnd);
            assert_eq!(select.iter().filter(|&&s| s > 0).count(), 3);
            assert_eq!(select[off], 1);
            // Picks are contiguous mod len
            for i in 0..3 {
                assert_eq!(select[(off + i) % 5], i + 1);
            }
        }
    }

    #[test]
    fn test_selection_single_candidate() {
        let rs = vec![res(0)];
        let mut select = Vec::new();
        let mut rnd = StdRng::seed_from_u64(9);
        let off = select_alns_to_report(&rs, 5, &mut select, &mut rnd);
        assert_eq!(off, 0);
        assert_eq!(select, vec![1]);
    }

    #[test]
    fn test_unpaired_read_reports_up_to_k() {
        let mut fmt = RecordingFormatter::default();
        let params = ReportingParams::new(2, None, false, false, false);
        let mut sink = ReportSink::new(&mut fmt, params);
        let rd = read("r1", 0);
        sink.next_read(Some(&rd), None, 0);
        assert!(!sink.report(Some(&res(0)), None));
        assert!(sink.report(Some(&res(100)), None));
        let mut rnd = StdRng::seed_from_u64(1);
        let mut met = ReportingMetrics::default();
        let t = sink
            .finish_read(None, None, &mut rnd, &mut met, true)
            .unwrap();
        assert_eq!(t.nunpair1, 2);
        assert_eq!(fmt.hits, vec![(RecordKind::Unpaired, 2, false)]);
        assert_eq!(met.nunp_uni, 1);
        assert_eq!(met.nread, 1);
    }

    #[test]
    fn test_suppressed_read_reports_maxed_record() {
        let mut fmt = RecordingFormatter::default();
        let params = ReportingParams::new(2, Some(2), false, false, false);
        let mut sink = ReportSink::new(&mut fmt, params);
        let rd = read("r1", 0);
        sink.next_read(Some(&rd), None, 0);
        sink.report(Some(&res(0)), None);
        sink.report(Some(&res(100)), None);
        assert!(sink.report(Some(&res(200)), None));
        let mut rnd = StdRng::seed_from_u64(1);
        let mut met = ReportingMetrics::default();
        let t = sink
            .finish_read(None, None, &mut rnd, &mut met, true)
            .unwrap();
        assert_eq!(t.nunpair1, 0);
        assert!(t.unpair1_max);
        assert!(fmt.hits.is_empty());
        assert_eq!(fmt.maxed, vec![RecordKind::Unpaired]);
        assert_eq!(met.nunp_rep, 1);
    }

    #[test]
    fn test_unaligned_read_reports_placeholder() {
        let mut fmt = RecordingFormatter::default();
        let params = ReportingParams::new(1, None, false, false, false);
        let mut sink = ReportSink::new(&mut fmt, params);
        let rd = read("r1", 0);
        sink.next_read(Some(&rd), None, 0);
        let mut rnd = StdRng::seed_from_u64(1);
        let mut met = ReportingMetrics::default();
        sink.finish_read(None, None, &mut rnd, &mut met, true)
            .unwrap();
        assert_eq!(fmt.unaligned, vec![RecordKind::Unpaired]);
        assert_eq!(met.nunp_0, 1);
    }

    #[test]
    fn test_concordant_pair_flow() {
        let mut fmt = RecordingFormatter::default();
        let params = ReportingParams::new(1, None, false, true, true);
        let mut sink = ReportSink::new(&mut fmt, params);
        let (rd1, rd2) = (read("p", 1), read("p", 2));
        sink.next_read(Some(&rd1), Some(&rd2), 7);
        let a = res(100);
        let b = res(300);
        assert!(sink.report(Some(&a), Some(&b)));
        let mut rnd = StdRng::seed_from_u64(1);
        let mut met = ReportingMetrics::default();
        let t = sink
            .finish_read(None, None, &mut rnd, &mut met, true)
            .unwrap();
        assert_eq!(t.nconcord, 1);
        assert_eq!(fmt.hits, vec![(RecordKind::ConcordantPair, 1, false)]);
        assert_eq!(met.nconcord_uni, 1);
        assert!(fmt.unaligned.is_empty());
    }

    #[test]
    fn test_discordant_promotion_flow() {
        let mut fmt = RecordingFormatter::default();
        let params = ReportingParams::new(1, None, false, true, true);
        let mut sink = ReportSink::new(&mut fmt, params);
        let (rd1, rd2) = (read("p", 1), read("p", 2));
        sink.next_read(Some(&rd1), Some(&rd2), 7);
        sink.report(Some(&res(100)), None);
        sink.report(None, Some(&res(5000)));
        let mut rnd = StdRng::seed_from_u64(1);
        let mut met = ReportingMetrics::default();
        let t = sink
            .finish_read(None, None, &mut rnd, &mut met, true)
            .unwrap();
        assert_eq!(t.ndiscord, 1);
        assert_eq!(fmt.hits, vec![(RecordKind::DiscordantPair, 1, false)]);
        assert_eq!(met.ndiscord, 1);
        assert_eq!(met.nconcord_0, 1);
    }

    #[test]
    fn test_pair_with_one_aligned_mate_mixed() {
        let mut fmt = RecordingFormatter::default();
        let params = ReportingParams::new(1, None, false, false, true);
        let mut sink = ReportSink::new(&mut fmt, params);
        let (rd1, rd2) = (read("p", 1), read("p", 2));
        sink.next_read(Some(&rd1), Some(&rd2), 7);
        sink.report(Some(&res(100)), None);
        let mut rnd = StdRng::seed_from_u64(1);
        let mut met = ReportingMetrics::default();
        let t = sink
            .finish_read(None, None, &mut rnd, &mut met, true)
            .unwrap();
        assert_eq!(t.nunpair1, 1);
        assert_eq!(t.nunpair2, 0);
        assert_eq!(fmt.hits, vec![(RecordKind::UnpairedMate1, 1, false)]);
        assert_eq!(fmt.unaligned, vec![RecordKind::UnpairedMate2]);
        assert_eq!(met.nunp_0_uni, 1);
        assert_eq!(met.nunp_0_0, 1);
    }

    #[test]
    fn test_seed_summary_emission() {
        let mut fmt = RecordingFormatter::default();
        let params = ReportingParams::new(1, None, false, false, false);
        let mut sink = ReportSink::new(&mut fmt, params);
        let rd = read("r", 0);
        sink.next_read(Some(&rd), None, 0);
        let mut rnd = StdRng::seed_from_u64(1);
        let mut met = ReportingMetrics::default();
        let sr = SeedResults::new(4);
        sink.finish_read(Some(&sr), None, &mut rnd, &mut met, false)
            .unwrap();
        assert_eq!(fmt.summaries, 1);
    }

    #[test]
    fn test_same_read_detection() {
        let mut fmt = RecordingFormatter::default();
        let params = ReportingParams::new(1, None, false, false, false);
        let mut sink = ReportSink::new(&mut fmt, params);
        let rd = read("r", 0);
        assert!(!sink.same_read(Some(&rd), None, true));
        sink.next_read(Some(&rd), None, 0);
        assert!(sink.same_read(Some(&rd), None, true));
        let other = read("other", 0);
        assert!(sink.same_read(Some(&other), None, true)); // same sequence
        let diff = Read::new("d", b"TTTTTTTTTT", b"", 0);
        assert!(!sink.same_read(Some(&diff), None, true));
    }
}
