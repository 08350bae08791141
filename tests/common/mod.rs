// Shared fixtures for the integration tests: a small in-memory
// suffix-array index, an ungapped DP filler, and a recording formatter.

#![allow(dead_code)]

use bio::data_structures::suffix_array::suffix_array;
use multiseed::cache::AlignmentCache;
use multiseed::dp::{DpRequest, SwAligner};
use multiseed::index::{Index, Reference};
use multiseed::metrics::SwMetrics;
use multiseed::read::{base_to_code, Read};
use multiseed::res::{AlnRes, Edit, EditKind};
use multiseed::seeds::{QVal, SeedHit, SeedResults};
use multiseed::sink::{Formatter, RecordKind};
use rand::RngCore;
use std::io;

const CODE_TO_BASE: [u8; 5] = *b"ACGTN";

/// In-memory index over a handful of reference sequences, backed by a
/// suffix array of the joined text.
pub struct TestIndex {
    text: Vec<u8>,
    sa: Vec<usize>,
    bounds: Vec<(usize, usize)>,
}

impl TestIndex {
    pub fn new(seqs: &[&[u8]]) -> Self {
        let mut joined = Vec::new();
        let mut bounds = Vec::new();
        for s in seqs {
            bounds.push((joined.len(), s.len()));
            joined.extend_from_slice(s);
        }
        let mut text = joined;
        text.push(b'$');
        let sa = suffix_array(&text);
        TestIndex { text, sa, bounds }
    }

    /// Suffix-array range of exact occurrences of `pat`.
    pub fn sa_range(&self, pat: &[u8]) -> QVal {
        let below = |i: usize| -> bool { &self.text[i..] < pat };
        let within = |i: usize| -> bool { below(i) || self.text[i..].starts_with(pat) };
        let lo = self.sa.partition_point(|&i| below(i));
        let hi = self.sa.partition_point(|&i| within(i));
        QVal::new(lo as u64, (hi - lo) as u32)
    }
}

impl Index for TestIndex {
    fn joined_len(&self) -> u64 {
        (self.text.len() - 1) as u64
    }

    fn resolve_sa(&self, row: u64) -> u64 {
        self.sa[row as usize] as u64
    }

    fn joined_to_text_off(&self, len: u32, joined: u64) -> Option<(usize, u64, u64)> {
        let joined = joined as usize;
        for (tidx, &(start, slen)) in self.bounds.iter().enumerate() {
            if joined >= start && joined < start + slen {
                if joined + len as usize <= start + slen {
                    return Some((tidx, (joined - start) as u64, slen as u64));
                }
                return None;
            }
        }
        None
    }
}

/// Coded in-memory reference matching a `TestIndex`.
pub struct TestReference {
    seqs: Vec<Vec<u8>>,
}

impl TestReference {
    pub fn new(seqs: &[&[u8]]) -> Self {
        TestReference {
            seqs: seqs
                .iter()
                .map(|s| s.iter().map(|&b| base_to_code(b)).collect())
                .collect(),
        }
    }
}

impl Reference for TestReference {
    fn num_seqs(&self) -> usize {
        self.seqs.len()
    }

    fn seq_len(&self, tidx: usize) -> u64 {
        self.seqs[tidx].len() as u64
    }

    fn get_stretch(&self, tidx: usize, start: i64, count: usize, dst: &mut Vec<u8>) {
        dst.clear();
        let seq = &self.seqs[tidx];
        for i in 0..count as i64 {
            let pos = start + i;
            if pos < 0 || pos >= seq.len() as i64 {
                dst.push(4);
            } else {
                dst.push(seq[pos as usize]);
            }
        }
    }
}

/// Extract fixed-interval seeds from both read representations and rank
/// them, standing in for the upstream seed-discovery stage.
pub fn discover_seeds(idx: &TestIndex, rd: &Read, seed_len: usize, ival: usize) -> SeedResults {
    let rdlen = rd.len();
    if rdlen < seed_len {
        return SeedResults::new(0);
    }
    let offsets: Vec<usize> = (0..)
        .map(|k| k * ival)
        .take_while(|off| off + seed_len <= rdlen)
        .collect();
    let mut sr = SeedResults::new(offsets.len());
    for fw in [true, false] {
        let seq = rd.seq(fw);
        for (offidx, &off) in offsets.iter().enumerate() {
            let window = &seq[off..off + seed_len];
            if window.iter().any(|&c| c > 3) {
                continue;
            }
            let pat: Vec<u8> = window.iter().map(|&c| CODE_TO_BASE[c as usize]).collect();
            let qv = idx.sa_range(&pat);
            // Seed offsets are reported relative to the forward 5' end;
            // the driver rebases reverse-complement seeds itself
            let rdoff = if fw { off } else { rdlen - off - seed_len };
            sr.add(SeedHit {
                offidx: offidx as u32,
                rdoff: rdoff as u32,
                seedlen: seed_len as u32,
                fw,
                qv,
            });
        }
    }
    sr.rank();
    sr
}

/// Gapless DP filler: scores every diagonal whose start and end columns
/// are both legal, keeping those that meet the minimum score and the N
/// ceiling.  Good enough to exercise the driver end to end.
#[derive(Default)]
pub struct UngappedAligner {
    cands: Vec<AlnRes>,
    cur: usize,
    problems: u64,
    cells: u64,
    rows_done: u64,
    succ: u64,
    fail: u64,
    bts: u64,
}

impl UngappedAligner {
    pub fn new() -> Self {
        UngappedAligner::default()
    }
}

impl SwAligner for UngappedAligner {
    fn init(&mut self, req: DpRequest<'_>) {
        self.cands.clear();
        self.cur = 0;
        let seq = req.rd.seq(req.fw);
        let rows = seq.len();
        let mut refbuf = Vec::new();
        for j in 0..req.frame.width {
            if !(req.frame.st[j] && req.frame.en[j]) {
                continue;
            }
            let diag = req.frame.refl + j as i64;
            req.refs.get_stretch(req.tidx, diag, rows, &mut refbuf);
            let mut score = 0i64;
            let mut ns = 0usize;
            let mut edits = Vec::new();
            for (i, (&rc, &qc)) in refbuf.iter().zip(seq.iter()).enumerate() {
                self.cells += 1;
                if rc > 3 || qc > 3 {
                    ns += 1;
                    score -= req.sc.n(30);
                    edits.push(Edit {
                        pos: i as u32,
                        chr: rc,
                        qchr: qc,
                        kind: EditKind::Mismatch,
                    });
                } else if rc == qc {
                    score += req.sc.match_score(30);
                } else {
                    score -= req.sc.mm(30);
                    edits.push(Edit {
                        pos: i as u32,
                        chr: rc,
                        qchr: qc,
                        kind: EditKind::Mismatch,
                    });
                }
            }
            self.rows_done += rows as u64;
            if ns > req.nceil || score < req.minsc {
                continue;
            }
            self.cands
                .push(AlnRes::new(req.tidx, diag, rows as u64, req.fw, score, edits));
        }
        self.cands
            .sort_by(|a, b| b.score.cmp(&a.score).then(a.refoff.cmp(&b.refoff)));
        self.problems += 1;
    }

    fn align(&mut self, _rnd: &mut dyn RngCore) -> bool {
        let found = !self.cands.is_empty();
        if found {
            self.succ += 1;
        } else {
            self.fail += 1;
        }
        found
    }

    fn done(&self) -> bool {
        self.cur >= self.cands.len()
    }

    fn next_alignment(&mut self, _rnd: &mut dyn RngCore) -> Option<AlnRes> {
        if self.done() {
            return None;
        }
        self.bts += 1;
        let r = self.cands[self.cur].clone();
        self.cur += 1;
        Some(r)
    }

    fn merge_align_counters(&mut self, m: &mut SwMetrics) {
        m.sws += self.problems;
        m.swcups += self.cells;
        m.swrows += self.rows_done;
        m.swsucc += self.succ;
        m.swfail += self.fail;
        self.reset_align_counters();
    }

    fn reset_align_counters(&mut self) {
        self.problems = 0;
        self.cells = 0;
        self.rows_done = 0;
        self.succ = 0;
        self.fail = 0;
    }

    fn merge_backtrace_counters(&mut self, m: &mut SwMetrics) {
        m.swbts += self.bts;
        self.reset_backtrace_counters();
    }

    fn reset_backtrace_counters(&mut self) {
        self.bts = 0;
    }
}

/// A formatter that records what it was asked to emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Hits {
        rdid: u64,
        kind: RecordKind,
        /// (refoff, extent, fw) of selected entries, in list order
        sel1: Vec<(i64, u64, bool)>,
        sel2: Vec<(i64, u64, bool)>,
        /// Every accumulated candidate for mate 1
        all1: Vec<(i64, u64, bool)>,
        maxed: bool,
    },
    Maxed {
        rdid: u64,
        kind: RecordKind,
        candidates: usize,
    },
    Unaligned {
        rdid: u64,
        kind: RecordKind,
    },
    Summary {
        rdid: u64,
    },
}

impl Event {
    pub fn rdid(&self) -> u64 {
        match self {
            Event::Hits { rdid, .. }
            | Event::Maxed { rdid, .. }
            | Event::Unaligned { rdid, .. }
            | Event::Summary { rdid } => *rdid,
        }
    }
}

#[derive(Debug, Default)]
pub struct VecFormatter {
    pub events: Vec<Event>,
}

fn intervals(rs: Option<&[AlnRes]>, select: Option<&[usize]>) -> Vec<(i64, u64, bool)> {
    let Some(rs) = rs else {
        return Vec::new();
    };
    match select {
        Some(sel) => rs
            .iter()
            .zip(sel.iter())
            .filter(|(_, &s)| s > 0)
            .map(|(r, _)| (r.refoff, r.extent, r.fw))
            .collect(),
        None => rs.iter().map(|r| (r.refoff, r.extent, r.fw)).collect(),
    }
}

impl Formatter for VecFormatter {
    fn report_hits(
        &mut self,
        _rd1: Option<&Read>,
        _rd2: Option<&Read>,
        rdid: u64,
        kind: RecordKind,
        select: &[usize],
        rs1: Option<&[AlnRes]>,
        rs2: Option<&[AlnRes]>,
        maxed: bool,
    ) -> io::Result<()> {
        self.events.push(Event::Hits {
            rdid,
            kind,
            sel1: intervals(rs1, Some(select)),
            sel2: intervals(rs2, Some(select)),
            all1: intervals(rs1, None),
            maxed,
        });
        Ok(())
    }

    fn report_maxed(
        &mut self,
        _rd: &Read,
        rdid: u64,
        kind: RecordKind,
        rs: &[AlnRes],
    ) -> io::Result<()> {
        self.events.push(Event::Maxed {
            rdid,
            kind,
            candidates: rs.len(),
        });
        Ok(())
    }

    fn report_unaligned(&mut self, _rd: &Read, rdid: u64, kind: RecordKind) -> io::Result<()> {
        self.events.push(Event::Unaligned { rdid, kind });
        Ok(())
    }

    fn report_seed_summary(
        &mut self,
        _rd: &Read,
        rdid: u64,
        _summ: &multiseed::seeds::SeedSummary,
    ) -> io::Result<()> {
        self.events.push(Event::Summary { rdid });
        Ok(())
    }
}

/// Deterministic pseudo-random nucleotide sequence.
pub fn random_seq(len: usize, seed: u64) -> Vec<u8> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    let mut rnd = StdRng::seed_from_u64(seed);
    (0..len).map(|_| b"ACGT"[rnd.gen_range(0..4)]).collect()
}

/// Reverse complement of an ASCII nucleotide sequence.
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            other => other,
        })
        .collect()
}

/// A fresh alignment cache, for brevity in tests.
pub fn cache() -> AlignmentCache {
    AlignmentCache::new()
}

/// Route crate logging through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
