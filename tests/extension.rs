// End-to-end tests for unpaired seed extension: walker + framer + driver
// + sink against a small in-memory index and a gapless DP filler.

mod common;

use common::*;
use multiseed::driver::{ExtendConfig, ScoreParams, SwDriver};
use multiseed::metrics::{ReportingMetrics, SwMetrics, WalkMetrics};
use multiseed::read::Read;
use multiseed::reporting::ReportingParams;
use multiseed::sink::{RecordKind, ReportSink};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn extend_cfg() -> ExtendConfig {
    ExtendConfig {
        seedmms: 0,
        seedlen: 12,
        seedival: 6,
        posmin: 3.0,
        posfrac: 0.3,
        rowmin: 3.0,
        rowmult: 10.0,
        maxhalf: 15,
        report_overhangs: false,
    }
}

fn score_params(rdlen: usize) -> ScoreParams {
    ScoreParams {
        // End-to-end defaults: -3 - 2 * len
        minsc: -3 - 2 * rdlen as i64,
        floorsc: i64::MIN,
        nceil: (0.15 * rdlen as f64) as usize,
    }
}

struct Fixture {
    idx: TestIndex,
    refs: TestReference,
}

impl Fixture {
    fn new(seqs: &[&[u8]]) -> Self {
        Fixture {
            idx: TestIndex::new(seqs),
            refs: TestReference::new(seqs),
        }
    }
}

fn run_unpaired(
    fx: &Fixture,
    rd: &Read,
    params: ReportingParams,
    rng_seed: u64,
) -> (Vec<Event>, SwMetrics, WalkMetrics, ReportingMetrics) {
    let sr = discover_seeds(&fx.idx, rd, 12, 6);
    let mut fmt = VecFormatter::default();
    let mut sink = ReportSink::new(&mut fmt, params);
    let mut driver = SwDriver::new();
    let mut swa = UngappedAligner::new();
    let ca = cache();
    let mut rnd = StdRng::seed_from_u64(rng_seed);
    let mut wlm = WalkMetrics::default();
    let mut swm = SwMetrics::default();
    let cfg = extend_cfg();
    let sp = score_params(rd.len());
    let sc = multiseed::Scoring::end_to_end();
    driver.next_read();
    sink.next_read(Some(rd), None, 0);
    driver.extend_seeds(
        rd, true, &sr, &fx.idx, &fx.refs, &mut swa, &sc, &cfg, &sp, &ca, &mut rnd,
        &mut wlm, &mut swm, &mut sink,
    );
    let mut met = ReportingMetrics::default();
    sink.finish_read(Some(&sr), None, &mut rnd, &mut met, true)
        .unwrap();
    (fmt.events, swm, wlm, met)
}

#[test]
fn test_unique_read_aligns_at_its_site() {
    let chr = random_seq(400, 11);
    let fx = Fixture::new(&[&chr]);
    let rd = Read::new("r0", &chr[100..140], b"", 0);
    let params = ReportingParams::new(1, None, false, false, false);
    let (events, swm, _, met) = run_unpaired(&fx, &rd, params, 5);
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Hits {
            kind, sel1, maxed, ..
        } => {
            assert_eq!(*kind, RecordKind::Unpaired);
            assert_eq!(sel1.as_slice(), &[(100, 40, true)]);
            assert!(!maxed);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(swm.sws > 0);
    assert!(swm.swsucc >= 1);
    assert_eq!(met.nunp_uni, 1);
}

#[test]
fn test_reverse_complement_read_aligns_forwardized() {
    let chr = random_seq(400, 13);
    let fx = Fixture::new(&[&chr]);
    let rc = revcomp(&chr[220..260]);
    let rd = Read::new("r0", &rc, b"", 0);
    let params = ReportingParams::new(1, None, false, false, false);
    let (events, _, _, _) = run_unpaired(&fx, &rd, params, 5);
    match &events[0] {
        Event::Hits { sel1, .. } => {
            // Aligned via the reverse-complement representation
            assert_eq!(sel1.as_slice(), &[(220, 40, false)]);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_no_seeds_leaves_reporting_clean() {
    let chr = random_seq(400, 17);
    let fx = Fixture::new(&[&chr]);
    // A read of Ns yields no usable seeds
    let rd = Read::new("r0", &vec![b'N'; 40], b"", 0);
    let params = ReportingParams::new(1, None, false, false, false);
    let (events, swm, wlm, met) = run_unpaired(&fx, &rd, params, 5);
    // No DP was attempted, nothing was walked, read reported unaligned
    assert_eq!(swm.sws, 0);
    assert_eq!(wlm.elts, 0);
    assert_eq!(met.nunp_0, 1);
    assert_eq!(
        events,
        vec![Event::Unaligned {
            rdid: 0,
            kind: RecordKind::Unpaired
        }]
    );
}

#[test]
fn test_repeat_sites_deduplicated_and_disjoint() {
    // Same 40bp insert planted at four well-separated sites
    let insert = random_seq(40, 23);
    let mut chr = random_seq(600, 29);
    for &at in &[50usize, 200, 350, 500] {
        chr[at..at + 40].copy_from_slice(&insert);
    }
    let fx = Fixture::new(&[&chr]);
    let rd = Read::new("r0", &insert, b"", 0);
    let params = ReportingParams::new(10, None, false, false, false);
    let (events, swm, _, _) = run_unpaired(&fx, &rd, params, 5);
    match &events[0] {
        Event::Hits { all1, .. } => {
            // Every planted site found exactly once
            let mut offs: Vec<i64> = all1.iter().map(|&(o, _, _)| o).collect();
            offs.sort_unstable();
            assert_eq!(offs, vec![50, 200, 350, 500]);
            // Emitted alignments never overlap on the same strand
            for (i, a) in all1.iter().enumerate() {
                for b in &all1[i + 1..] {
                    if a.2 == b.2 {
                        let disjoint = a.0 + a.1 as i64 <= b.0 || b.0 + b.1 as i64 <= a.0;
                        assert!(disjoint, "{:?} overlaps {:?}", a, b);
                    }
                }
            }
        }
        other => panic!("unexpected event {:?}", other),
    }
    // Several seeds rediscover the same anchors
    assert!(swm.rshit > 0);
}

#[test]
fn test_suppression_ceiling_reports_maxed() {
    let insert = random_seq(40, 23);
    let mut chr = random_seq(600, 29);
    for &at in &[50usize, 200, 350, 500] {
        chr[at..at + 40].copy_from_slice(&insert);
    }
    let fx = Fixture::new(&[&chr]);
    let rd = Read::new("r0", &insert, b"", 0);
    // mhits=2 without sampling: four alignments suppress the read
    let params = ReportingParams::new(1, Some(2), false, false, false);
    let (events, _, _, met) = run_unpaired(&fx, &rd, params, 5);
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Maxed {
            kind, candidates, ..
        } => {
            assert_eq!(*kind, RecordKind::Unpaired);
            assert!(*candidates >= 3);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(met.nunp_rep, 1);
}

#[test]
fn test_same_inputs_same_rng_same_output() {
    let insert = random_seq(40, 31);
    let mut chr = random_seq(800, 37);
    for &at in &[60usize, 160, 260, 360, 460, 560, 660] {
        chr[at..at + 40].copy_from_slice(&insert);
    }
    let fx = Fixture::new(&[&chr]);
    let rd = Read::new("r0", &insert, b"", 0);
    let params = ReportingParams::new(2, None, false, false, false);
    let (ev1, _, _, _) = run_unpaired(&fx, &rd, params, 99);
    let (ev2, _, _, _) = run_unpaired(&fx, &rd, params, 99);
    assert_eq!(ev1, ev2);
}

#[test]
fn test_boundary_straddling_hits_skipped() {
    // Two short sequences; a read spanning their junction in the joined
    // text must not produce an alignment
    let left = random_seq(60, 41);
    let right = random_seq(60, 43);
    let fx = Fixture::new(&[&left, &right]);
    let mut junction = left[40..].to_vec();
    junction.extend_from_slice(&right[..20]);
    let rd = Read::new("r0", &junction, b"", 0);
    let params = ReportingParams::new(1, None, false, false, false);
    let (events, _, _, met) = run_unpaired(&fx, &rd, params, 5);
    assert_eq!(met.nunp_0, 1);
    assert_eq!(
        events,
        vec![Event::Unaligned {
            rdid: 0,
            kind: RecordKind::Unpaired
        }]
    );
}

#[test]
fn test_seed_summary_emitted_when_requested() {
    let chr = random_seq(400, 47);
    let fx = Fixture::new(&[&chr]);
    let rd = Read::new("r0", &chr[100..140], b"", 0);
    let sr = discover_seeds(&fx.idx, &rd, 12, 6);
    let mut fmt = VecFormatter::default();
    let params = ReportingParams::new(1, None, false, false, false);
    let mut sink = ReportSink::new(&mut fmt, params);
    sink.next_read(Some(&rd), None, 3);
    let mut rnd = StdRng::seed_from_u64(1);
    let mut met = ReportingMetrics::default();
    sink.finish_read(Some(&sr), None, &mut rnd, &mut met, false)
        .unwrap();
    assert_eq!(fmt.events[0], Event::Summary { rdid: 3 });
}
