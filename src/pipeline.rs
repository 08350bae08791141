// Parallel worker orchestration.
//
// One worker per batch of reads; each worker owns its driver state,
// DP fillers, RNG, and metrics.  Two resources are shared: the output
// formatter, behind a mutex held only for a single record emission, and
// the SA-resolution cache, which carries its own per-range locking so
// workers hitting the same repetitive range reuse each other's lookups.
// Metrics are merged when the workers finish.
//
// RNGs are seeded per read from the run seed and the read id, so output
// for a read does not depend on worker scheduling.

use crate::cache::AlignmentCache;
use crate::driver::{ExtendConfig, ScoreParams, SwDriver};
use crate::dp::SwAligner;
use crate::index::{Index, Reference};
use crate::metrics::{ReportingMetrics, SwMetrics, WalkMetrics};
use crate::pe::PairedEndPolicy;
use crate::policy::SeedPolicy;
use crate::read::Read;
use crate::reporting::ReportingParams;
use crate::seeds::SeedResults;
use crate::sink::{Formatter, RecordKind, ReportSink};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::io;
use std::sync::{Mutex, MutexGuard};

/// One unit of work: a read (or pair) plus its discovered seed hits.
#[derive(Debug, Clone)]
pub struct ReadTask {
    pub rdid: u64,
    pub rd1: Read,
    pub rd2: Option<Read>,
    pub sr1: SeedResults,
    pub sr2: Option<SeedResults>,
}

/// Run-wide configuration for the alignment pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub policy: SeedPolicy,
    pub reporting: ReportingParams,
    /// Cap on band half-width for seed extension
    pub maxhalf: usize,
    /// Keep alignments that overhang reference ends
    pub report_overhangs: bool,
    /// Base seed for per-read RNGs
    pub rng_seed: u64,
    /// Emit per-read seed summaries
    pub seed_summaries: bool,
}

/// Metrics gathered by one batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchMetrics {
    pub reporting: ReportingMetrics,
    pub walk: WalkMetrics,
    pub sw_seed: SwMetrics,
    pub sw_mate: SwMetrics,
    /// Reads whose output failed; they are dropped after logging
    pub io_errors: u64,
}

impl BatchMetrics {
    pub fn merge(&mut self, o: &BatchMetrics) {
        self.reporting.merge(&o.reporting);
        self.walk.merge(&o.walk);
        self.sw_seed.merge(&o.sw_seed);
        self.sw_mate.merge(&o.sw_mate);
        self.io_errors += o.io_errors;
    }
}

/// Formatter adapter that serializes emissions through a shared mutex.
/// The lock is held for one record at a time.
pub struct SharedFormatter<'a, F: Formatter> {
    inner: &'a Mutex<F>,
}

impl<'a, F: Formatter> SharedFormatter<'a, F> {
    pub fn new(inner: &'a Mutex<F>) -> Self {
        SharedFormatter { inner }
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, F>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output stream lock poisoned"))
    }
}

impl<F: Formatter> Formatter for SharedFormatter<'_, F> {
    fn report_hits(
        &mut self,
        rd1: Option<&Read>,
        rd2: Option<&Read>,
        rdid: u64,
        kind: RecordKind,
        select: &[usize],
        rs1: Option<&[crate::res::AlnRes]>,
        rs2: Option<&[crate::res::AlnRes]>,
        maxed: bool,
    ) -> io::Result<()> {
        self.lock()?
            .report_hits(rd1, rd2, rdid, kind, select, rs1, rs2, maxed)
    }

    fn report_maxed(
        &mut self,
        rd: &Read,
        rdid: u64,
        kind: RecordKind,
        rs: &[crate::res::AlnRes],
    ) -> io::Result<()> {
        self.lock()?.report_maxed(rd, rdid, kind, rs)
    }

    fn report_unaligned(&mut self, rd: &Read, rdid: u64, kind: RecordKind) -> io::Result<()> {
        self.lock()?.report_unaligned(rd, rdid, kind)
    }

    fn report_seed_summary(
        &mut self,
        rd: &Read,
        rdid: u64,
        summ: &crate::seeds::SeedSummary,
    ) -> io::Result<()> {
        self.lock()?.report_seed_summary(rd, rdid, summ)
    }
}

struct Worker<A> {
    driver: SwDriver,
    swa: A,
    oswa: A,
    met: BatchMetrics,
}

/// Align a batch of tasks in parallel and return the merged metrics.
pub fn align_tasks<I, R, P, A, NA, F>(
    tasks: &[ReadTask],
    idx: &I,
    refs: &R,
    pepol: &P,
    cfg: &PipelineConfig,
    new_aligner: &NA,
    fmt: &Mutex<F>,
) -> BatchMetrics
where
    I: Index + Sync,
    R: Reference + Sync,
    P: PairedEndPolicy + Sync,
    A: SwAligner + Send,
    NA: Fn() -> A + Sync,
    F: Formatter + Send,
{
    // One cache for the whole batch; its per-range locks keep resolution
    // work from being repeated across workers
    let cache = AlignmentCache::new();
    tasks
        .par_iter()
        .fold(
            || Worker {
                driver: SwDriver::new(),
                swa: new_aligner(),
                oswa: new_aligner(),
                met: BatchMetrics::default(),
            },
            |mut w, task| {
                process_task(&mut w, task, idx, refs, pepol, cfg, &cache, fmt);
                w
            },
        )
        .map(|w| w.met)
        .reduce(BatchMetrics::default, |mut a, b| {
            a.merge(&b);
            a
        })
}

#[allow(clippy::too_many_arguments)]
fn process_task<I, R, P, A, F>(
    w: &mut Worker<A>,
    task: &ReadTask,
    idx: &I,
    refs: &R,
    pepol: &P,
    cfg: &PipelineConfig,
    cache: &AlignmentCache,
    fmt: &Mutex<F>,
) where
    I: Index + Sync,
    R: Reference + Sync,
    P: PairedEndPolicy + Sync,
    A: SwAligner,
    F: Formatter + Send,
{
    let mut rnd = StdRng::seed_from_u64(
        cfg.rng_seed
            .wrapping_add(task.rdid.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
    );
    let mut shared = SharedFormatter::new(fmt);
    let mut sink = ReportSink::new(&mut shared, cfg.reporting);
    w.driver.next_read();
    let sc = cfg.policy.scoring();
    let rd1len = task.rd1.len();
    let extend_cfg = ExtendConfig {
        seedmms: cfg.policy.seed_mms,
        seedlen: cfg.policy.seed_len,
        seedival: cfg.policy.interval(rd1len),
        posmin: cfg.policy.posmin,
        posfrac: cfg.policy.posfrac,
        rowmin: cfg.policy.rowmin,
        rowmult: cfg.policy.rowmult,
        maxhalf: cfg.maxhalf,
        report_overhangs: cfg.report_overhangs,
    };
    let sp1 = ScoreParams {
        minsc: cfg.policy.min_score(rd1len),
        floorsc: cfg.policy.floor_score(rd1len),
        nceil: cfg.policy.n_ceiling(rd1len),
    };
    match (&task.rd2, &task.sr2) {
        (Some(rd2), Some(sr2)) => {
            let sp2 = ScoreParams {
                minsc: cfg.policy.min_score(rd2.len()),
                floorsc: cfg.policy.floor_score(rd2.len()),
                nceil: cfg.policy.n_ceiling(rd2.len()),
            };
            sink.next_read(Some(&task.rd1), Some(rd2), task.rdid);
            let stop = w.driver.extend_seeds_paired(
                &task.rd1,
                rd2,
                true,
                &task.sr1,
                idx,
                refs,
                &mut w.swa,
                &mut w.oswa,
                &sc,
                pepol,
                &extend_cfg,
                &sp1,
                &sp2,
                cache,
                &mut rnd,
                &mut w.met.walk,
                &mut w.met.sw_seed,
                &mut w.met.sw_mate,
                &mut sink,
                true,
            );
            if !stop && !sink.state().done() && !sink.state().done_with_mate(false) {
                w.driver.extend_seeds_paired(
                    rd2,
                    &task.rd1,
                    false,
                    sr2,
                    idx,
                    refs,
                    &mut w.swa,
                    &mut w.oswa,
                    &sc,
                    pepol,
                    &extend_cfg,
                    &sp2,
                    &sp1,
                    cache,
                    &mut rnd,
                    &mut w.met.walk,
                    &mut w.met.sw_seed,
                    &mut w.met.sw_mate,
                    &mut sink,
                    true,
                );
            }
        }
        _ => {
            sink.next_read(Some(&task.rd1), None, task.rdid);
            w.driver.extend_seeds(
                &task.rd1,
                true,
                &task.sr1,
                idx,
                refs,
                &mut w.swa,
                &sc,
                &extend_cfg,
                &sp1,
                cache,
                &mut rnd,
                &mut w.met.walk,
                &mut w.met.sw_seed,
                &mut sink,
            );
        }
    }
    if let Err(e) = sink.finish_read(
        Some(&task.sr1),
        task.sr2.as_ref(),
        &mut rnd,
        &mut w.met.reporting,
        !cfg.seed_summaries,
    ) {
        log::warn!("read {}: dropping output after I/O error: {}", task.rdid, e);
        w.met.io_errors += 1;
    }
}
