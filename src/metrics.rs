// Metrics counters for the extension pipeline.
//
// Counters are plain value objects owned by each worker and merged at
// batch boundaries; nothing here is shared or atomic.

/// Counters for suffix-array range walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkMetrics {
    /// Elements yielded by walkers
    pub elts: u64,
    /// Suffix-array lookups performed
    pub resolves: u64,
    /// Lookups avoided because the cache already held the offset
    pub cache_hits: u64,
    /// Ranges narrowed down to the row budget
    pub narrowed: u64,
}

impl WalkMetrics {
    pub fn merge(&mut self, o: &WalkMetrics) {
        self.elts += o.elts;
        self.resolves += o.resolves;
        self.cache_hits += o.cache_hits;
        self.narrowed += o.narrowed;
    }
}

/// Counters for banded DP work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwMetrics {
    /// DP problems framed and filled
    pub sws: u64,
    /// Cell updates
    pub swcups: u64,
    /// Rows computed
    pub swrows: u64,
    /// Rows skipped
    pub swskiprows: u64,
    /// Problems with at least one valid alignment
    pub swsucc: u64,
    /// Problems with no valid alignment
    pub swfail: u64,
    /// Backtraces performed
    pub swbts: u64,
    /// Seed hits skipped because the anchor coordinate was already tried
    pub rshit: u64,
}

impl SwMetrics {
    pub fn merge(&mut self, o: &SwMetrics) {
        self.sws += o.sws;
        self.swcups += o.swcups;
        self.swrows += o.swrows;
        self.swskiprows += o.swskiprows;
        self.swsucc += o.swsucc;
        self.swfail += o.swfail;
        self.swbts += o.swbts;
        self.rshit += o.rshit;
    }
}

/// Per-category read-level reporting tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportingMetrics {
    /// Reads handled
    pub nread: u64,
    /// Paired reads
    pub npaired: u64,
    /// Unpaired reads
    pub nunpaired: u64,
    /// Pairs with 0 concordant alignments
    pub nconcord_0: u64,
    /// Pairs aligned concordantly within limits
    pub nconcord_uni: u64,
    /// Pairs with repetitive concordant alignments
    pub nconcord_rep: u64,
    /// Pairs reported discordantly
    pub ndiscord: u64,
    /// Mates of pair-unaligned pairs with 0 alignments
    pub nunp_0_0: u64,
    /// Mates of pair-unaligned pairs aligned within limits
    pub nunp_0_uni: u64,
    /// Mates of pair-unaligned pairs aligned repetitively
    pub nunp_0_rep: u64,
    /// Mates of pair-repetitive pairs with 0 alignments
    pub nunp_rep_0: u64,
    pub nunp_rep_uni: u64,
    pub nunp_rep_rep: u64,
    /// Unpaired reads with 0 alignments
    pub nunp_0: u64,
    pub nunp_uni: u64,
    pub nunp_rep: u64,
}

impl ReportingMetrics {
    pub fn merge(&mut self, o: &ReportingMetrics) {
        self.nread += o.nread;
        self.npaired += o.npaired;
        self.nunpaired += o.nunpaired;
        self.nconcord_0 += o.nconcord_0;
        self.nconcord_uni += o.nconcord_uni;
        self.nconcord_rep += o.nconcord_rep;
        self.ndiscord += o.ndiscord;
        self.nunp_0_0 += o.nunp_0_0;
        self.nunp_0_uni += o.nunp_0_uni;
        self.nunp_0_rep += o.nunp_0_rep;
        self.nunp_rep_0 += o.nunp_rep_0;
        self.nunp_rep_uni += o.nunp_rep_uni;
        self.nunp_rep_rep += o.nunp_rep_rep;
        self.nunp_0 += o.nunp_0;
        self.nunp_uni += o.nunp_uni;
        self.nunp_rep += o.nunp_rep;
    }

    /// Fraction of mates with at least one reported alignment.
    pub fn overall_alignment_rate(&self) -> f64 {
        let cand = self.nunpaired + self.npaired * 2;
        if cand == 0 {
            return 0.0;
        }
        let al = (self.nconcord_uni + self.nconcord_rep) * 2
            + self.ndiscord * 2
            + self.nunp_0_uni
            + self.nunp_0_rep
            + self.nunp_uni
            + self.nunp_rep;
        al as f64 / cand as f64
    }

    /// Log the per-category breakdown and the overall alignment rate.
    pub fn log_summary(&self, discord: bool, mixed: bool) {
        fn pct(num: u64, denom: u64) -> f64 {
            if denom == 0 {
                0.0
            } else {
                100.0 * num as f64 / denom as f64
            }
        }
        log::info!("{} reads; of these:", self.nread);
        if self.npaired > 0 {
            log::info!(
                "  {} ({:.2}%) were paired; of these:",
                self.npaired,
                pct(self.npaired, self.nread)
            );
            log::info!(
                "    {} ({:.2}%) aligned concordantly 0 times",
                self.nconcord_0,
                pct(self.nconcord_0, self.npaired)
            );
            log::info!(
                "    {} ({:.2}%) aligned concordantly at least once",
                self.nconcord_uni,
                pct(self.nconcord_uni, self.npaired)
            );
            log::info!(
                "    {} ({:.2}%) aligned concordantly over the repeat ceiling",
                self.nconcord_rep,
                pct(self.nconcord_rep, self.npaired)
            );
            if discord {
                log::info!(
                    "    {} ({:.2}%) aligned discordantly 1 time",
                    self.ndiscord,
                    pct(self.ndiscord, self.nconcord_0)
                );
            }
            if mixed {
                let mates = self.nconcord_0.saturating_sub(self.ndiscord) * 2;
                log::info!("    {} pair-unaligned mates; of these:", mates);
                log::info!(
                    "      {} ({:.2}%) aligned 0 times",
                    self.nunp_0_0,
                    pct(self.nunp_0_0, mates)
                );
                log::info!(
                    "      {} ({:.2}%) aligned at least once",
                    self.nunp_0_uni,
                    pct(self.nunp_0_uni, mates)
                );
            }
        }
        if self.nunpaired > 0 {
            log::info!(
                "  {} ({:.2}%) were unpaired; of these:",
                self.nunpaired,
                pct(self.nunpaired, self.nread)
            );
            log::info!(
                "    {} ({:.2}%) aligned 0 times",
                self.nunp_0,
                pct(self.nunp_0, self.nunpaired)
            );
            log::info!(
                "    {} ({:.2}%) aligned at least once",
                self.nunp_uni,
                pct(self.nunp_uni, self.nunpaired)
            );
        }
        log::info!(
            "{:.2}% overall alignment rate",
            100.0 * self.overall_alignment_rate()
        );
    }
}
