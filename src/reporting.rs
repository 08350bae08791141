// Per-read reporting state machine.
//
// Tracks how many alignments of each category (concordant pair,
// discordant pair, unpaired mate 1, unpaired mate 2) have been found and
// decides when each category, and the read as a whole, is finished under
// the configured limits:
//
//   khits    report up to this many alignments per category
//   mhits    if set, suppress a category entirely once it exceeds this
//            many (or sample one representative when msample is set)
//   discord  surface a discordant pair when both mates align uniquely
//   mixed    report mates individually when the pair fails
//
// Once `done()` is true no further event changes the state.

/// Reporting limits, immutable for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingParams {
    /// Report at most this many alignments per category; > 0
    pub khits: u64,
    /// Suppression ceiling; > 0, meaningful only when `mhits_set`
    pub mhits: u64,
    pub mhits_set: bool,
    /// Sample one representative instead of suppressing outright
    pub msample: bool,
    /// Look for discordant pairs
    pub discord: bool,
    /// Report unpaired mates when pairing fails
    pub mixed: bool,
}

impl ReportingParams {
    /// `mhits == None` leaves the suppression ceiling unset.
    pub fn new(khits: u64, mhits: Option<u64>, msample: bool, discord: bool, mixed: bool) -> Self {
        assert!(khits > 0, "khits must be positive");
        if let Some(m) = mhits {
            assert!(m > 0, "mhits must be positive when set");
        }
        ReportingParams {
            khits,
            mhits: mhits.unwrap_or(u64::MAX),
            mhits_set: mhits.is_some(),
            msample,
            discord,
            mixed,
        }
    }
}

/// How a category was (or was not) closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryExit {
    /// Category was never active for this read
    NotEntered,
    /// Category is still open
    NotExited,
    /// Hit the khits ceiling
    HitLimit,
    /// Exceeded mhits with suppression
    SuppressLimit,
    /// Exceeded mhits with sampling
    SampleLimit,
    /// Made moot by a superior category
    Trumped,
    /// Closed at end of search with at least one alignment
    WithAlignments,
    /// Closed at end of search without alignments
    NoAlignments,
}

/// Top-level phase of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    NoRead,
    Unpaired,
    ConcordantPairs,
}

/// What to report for a finished read, per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportTotals {
    pub nconcord: u64,
    pub ndiscord: u64,
    pub nunpair1: u64,
    pub nunpair2: u64,
    /// Concordant alignments were repetitive
    pub pair_max: bool,
    pub unpair1_max: bool,
    pub unpair2_max: bool,
}

/// The state machine itself.
#[derive(Debug, Clone)]
pub struct ReportingState {
    p: ReportingParams,
    state: ReadState,
    paired: bool,
    done_concord: bool,
    done_discord: bool,
    done_unpair1: bool,
    done_unpair2: bool,
    done_unpair: bool,
    done: bool,
    exit_concord: CategoryExit,
    exit_discord: CategoryExit,
    exit_unpair1: CategoryExit,
    exit_unpair2: CategoryExit,
    nconcord: u64,
    ndiscord: u64,
    nunpair1: u64,
    nunpair2: u64,
}

impl ReportingState {
    pub fn new(p: ReportingParams) -> Self {
        ReportingState {
            p,
            state: ReadState::NoRead,
            paired: false,
            done_concord: true,
            done_discord: true,
            done_unpair1: true,
            done_unpair2: true,
            done_unpair: true,
            done: true,
            exit_concord: CategoryExit::NotEntered,
            exit_discord: CategoryExit::NotEntered,
            exit_unpair1: CategoryExit::NotEntered,
            exit_unpair2: CategoryExit::NotEntered,
            nconcord: 0,
            ndiscord: 0,
            nunpair1: 0,
            nunpair2: 0,
        }
    }

    /// Reset for a new read.  A paired read opens the concordant category
    /// and, per flags, the discordant and unpaired categories; an
    /// unpaired read opens only mate 1's category.
    pub fn next_read(&mut self, paired: bool) {
        self.paired = paired;
        if paired {
            self.state = ReadState::ConcordantPairs;
            self.done_concord = false;
            self.done_discord = !self.p.discord;
            self.done_unpair1 = !self.p.mixed;
            self.done_unpair2 = !self.p.mixed;
            self.exit_concord = CategoryExit::NotExited;
            self.exit_discord = if self.p.discord {
                CategoryExit::NotExited
            } else {
                CategoryExit::NotEntered
            };
            self.exit_unpair1 = if self.p.mixed {
                CategoryExit::NotExited
            } else {
                CategoryExit::NotEntered
            };
            self.exit_unpair2 = if self.p.mixed {
                CategoryExit::NotExited
            } else {
                CategoryExit::NotEntered
            };
        } else {
            self.state = ReadState::Unpaired;
            self.done_concord = true;
            self.done_discord = true;
            self.done_unpair1 = false;
            self.done_unpair2 = true;
            self.exit_concord = CategoryExit::NotEntered;
            self.exit_discord = CategoryExit::NotEntered;
            self.exit_unpair1 = CategoryExit::NotExited;
            self.exit_unpair2 = CategoryExit::NotEntered;
        }
        self.done_unpair = self.done_unpair1 && self.done_unpair2;
        self.done = false;
        self.nconcord = 0;
        self.ndiscord = 0;
        self.nunpair1 = 0;
        self.nunpair2 = 0;
    }

    /// One more concordant alignment was found.  Returns `done()`.
    pub fn found_concordant(&mut self) -> bool {
        debug_assert!(self.paired);
        debug_assert!(!self.done_concord);
        self.nconcord += 1;
        let (done, exit) = self.are_done(self.nconcord);
        if done {
            self.done_concord = true;
            self.exit_concord = exit;
        }
        // Any concordant alignment makes a discordant one moot.
        self.done_discord = true;
        self.exit_discord = CategoryExit::Trumped;
        if self.done_concord
            && self.exit_concord != CategoryExit::SuppressLimit
            && self.exit_concord != CategoryExit::SampleLimit
        {
            // Concordant category closed cleanly; unpaired searching for
            // either mate can stop too.
            if !self.done_unpair1 {
                self.done_unpair1 = true;
                self.exit_unpair1 = CategoryExit::Trumped;
            }
            if !self.done_unpair2 {
                self.done_unpair2 = true;
                self.exit_unpair2 = CategoryExit::Trumped;
            }
        }
        self.update_done();
        self.done
    }

    /// The (single permitted) discordant alignment was found.
    pub fn found_discordant(&mut self) -> bool {
        debug_assert!(self.paired);
        debug_assert!(!self.done_discord);
        self.ndiscord += 1;
        self.done_discord = true;
        self.exit_discord = CategoryExit::WithAlignments;
        // A discordant pair excludes unpaired reporting.
        if !self.done_unpair1 {
            self.done_unpair1 = true;
            self.exit_unpair1 = CategoryExit::Trumped;
        }
        if !self.done_unpair2 {
            self.done_unpair2 = true;
            self.exit_unpair2 = CategoryExit::Trumped;
        }
        self.update_done();
        self.done
    }

    /// One more unpaired alignment was found for the given mate.
    pub fn found_unpaired(&mut self, mate1: bool) -> bool {
        debug_assert!(self.state != ReadState::NoRead);
        if mate1 {
            self.nunpair1 += 1;
            if !self.done_unpair1 {
                let (done, exit) = self.are_done(self.nunpair1);
                if done {
                    self.done_unpair1 = true;
                    self.exit_unpair1 = exit;
                    self.update_done();
                }
            }
            if self.nunpair1 > 1 {
                // A second alignment for this mate rules out a discordant
                // pair, which needs both mates unique.
                self.done_discord = true;
                self.exit_discord = CategoryExit::NoAlignments;
            }
        } else {
            self.nunpair2 += 1;
            if !self.done_unpair2 {
                let (done, exit) = self.are_done(self.nunpair2);
                if done {
                    self.done_unpair2 = true;
                    self.exit_unpair2 = exit;
                    self.update_done();
                }
            }
            if self.nunpair2 > 1 {
                self.done_discord = true;
                self.exit_discord = CategoryExit::NoAlignments;
            }
        }
        self.done
    }

    /// Close every open category.  If both mates aligned exactly once,
    /// no pair was concordant, and the discordant category is still open,
    /// promote the two unique alignments to one discordant pair.
    pub fn finish(&mut self) {
        if !self.done_concord {
            self.done_concord = true;
            self.exit_concord = if self.nconcord > 0 {
                CategoryExit::WithAlignments
            } else {
                CategoryExit::NoAlignments
            };
        }
        if !self.done_unpair1 {
            self.done_unpair1 = true;
            self.exit_unpair1 = if self.nunpair1 > 0 {
                CategoryExit::WithAlignments
            } else {
                CategoryExit::NoAlignments
            };
        }
        if !self.done_unpair2 {
            self.done_unpair2 = true;
            self.exit_unpair2 = if self.nunpair2 > 0 {
                CategoryExit::WithAlignments
            } else {
                CategoryExit::NoAlignments
            };
        }
        if !self.done_discord {
            debug_assert_eq!(self.ndiscord, 0);
            if self.nconcord == 0 && self.nunpair1 == 1 && self.nunpair2 == 1 {
                self.ndiscord = 1;
                self.nunpair1 = 0;
                self.nunpair2 = 0;
            }
            self.done_discord = true;
            self.exit_discord = if self.ndiscord > 0 {
                CategoryExit::WithAlignments
            } else {
                CategoryExit::NoAlignments
            };
        }
        self.done_unpair = true;
        self.done = true;
    }

    /// Decide what gets reported.  Concordant beats discordant beats
    /// unpaired; the max flags mark repetitive categories.
    pub fn get_report(&self) -> ReportTotals {
        let mut t = ReportTotals::default();
        debug_assert!(self.p.khits > 0);
        debug_assert!(self.p.mhits > 0);
        if self.paired {
            match self.exit_concord {
                CategoryExit::HitLimit => {
                    // khits at random
                    t.nconcord = self.p.khits;
                    return t;
                }
                CategoryExit::SampleLimit => {
                    debug_assert!(self.p.msample);
                    debug_assert!(self.nconcord > 0);
                    t.pair_max = true;
                    if self.p.mixed {
                        t.unpair1_max = self.nunpair1 > self.p.mhits;
                        t.unpair2_max = self.nunpair2 > self.p.mhits;
                    }
                    t.nconcord = 1; // one sampled representative
                    return t;
                }
                CategoryExit::WithAlignments => {
                    debug_assert!(self.nconcord > 0);
                    t.nconcord = self.nconcord.min(self.p.khits);
                    return t;
                }
                _ => {}
            }
            if self.exit_concord == CategoryExit::SuppressLimit {
                debug_assert!(!self.p.msample);
                t.pair_max = true;
                if self.p.mixed {
                    t.unpair1_max = self.nunpair1 > self.p.mhits;
                    t.unpair2_max = self.nunpair2 > self.p.mhits;
                }
            }
            if self.exit_discord == CategoryExit::WithAlignments {
                debug_assert!(self.p.discord);
                t.ndiscord = 1;
                return t;
            }
        }
        debug_assert!(self.exit_unpair1 != CategoryExit::Trumped);
        debug_assert!(self.exit_unpair2 != CategoryExit::Trumped);
        if (self.paired && !self.p.mixed) || self.nunpair1 + self.nunpair2 == 0 {
            // Unpaired alignments not reportable, or nonexistent
            return t;
        }
        match self.exit_unpair1 {
            CategoryExit::HitLimit => t.nunpair1 = self.p.khits,
            CategoryExit::SampleLimit => {
                debug_assert!(self.p.msample);
                t.unpair1_max = true;
                t.nunpair1 = 1;
            }
            CategoryExit::WithAlignments => {
                t.nunpair1 = self.nunpair1.min(self.p.khits);
            }
            CategoryExit::SuppressLimit => {
                debug_assert!(!self.p.msample);
                t.unpair1_max = true;
            }
            _ => {}
        }
        match self.exit_unpair2 {
            CategoryExit::HitLimit => t.nunpair2 = self.p.khits,
            CategoryExit::SampleLimit => {
                debug_assert!(self.p.msample);
                t.unpair2_max = true;
                t.nunpair2 = 1;
            }
            CategoryExit::WithAlignments => {
                t.nunpair2 = self.nunpair2.min(self.p.khits);
            }
            CategoryExit::SuppressLimit => {
                debug_assert!(!self.p.msample);
                t.unpair2_max = true;
            }
            _ => {}
        }
        t
    }

    /// Whether `cnt` alignments in a category short-circuit it, and how.
    fn are_done(&self, cnt: u64) -> (bool, CategoryExit) {
        if !self.p.mhits_set && cnt >= self.p.khits {
            (true, CategoryExit::HitLimit)
        } else if self.p.mhits_set && cnt > self.p.mhits {
            if self.p.msample {
                (true, CategoryExit::SampleLimit)
            } else {
                (true, CategoryExit::SuppressLimit)
            }
        } else {
            (false, CategoryExit::NotExited)
        }
    }

    fn update_done(&mut self) {
        self.done_unpair = self.done_unpair1 && self.done_unpair2;
        self.done = self.done_concord && self.done_discord && self.done_unpair;
    }

    #[inline]
    pub fn done(&self) -> bool {
        self.done
    }

    #[inline]
    pub fn done_concordant(&self) -> bool {
        self.done_concord
    }

    #[inline]
    pub fn done_discordant(&self) -> bool {
        self.done_discord
    }

    #[inline]
    pub fn done_unpaired(&self, mate1: bool) -> bool {
        if mate1 {
            self.done_unpair1
        } else {
            self.done_unpair2
        }
    }

    #[inline]
    pub fn done_unpaired_both(&self) -> bool {
        self.done_unpair
    }

    /// True when nothing more can come of extending the given mate: the
    /// concordant and discordant categories and the mate's own unpaired
    /// category are all closed.
    pub fn done_with_mate(&self, mate1: bool) -> bool {
        if self.done {
            return true;
        }
        self.done_concord && self.done_discord && self.done_unpaired(mate1)
    }

    #[inline]
    pub fn params(&self) -> &ReportingParams {
        &self.p
    }

    #[inline]
    pub fn paired(&self) -> bool {
        self.paired
    }

    pub fn num_concordant(&self) -> u64 {
        self.nconcord
    }

    pub fn num_discordant(&self) -> u64 {
        self.ndiscord
    }

    pub fn num_unpaired(&self, mate1: bool) -> u64 {
        if mate1 {
            self.nunpair1
        } else {
            self.nunpair2
        }
    }

    pub fn exit_concordant(&self) -> CategoryExit {
        self.exit_concord
    }

    pub fn exit_discordant(&self) -> CategoryExit {
        self.exit_discord
    }

    pub fn exit_unpaired(&self, mate1: bool) -> CategoryExit {
        if mate1 {
            self.exit_unpair1
        } else {
            self.exit_unpair2
        }
    }
}
