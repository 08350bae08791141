// Seed alignment policy: scoring scheme plus seed layout, parsed from a
// `LAB=VAL;LAB=VAL;...` policy string.
//
// Recognized labels:
//
//   MA=xx          match bonus (default 0; 10 in local mode)
//   MMP={Cxx|Q|R}  mismatch penalty: constant, = quality, = rounded quality
//   NP={Cxx|Q|R}   penalty for a position with an N
//   RDG=xx,yy      read gap open,extend
//   RFG=xx,yy      reference gap open,extend
//   MIN=xx,yy      minimum valid score = xx + yy * read length
//   FL=xx,yy       DP cell score floor = xx + yy * read length
//   NCEIL=xx,yy    max # N positions = xx + yy * read length
//   SEED=mm,len[,ival]  seed mismatches (0..=2), seed length, fixed interval
//   IVAL={L|S|C},a[,b]  interval as linear/sqrt/cube-root function of length
//   POSF=a,b       position budget: posmin, posfrac
//   ROWM=a,b       extension budget: rowmin, rowmult
//
// An empty string yields the defaults for the selected mode.

use crate::scoring::{Penalty, Scoring, SimpleFunc};
use thiserror::Error;

/// Default number of seed positions examined before the fractional budget
/// kicks in, and the fraction of the remainder examined.
pub const DEFAULT_POSMIN: f32 = 3.0;
pub const DEFAULT_POSFRAC: f32 = 0.3;

/// Default extension budget coefficients.
pub const DEFAULT_ROWMIN: f32 = 3.0;
pub const DEFAULT_ROWMULT: f32 = 2.0;

pub const DEFAULT_SEEDMMS: u32 = 0;
pub const DEFAULT_SEEDLEN: u32 = 22;

/// Policy-string parse failure, identifying the offending token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("unknown policy label in token `{0}`")]
    UnknownLabel(String),
    #[error("malformed value `{value}` for policy label {label}")]
    MalformedValue { label: &'static str, value: String },
    #[error("seed mismatches must be in 0..=2, got `{0}`")]
    SeedMismatchRange(String),
}

/// How the seed interval scales with read length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvalKind {
    Linear,
    Sqrt,
    CubeRoot,
}

impl IvalKind {
    fn code(self) -> char {
        match self {
            IvalKind::Linear => 'L',
            IvalKind::Sqrt => 'S',
            IvalKind::CubeRoot => 'C',
        }
    }
}

/// Complete scoring + seed-layout configuration produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedPolicy {
    pub local: bool,
    pub match_bonus: i32,
    pub mismatch: Penalty,
    pub n_pen: Penalty,
    pub read_gap_const: i32,
    pub read_gap_linear: i32,
    pub ref_gap_const: i32,
    pub ref_gap_linear: i32,
    /// Minimum valid alignment score as a function of read length
    pub min_score: SimpleFunc,
    /// DP cell floor as a function of read length
    pub score_floor: SimpleFunc,
    /// Ceiling on N positions as a function of read length
    pub n_ceil: SimpleFunc,
    pub seed_mms: u32,
    pub seed_len: u32,
    /// Fixed interval between seeds; `None` means derive from `ival`
    pub seed_period: Option<u32>,
    pub ival: IvalKind,
    pub ival_a: f32,
    pub ival_b: f32,
    pub posmin: f32,
    pub posfrac: f32,
    pub rowmin: f32,
    pub rowmult: f32,
}

impl SeedPolicy {
    /// Defaults for the selected alignment mode.
    pub fn defaults(local: bool) -> Self {
        SeedPolicy {
            local,
            match_bonus: if local { 10 } else { 0 },
            mismatch: Penalty::Constant(30),
            n_pen: Penalty::Constant(1),
            read_gap_const: 25,
            read_gap_linear: 15,
            ref_gap_const: 25,
            ref_gap_linear: 15,
            min_score: if local {
                SimpleFunc::new(5.0, 0.5)
            } else {
                SimpleFunc::new(-3.0, -2.0)
            },
            score_floor: if local {
                SimpleFunc::new(0.0, 0.0)
            } else {
                SimpleFunc::new(f32::NEG_INFINITY, 0.0)
            },
            n_ceil: SimpleFunc::new(0.0, 0.15),
            seed_mms: DEFAULT_SEEDMMS,
            seed_len: DEFAULT_SEEDLEN,
            seed_period: None,
            ival: IvalKind::Sqrt,
            ival_a: 1.0,
            ival_b: 0.0,
            posmin: DEFAULT_POSMIN,
            posfrac: DEFAULT_POSFRAC,
            rowmin: DEFAULT_ROWMIN,
            rowmult: DEFAULT_ROWMULT,
        }
    }

    /// Parse a `LAB=VAL;...` policy string on top of the mode defaults.
    pub fn parse(s: &str, local: bool) -> Result<Self, PolicyError> {
        let mut pol = SeedPolicy::defaults(local);
        for tok in s.split(';') {
            let tok = tok.trim();
            if tok.is_empty() {
                continue;
            }
            let (label, val) = tok
                .split_once('=')
                .ok_or_else(|| PolicyError::UnknownLabel(tok.to_string()))?;
            match label {
                "MA" => pol.match_bonus = parse_int("MA", val)?,
                "MMP" => pol.mismatch = parse_penalty("MMP", val)?,
                "NP" => pol.n_pen = parse_penalty("NP", val)?,
                "RDG" => {
                    let (c, l) = parse_int_pair("RDG", val)?;
                    pol.read_gap_const = c;
                    pol.read_gap_linear = l;
                }
                "RFG" => {
                    let (c, l) = parse_int_pair("RFG", val)?;
                    pol.ref_gap_const = c;
                    pol.ref_gap_linear = l;
                }
                "MIN" => pol.min_score = parse_func("MIN", val)?,
                "FL" => pol.score_floor = parse_func("FL", val)?,
                "NCEIL" => pol.n_ceil = parse_func("NCEIL", val)?,
                "SEED" => {
                    let parts: Vec<&str> = val.split(',').collect();
                    if parts.is_empty() || parts.len() > 3 {
                        return Err(malformed("SEED", val));
                    }
                    let mms: u32 =
                        parts[0].parse().map_err(|_| malformed("SEED", val))?;
                    if mms > 2 {
                        return Err(PolicyError::SeedMismatchRange(parts[0].to_string()));
                    }
                    pol.seed_mms = mms;
                    if parts.len() > 1 {
                        pol.seed_len =
                            parts[1].parse().map_err(|_| malformed("SEED", val))?;
                    }
                    if parts.len() > 2 {
                        pol.seed_period =
                            Some(parts[2].parse().map_err(|_| malformed("SEED", val))?);
                    }
                }
                "IVAL" => {
                    let parts: Vec<&str> = val.split(',').collect();
                    if parts.is_empty() || parts.len() > 3 {
                        return Err(malformed("IVAL", val));
                    }
                    pol.ival = match parts[0] {
                        "L" => IvalKind::Linear,
                        "S" => IvalKind::Sqrt,
                        "C" => IvalKind::CubeRoot,
                        _ => return Err(malformed("IVAL", val)),
                    };
                    if parts.len() > 1 {
                        pol.ival_a =
                            parts[1].parse().map_err(|_| malformed("IVAL", val))?;
                    }
                    if parts.len() > 2 {
                        pol.ival_b =
                            parts[2].parse().map_err(|_| malformed("IVAL", val))?;
                    }
                }
                "POSF" => {
                    let (a, b) = parse_float_pair("POSF", val)?;
                    pol.posmin = a;
                    pol.posfrac = b;
                }
                "ROWM" => {
                    let (a, b) = parse_float_pair("ROWM", val)?;
                    pol.rowmin = a;
                    pol.rowmult = b;
                }
                _ => return Err(PolicyError::UnknownLabel(tok.to_string())),
            }
        }
        Ok(pol)
    }

    /// Render the canonical policy string; `parse(to_policy_string(p),
    /// p.local)` reproduces `p`.
    pub fn to_policy_string(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("MA={}", self.match_bonus));
        s.push_str(&format!(";MMP={}", fmt_penalty(self.mismatch)));
        s.push_str(&format!(";NP={}", fmt_penalty(self.n_pen)));
        s.push_str(&format!(";RDG={},{}", self.read_gap_const, self.read_gap_linear));
        s.push_str(&format!(";RFG={},{}", self.ref_gap_const, self.ref_gap_linear));
        s.push_str(&format!(";MIN={},{}", self.min_score.konst, self.min_score.linear));
        s.push_str(&format!(";FL={},{}", self.score_floor.konst, self.score_floor.linear));
        s.push_str(&format!(";NCEIL={},{}", self.n_ceil.konst, self.n_ceil.linear));
        match self.seed_period {
            Some(p) => s.push_str(&format!(";SEED={},{},{}", self.seed_mms, self.seed_len, p)),
            None => s.push_str(&format!(";SEED={},{}", self.seed_mms, self.seed_len)),
        }
        s.push_str(&format!(
            ";IVAL={},{},{}",
            self.ival.code(),
            self.ival_a,
            self.ival_b
        ));
        s.push_str(&format!(";POSF={},{}", self.posmin, self.posfrac));
        s.push_str(&format!(";ROWM={},{}", self.rowmin, self.rowmult));
        s
    }

    /// Scoring scheme implied by this policy.
    pub fn scoring(&self) -> Scoring {
        Scoring {
            local: self.local,
            match_bonus: self.match_bonus,
            mismatch: self.mismatch,
            n_pen: self.n_pen,
            read_gap_const: self.read_gap_const,
            read_gap_linear: self.read_gap_linear,
            ref_gap_const: self.ref_gap_const,
            ref_gap_linear: self.ref_gap_linear,
        }
    }

    /// Minimum valid score for a read of the given length.
    pub fn min_score(&self, rdlen: usize) -> i64 {
        self.min_score.eval(rdlen).round() as i64
    }

    /// DP cell floor for a read of the given length.
    pub fn floor_score(&self, rdlen: usize) -> i64 {
        let f = self.score_floor.eval(rdlen);
        if f == f32::NEG_INFINITY {
            i64::MIN
        } else {
            f.round() as i64
        }
    }

    /// Ceiling on N positions for a read of the given length, never more
    /// than the read length itself.
    pub fn n_ceiling(&self, rdlen: usize) -> usize {
        let c = self.n_ceil.eval(rdlen).round().max(0.0) as usize;
        c.min(rdlen)
    }

    /// Interval between consecutive seed offsets, floored at 1.
    pub fn interval(&self, rdlen: usize) -> u32 {
        if let Some(p) = self.seed_period {
            return p.max(1);
        }
        let x = rdlen as f32;
        let f = match self.ival {
            IvalKind::Linear => self.ival_a * x + self.ival_b,
            IvalKind::Sqrt => self.ival_a * x.sqrt() + self.ival_b,
            IvalKind::CubeRoot => self.ival_a * x.cbrt() + self.ival_b,
        };
        (f.floor() as i64).max(1) as u32
    }
}

fn malformed(label: &'static str, value: &str) -> PolicyError {
    PolicyError::MalformedValue {
        label,
        value: value.to_string(),
    }
}

fn parse_int(label: &'static str, val: &str) -> Result<i32, PolicyError> {
    val.parse().map_err(|_| malformed(label, val))
}

fn parse_int_pair(label: &'static str, val: &str) -> Result<(i32, i32), PolicyError> {
    let (a, b) = val.split_once(',').ok_or_else(|| malformed(label, val))?;
    Ok((
        a.parse().map_err(|_| malformed(label, val))?,
        b.parse().map_err(|_| malformed(label, val))?,
    ))
}

fn parse_float_pair(label: &'static str, val: &str) -> Result<(f32, f32), PolicyError> {
    let (a, b) = val.split_once(',').ok_or_else(|| malformed(label, val))?;
    Ok((
        a.parse().map_err(|_| malformed(label, val))?,
        b.parse().map_err(|_| malformed(label, val))?,
    ))
}

fn parse_func(label: &'static str, val: &str) -> Result<SimpleFunc, PolicyError> {
    let (k, l) = parse_float_pair(label, val)?;
    Ok(SimpleFunc::new(k, l))
}

fn parse_penalty(label: &'static str, val: &str) -> Result<Penalty, PolicyError> {
    match val {
        "Q" => Ok(Penalty::Qual),
        "R" => Ok(Penalty::RoundedQual),
        _ => {
            let num = val.strip_prefix('C').ok_or_else(|| malformed(label, val))?;
            Ok(Penalty::Constant(
                num.parse().map_err(|_| malformed(label, val))?,
            ))
        }
    }
}

fn fmt_penalty(p: Penalty) -> String {
    match p {
        Penalty::Constant(c) => format!("C{}", c),
        Penalty::Qual => "Q".to_string(),
        Penalty::RoundedQual => "R".to_string(),
    }
}
