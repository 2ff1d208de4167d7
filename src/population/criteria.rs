//! Comparison criteria between individuals
//!
//! Every criterion breaks ties by complexity. Elite-valid individuals may be
//! rewarded: when exactly one of the two compared individuals is elite
//! valid, its rates are scaled by the generation's reward factor before the
//! comparison.

use std::cmp::Ordering;
use std::fmt;

use crate::config::Config;
use crate::population::individual::Individual;

/// The two search phases, each favouring one objective
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// False positives first
    Fp,
    /// False negatives first
    Fn,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Fp, Phase::Fn];

    /// Criterion ranking the population of this phase
    pub fn criterion(self) -> Criterion {
        match self {
            Phase::Fp => Criterion::FpFn,
            Phase::Fn => Criterion::FnFp,
        }
    }

    pub fn other(self) -> Phase {
        match self {
            Phase::Fp => Phase::Fn,
            Phase::Fn => Phase::Fp,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Phase::Fp => 0,
            Phase::Fn => 1,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Fp => write!(f, "FP"),
            Phase::Fn => write!(f, "FN"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Criterion {
    /// FP, then FN
    FpFn,
    /// FN, then FP
    FnFp,
    /// FP + FN
    FnPlusFp,
    /// FP × FN, or the larger rate when either is zero
    FnTimesFp,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::FpFn,
        Criterion::FnFp,
        Criterion::FnPlusFp,
        Criterion::FnTimesFp,
    ];

    /// Compare two individuals at `generation`; `Less` means `a` is better
    pub fn compare(self, a: &Individual, b: &Individual, generation: usize, config: &Config) -> Ordering {
        let (mut fp_a, mut fn_a) = (a.fitness_fp(), a.fitness_fn());
        let (mut fp_b, mut fn_b) = (b.fitness_fp(), b.fitness_fn());
        if config.elite_valid_rewarded && a.is_elite_valid() != b.is_elite_valid() {
            let reward = config.elite_valid_reward(generation);
            if a.is_elite_valid() {
                fp_a *= reward;
                fn_a *= reward;
            } else {
                fp_b *= reward;
                fn_b *= reward;
            }
        }

        let primary = match self {
            Criterion::FpFn => fp_a.total_cmp(&fp_b).then_with(|| fn_a.total_cmp(&fn_b)),
            Criterion::FnFp => fn_a.total_cmp(&fn_b).then_with(|| fp_a.total_cmp(&fp_b)),
            Criterion::FnPlusFp => (fp_a + fn_a).total_cmp(&(fp_b + fn_b)),
            Criterion::FnTimesFp => product(fp_a, fn_a).total_cmp(&product(fp_b, fn_b)),
        };
        primary.then_with(|| a.complexity.cmp(&b.complexity))
    }

    /// Comparator closure for sorting
    pub fn comparator<'a>(
        self,
        generation: usize,
        config: &'a Config,
    ) -> impl Fn(&Individual, &Individual) -> Ordering + 'a {
        move |a, b| self.compare(a, b, generation, config)
    }
}

fn product(fp: f64, fn_: f64) -> f64 {
    if fp == 0.0 || fn_ == 0.0 {
        fp.max(fn_)
    } else {
        fp * fn_
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Criterion::FpFn => "FP_FN_complexity",
            Criterion::FnFp => "FN_FP_complexity",
            Criterion::FnPlusFp => "FNplusFP_complexity",
            Criterion::FnTimesFp => "FNmultiplyFP_complexity",
        };
        write!(f, "{}", name)
    }
}
