//! Termination criteria
//!
//! This module provides the criteria that stop the search: the time budget,
//! the generation budget, an external interruption and a perfect solution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::population::individual::Individual;

/// What the criteria look at, once per generation
#[derive(Clone, Copy, Debug)]
pub struct SearchState<'a> {
    pub generation: usize,
    pub elapsed: Duration,
    /// Best of the best of the phase, if any
    pub best: Option<&'a Individual>,
}

pub trait TerminationCriterion: Send + Sync {
    fn should_terminate(&self, state: &SearchState<'_>) -> bool;

    fn reason(&self) -> &'static str;
}

/// Stop after a number of generations
#[derive(Clone, Debug)]
pub struct MaxGenerations(pub usize);

impl MaxGenerations {
    pub fn new(max: usize) -> Self {
        Self(max)
    }
}

impl TerminationCriterion for MaxGenerations {
    fn should_terminate(&self, state: &SearchState<'_>) -> bool {
        state.generation >= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum generations reached"
    }
}

/// Stop when the wall-clock budget is spent
#[derive(Clone, Debug)]
pub struct TimeBudget(pub Duration);

impl TimeBudget {
    pub fn from_minutes(minutes: u64) -> Self {
        Self(Duration::from_secs(minutes * 60))
    }

    /// Time left at `elapsed`
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.0.saturating_sub(elapsed)
    }
}

impl TerminationCriterion for TimeBudget {
    fn should_terminate(&self, state: &SearchState<'_>) -> bool {
        state.elapsed >= self.0
    }

    fn reason(&self) -> &'static str {
        "Time budget exhausted"
    }
}

/// Stop when the shared flag is raised
#[derive(Clone, Debug, Default)]
pub struct Interrupted(pub Arc<AtomicBool>);

impl Interrupted {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self(flag)
    }
}

impl TerminationCriterion for Interrupted {
    fn should_terminate(&self, _state: &SearchState<'_>) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reason(&self) -> &'static str {
        "Interrupted"
    }
}

/// Stop on an assertion without false positives or false negatives,
/// once `min_generation` generations have run
#[derive(Clone, Debug)]
pub struct PerfectSolution {
    pub min_generation: usize,
}

impl PerfectSolution {
    pub fn new(min_generation: usize) -> Self {
        Self { min_generation }
    }
}

impl TerminationCriterion for PerfectSolution {
    fn should_terminate(&self, state: &SearchState<'_>) -> bool {
        state.generation >= self.min_generation && state.best.is_some_and(Individual::is_perfect)
    }

    fn reason(&self) -> &'static str {
        "Found a solution with zero FP and zero FN"
    }
}

/// Any of several criteria
#[derive(Default)]
pub struct AnyOf {
    criteria: Vec<Box<dyn TerminationCriterion>>,
}

impl AnyOf {
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion>>) -> Self {
        Self { criteria }
    }

    pub fn with<C: TerminationCriterion + 'static>(mut self, criterion: C) -> Self {
        self.criteria.push(Box::new(criterion));
        self
    }

    /// Reason of the first criterion that is met
    pub fn check(&self, state: &SearchState<'_>) -> Option<&'static str> {
        self.criteria
            .iter()
            .find(|c| c.should_terminate(state))
            .map(|c| c.reason())
    }
}

impl TerminationCriterion for AnyOf {
    fn should_terminate(&self, state: &SearchState<'_>) -> bool {
        self.check(state).is_some()
    }

    fn reason(&self) -> &'static str {
        "One of multiple criteria met"
    }
}

/// Wall clock of a run
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

pub mod prelude {
    pub use super::{
        AnyOf, Clock, Interrupted, MaxGenerations, PerfectSolution, SearchState, TerminationCriterion,
        TimeBudget,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::individual::tests::scored;

    fn state(generation: usize, elapsed_secs: u64, best: Option<&Individual>) -> SearchState<'_> {
        SearchState {
            generation,
            elapsed: Duration::from_secs(elapsed_secs),
            best,
        }
    }

    #[test]
    fn test_max_generations() {
        let criterion = MaxGenerations::new(100);
        assert!(!criterion.should_terminate(&state(50, 0, None)));
        assert!(!criterion.should_terminate(&state(99, 0, None)));
        assert!(criterion.should_terminate(&state(100, 0, None)));
    }

    #[test]
    fn test_time_budget() {
        let criterion = TimeBudget::from_minutes(1);
        assert!(!criterion.should_terminate(&state(0, 59, None)));
        assert!(criterion.should_terminate(&state(0, 60, None)));
        assert_eq!(criterion.remaining(Duration::from_secs(45)), Duration::from_secs(15));
        assert_eq!(criterion.remaining(Duration::from_secs(90)), Duration::ZERO);
    }

    #[test]
    fn test_interrupted() {
        let flag = Arc::new(AtomicBool::new(false));
        let criterion = Interrupted::new(Arc::clone(&flag));
        assert!(!criterion.should_terminate(&state(0, 0, None)));
        flag.store(true, Ordering::Relaxed);
        assert!(criterion.should_terminate(&state(0, 0, None)));
    }

    #[test]
    fn test_perfect_solution_waits_for_min_generation() {
        let perfect = scored("x > 1", 0.0, 0.0);
        let imperfect = scored("x > 2", 0.0, 0.1);
        let criterion = PerfectSolution::new(100);
        assert!(!criterion.should_terminate(&state(99, 0, Some(&perfect))));
        assert!(criterion.should_terminate(&state(100, 0, Some(&perfect))));
        assert!(!criterion.should_terminate(&state(100, 0, Some(&imperfect))));
        assert!(!criterion.should_terminate(&state(100, 0, None)));
    }

    #[test]
    fn test_any_of_reports_first_reason() {
        let criteria = AnyOf::default()
            .with(MaxGenerations::new(10))
            .with(TimeBudget::from_minutes(1));
        assert_eq!(criteria.check(&state(5, 0, None)), None);
        assert_eq!(criteria.check(&state(5, 61, None)), Some("Time budget exhausted"));
        assert_eq!(criteria.check(&state(10, 61, None)), Some("Maximum generations reached"));
        assert!(criteria.should_terminate(&state(10, 0, None)));
        assert!(!criteria.should_terminate(&state(9, 0, None)));
    }
}
