//! Shared state of a run
//!
//! Everything that used to be process-wide lives here and is passed to the
//! algorithm explicitly: the configuration, the assertion caches, the
//! counters and time accumulators, the interrupt flag and the clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::behaviour::BehaviourManager;
use crate::cache::AssertionManager;
use crate::config::Config;
use crate::diagnostics::{StatKey, Stats, TimeKey, Timings};
use crate::population::individual::Individual;
use crate::population::population::compute_all;
use crate::state::Corpus;
use crate::termination::{Clock, TimeBudget};

#[derive(Debug)]
pub struct RunContext {
    pub config: Arc<Config>,
    pub cache: AssertionManager,
    pub stats: Stats,
    pub timings: Timings,
    interrupt: Arc<AtomicBool>,
    clock: Clock,
}

impl RunContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            cache: AssertionManager::from_config(&config),
            stats: Stats::new(),
            timings: Timings::new(),
            interrupt: Arc::new(AtomicBool::new(false)),
            clock: Clock::start(),
            config,
        }
    }

    /// Share an interrupt flag raised from outside the run
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Restart the clock
    pub fn start_clock(&mut self) {
        self.clock = Clock::start();
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn time_budget(&self) -> TimeBudget {
        TimeBudget(Duration::from_millis(self.config.time_budget_millis()))
    }

    pub fn remaining(&self) -> Duration {
        self.time_budget().remaining(self.elapsed())
    }

    /// Interrupted or out of time
    pub fn should_stop(&self) -> bool {
        self.is_interrupted() || self.remaining().is_zero()
    }

    /// Cached individual with the same assertion, counted as a hit
    pub fn cached(&self, assertion: &str) -> Option<Arc<Individual>> {
        let cached = self.cache.get(assertion)?;
        self.stats.increment(StatKey::NumberCacheHitAssertion);
        Some(cached)
    }

    /// Compute one individual, counted as a miss
    pub fn compute(&self, mut individual: Individual, behaviour: &BehaviourManager, corpus: &Corpus) -> Arc<Individual> {
        self.stats.increment(StatKey::NumberCacheMissAssertion);
        self.stats.increment(StatKey::NumberOfUniqueAssertionEvaluated);
        self.timings
            .measure(TimeKey::ComputeFitnessFunction, || individual.compute(behaviour, corpus));
        Arc::new(individual)
    }

    /// Cached individual, or the candidate computed and cached
    pub fn evaluate(&self, individual: Individual, behaviour: &BehaviourManager, corpus: &Corpus) -> Arc<Individual> {
        if let Some(cached) = self.cached(individual.assertion()) {
            return cached;
        }
        let computed = self.compute(individual, behaviour, corpus);
        self.cache.cache_assertion(&computed);
        computed
    }

    /// Compute a batch of fresh individuals on the worker pool
    pub fn compute_batch(
        &self,
        mut individuals: Vec<Individual>,
        behaviour: &BehaviourManager,
        corpus: &Corpus,
    ) -> Vec<Arc<Individual>> {
        let count = individuals.len() as i64;
        self.stats.add(StatKey::NumberCacheMissAssertion, count);
        self.stats.add(StatKey::NumberOfUniqueAssertionEvaluated, count);
        self.timings.measure(TimeKey::ComputeFitnessFunction, || {
            compute_all(&mut individuals, behaviour, corpus)
        });
        individuals.into_iter().map(Arc::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{TestExecution, Variables, VariablesManager};

    fn setup() -> (BehaviourManager, Corpus) {
        let execution = |x: f64| TestExecution::new("v1", format!("t{}", x), Variables::new().with_input("x", x));
        let corpus = Corpus::new(vec![execution(1.0), execution(2.0)], vec![execution(-1.0)]);
        let vars = VariablesManager::from_variables(&corpus.correct[0].variables);
        (BehaviourManager::regular(vars, Arc::new(Config::default())), corpus)
    }

    #[test]
    fn test_evaluate_uses_cache() {
        let (behaviour, corpus) = setup();
        let ctx = RunContext::new(Arc::clone(&behaviour.config));
        let first = ctx.evaluate(behaviour.parse_individual("x > 0").unwrap(), &behaviour, &corpus);
        assert!(first.is_perfect());
        let second = ctx.evaluate(behaviour.parse_individual("x > 0").unwrap(), &behaviour, &corpus);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.stats.get(StatKey::NumberCacheMissAssertion), Some(1));
        assert_eq!(ctx.stats.get(StatKey::NumberCacheHitAssertion), Some(1));
    }

    #[test]
    fn test_compute_batch() {
        let (behaviour, corpus) = setup();
        let ctx = RunContext::new(Arc::clone(&behaviour.config));
        let batch = vec![
            behaviour.parse_individual("x > 0").unwrap(),
            behaviour.parse_individual("x < 0").unwrap(),
        ];
        let computed = ctx.compute_batch(batch, &behaviour, &corpus);
        assert!(computed.iter().all(|i| i.is_computed()));
        assert_eq!(computed[1].fitness_fp(), 1.0);
        assert!(ctx.cache.is_empty());
    }

    #[test]
    fn test_interrupt() {
        let ctx = RunContext::new(Arc::new(Config::default()));
        assert!(!ctx.should_stop());
        ctx.interrupt();
        assert!(ctx.should_stop());
    }
}
