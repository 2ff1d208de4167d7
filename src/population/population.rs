//! Population type
//!
//! Individuals are shared through `Arc` with the assertion cache and the
//! elite lists; they are computed before being shared and only copied
//! when the corpus grows.

use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::behaviour::BehaviourManager;
use crate::config::Config;
use crate::population::criteria::Criterion;
use crate::population::individual::Individual;
use crate::state::Corpus;

/// The individuals of one phase for one generation
#[derive(Clone, Debug, Default)]
pub struct Population {
    individuals: Vec<Arc<Individual>>,
    max_size: usize,
}

impl Population {
    pub fn new(max_size: usize) -> Self {
        Self {
            individuals: Vec::with_capacity(max_size),
            max_size,
        }
    }

    pub fn from_individuals(individuals: Vec<Arc<Individual>>, max_size: usize) -> Self {
        Self { individuals, max_size }
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.max_size
    }

    /// Add a computed individual; invalid ones are rejected
    pub fn add(&mut self, individual: Arc<Individual>) -> bool {
        if individual.is_valid() {
            self.individuals.push(individual);
            true
        } else {
            false
        }
    }

    /// Add individuals without checking validity
    pub fn extend<I: IntoIterator<Item = Arc<Individual>>>(&mut self, individuals: I) {
        self.individuals.extend(individuals);
    }

    pub fn clear(&mut self) {
        self.individuals.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Individual>> {
        self.individuals.iter()
    }

    pub fn individuals(&self) -> &[Arc<Individual>] {
        &self.individuals
    }

    pub fn into_individuals(self) -> Vec<Arc<Individual>> {
        self.individuals
    }

    /// Sort best first under `criterion`
    pub fn sort_by(&mut self, criterion: Criterion, generation: usize, config: &Config) {
        let cmp = criterion.comparator(generation, config);
        self.individuals.sort_by(|a, b| cmp(a, b));
    }

    /// Best individual under `criterion`
    pub fn best(&self, criterion: Criterion, generation: usize, config: &Config) -> Option<&Arc<Individual>> {
        let cmp = criterion.comparator(generation, config);
        self.individuals.iter().min_by(|a, b| cmp(a, b))
    }

    /// The `n` best individuals under `criterion`
    pub fn best_n(&self, n: usize, criterion: Criterion, generation: usize, config: &Config) -> Vec<Arc<Individual>> {
        let mut sorted = self.individuals.clone();
        let cmp = criterion.comparator(generation, config);
        sorted.sort_by(|a, b| cmp(a, b));
        sorted.truncate(n);
        sorted
    }

    /// Keep the first `size` individuals
    pub fn truncate(&mut self, size: usize) {
        self.individuals.truncate(size);
    }

    /// Bring every individual up to date with a grown corpus
    ///
    /// Individuals that became invalid are removed.
    pub fn recompute(&mut self, behaviour: &BehaviourManager, corpus: &Corpus) {
        recompute_all(&mut self.individuals, behaviour, corpus);
        self.individuals.retain(|i| i.is_valid());
    }

    /// Averages over the population
    pub fn statistics(&self) -> PopulationStatistics {
        let n = self.individuals.len();
        if n == 0 {
            return PopulationStatistics::default();
        }
        let mut stats = PopulationStatistics::default();
        for ind in &self.individuals {
            let (fp, fn_) = (ind.fitness_fp(), ind.fitness_fn());
            stats.avg_fp += fp;
            stats.avg_fn += fn_;
            stats.avg_complexity += ind.complexity as f64;
            stats.avg_fp_plus_fn += fp + fn_;
            stats.avg_fp_times_fn += fp * fn_;
        }
        let n = n as f64;
        stats.avg_fp /= n;
        stats.avg_fn /= n;
        stats.avg_complexity /= n;
        stats.avg_fp_plus_fn /= n;
        stats.avg_fp_times_fn /= n;
        stats
    }
}

/// Population averages reported per generation
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PopulationStatistics {
    pub avg_fp: f64,
    pub avg_fn: f64,
    pub avg_complexity: f64,
    pub avg_fp_plus_fn: f64,
    pub avg_fp_times_fn: f64,
}

/// Compute every individual of a batch (parallel)
#[cfg(feature = "parallel")]
pub fn compute_all(individuals: &mut [Individual], behaviour: &BehaviourManager, corpus: &Corpus) {
    individuals
        .par_iter_mut()
        .for_each(|individual| individual.compute(behaviour, corpus));
}

/// Compute every individual of a batch (sequential fallback)
#[cfg(not(feature = "parallel"))]
pub fn compute_all(individuals: &mut [Individual], behaviour: &BehaviourManager, corpus: &Corpus) {
    for individual in individuals {
        individual.compute(behaviour, corpus);
    }
}

/// Recompute shared individuals, copying those still referenced elsewhere (parallel)
#[cfg(feature = "parallel")]
pub fn recompute_all(individuals: &mut [Arc<Individual>], behaviour: &BehaviourManager, corpus: &Corpus) {
    individuals
        .par_iter_mut()
        .for_each(|individual| Arc::make_mut(individual).recompute(behaviour, corpus));
}

/// Recompute shared individuals, copying those still referenced elsewhere (sequential fallback)
#[cfg(not(feature = "parallel"))]
pub fn recompute_all(individuals: &mut [Arc<Individual>], behaviour: &BehaviourManager, corpus: &Corpus) {
    for individual in individuals {
        Arc::make_mut(individual).recompute(behaviour, corpus);
    }
}

impl std::ops::Index<usize> for Population {
    type Output = Arc<Individual>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.individuals[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::individual::tests::scored;

    fn population() -> Population {
        Population::from_individuals(
            vec![
                Arc::new(scored("x > 1", 0.5, 0.1)),
                Arc::new(scored("x > 2", 0.1, 0.5)),
                Arc::new(scored("(x > 2) && (y > 1)", 0.1, 0.5)),
            ],
            3,
        )
    }

    #[test]
    fn test_sort_and_best() {
        let config = Config::default();
        let mut pop = population();
        assert!(pop.is_full());
        assert_eq!(pop.best(Criterion::FpFn, 0, &config).unwrap().assertion(), "(x > 2)");
        assert_eq!(pop.best(Criterion::FnFp, 0, &config).unwrap().assertion(), "(x > 1)");
        pop.sort_by(Criterion::FpFn, 0, &config);
        let order: Vec<&str> = pop.iter().map(|i| i.assertion()).collect();
        assert_eq!(order, vec!["(x > 2)", "((x > 2) && (y > 1))", "(x > 1)"]);
        let best = pop.best_n(2, Criterion::FnFp, 0, &config);
        assert_eq!(best[0].assertion(), "(x > 1)");
        assert_eq!(best.len(), 2);
    }

    #[test]
    fn test_add_rejects_invalid() {
        let mut pop = Population::new(2);
        let mut invalid = scored("x > 1", 0.0, 0.0);
        invalid.valid = Some(false);
        assert!(!pop.add(Arc::new(invalid)));
        assert!(pop.add(Arc::new(scored("x > 1", 0.0, 0.0))));
        assert_eq!(pop.len(), 1);
        assert!(!pop.is_full());
    }

    #[test]
    fn test_statistics() {
        let stats = population().statistics();
        assert!((stats.avg_fp - 0.7 / 3.0).abs() < 1e-12);
        assert!((stats.avg_fn - 1.1 / 3.0).abs() < 1e-12);
        assert!((stats.avg_complexity - 13.0 / 3.0).abs() < 1e-12);
        assert!((stats.avg_fp_plus_fn - 0.6).abs() < 1e-12);
        assert!((stats.avg_fp_times_fn - 0.05).abs() < 1e-12);
        assert_eq!(Population::new(5).statistics(), PopulationStatistics::default());
    }
}
