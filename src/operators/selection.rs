//! Selection operators
//!
//! This module provides the parent selections of the search. Each returns
//! two parents from the population of the current phase.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};

use crate::cache::manager::signature_of;
use crate::cache::AssertionManager;
use crate::error::{OperatorError, OperatorResult};
use crate::fitness::bitmap::StateIds;
use crate::operators::traits::ParentSelection;
use crate::population::criteria::Phase;
use crate::population::individual::Individual;

fn empty_population<T>() -> OperatorResult<T> {
    OperatorResult::Failed(OperatorError::SelectionFailed("population is empty".to_string()))
}

/// Both parents drawn uniformly
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSelection;

impl ParentSelection for RandomSelection {
    fn select<R: Rng>(
        &self,
        population: &[Arc<Individual>],
        _phase: Phase,
        _cache: &AssertionManager,
        rng: &mut R,
    ) -> OperatorResult<(Arc<Individual>, Arc<Individual>)> {
        match (population.choose(rng), population.choose(rng)) {
            (Some(a), Some(b)) => OperatorResult::Success((Arc::clone(a), Arc::clone(b))),
            _ => empty_population(),
        }
    }
}

/// Binary tournament for each parent
///
/// The comparison follows the phase: FN first in the FN phase, FP first
/// in the FP phase. Ties are broken at random.
#[derive(Clone, Copy, Debug)]
pub struct TournamentSelection {
    /// Scale rates by `2^(complexity - theta)` before comparing
    pub penalized: bool,
    pub theta: i32,
}

impl TournamentSelection {
    pub fn new(penalized: bool, theta: i32) -> Self {
        Self { penalized, theta }
    }

    fn parent<R: Rng>(&self, population: &[Arc<Individual>], phase: Phase, rng: &mut R) -> Option<Arc<Individual>> {
        let a = population.choose(rng)?;
        let b = population.choose(rng)?;
        let order = match (phase, self.penalized) {
            (Phase::Fn, false) => a.compare_fn_fp(b),
            (Phase::Fp, false) => a.compare_fp_fn(b),
            (Phase::Fn, true) => a.compare_fn_fp_penalized(b, self.theta),
            (Phase::Fp, true) => a.compare_fp_fn_penalized(b, self.theta),
        };
        let winner = match order {
            std::cmp::Ordering::Less => a,
            std::cmp::Ordering::Greater => b,
            std::cmp::Ordering::Equal => {
                if rng.gen_bool(0.5) {
                    a
                } else {
                    b
                }
            }
        };
        Some(Arc::clone(winner))
    }
}

impl ParentSelection for TournamentSelection {
    fn select<R: Rng>(
        &self,
        population: &[Arc<Individual>],
        phase: Phase,
        _cache: &AssertionManager,
        rng: &mut R,
    ) -> OperatorResult<(Arc<Individual>, Arc<Individual>)> {
        match (self.parent(population, phase, rng), self.parent(population, phase, rng)) {
            (Some(a), Some(b)) => OperatorResult::Success((a, b)),
            _ => empty_population(),
        }
    }
}

/// A random parent and a mate that complements it
///
/// The mate's signature group is drawn among the cached groups, weighted by
/// the number of executions the group classifies correctly and the parent
/// does not. The groups of the other phase are used with probability
/// `1 - prob_same_phase`.
#[derive(Clone, Copy, Debug)]
pub struct BestMatchSelection {
    pub prob_same_phase: f64,
}

impl BestMatchSelection {
    pub fn new(prob_same_phase: f64) -> Self {
        Self { prob_same_phase }
    }

    fn best_match<R: Rng>(
        &self,
        parent: &Individual,
        phase: Phase,
        cache: &AssertionManager,
        rng: &mut R,
    ) -> Option<Arc<Individual>> {
        let phase = if rng.gen::<f64>() < self.prob_same_phase {
            phase
        } else {
            phase.other()
        };
        let parent_ids = signature_of(phase, parent);
        let groups = cache.signatures(phase);

        // map iteration order is not stable across runs
        let mut candidates: Vec<(StateIds, usize)> = groups
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| (entry.key().clone(), entry.key().count_difference(parent_ids)))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let weights: Vec<f64> = candidates.iter().map(|(_, gained)| *gained as f64).collect();
        let index = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..candidates.len()),
        };
        let key = candidates.swap_remove(index).0;
        let mates = cache.individuals_with(phase, &key);
        mates.choose(rng).cloned()
    }
}

impl ParentSelection for BestMatchSelection {
    fn select<R: Rng>(
        &self,
        population: &[Arc<Individual>],
        phase: Phase,
        cache: &AssertionManager,
        rng: &mut R,
    ) -> OperatorResult<(Arc<Individual>, Arc<Individual>)> {
        let Some(parent) = population.choose(rng) else {
            return empty_population();
        };
        let mate = match self.best_match(parent, phase, cache, rng) {
            Some(mate) => mate,
            // nothing cached yet
            None => match population.choose(rng) {
                Some(mate) => Arc::clone(mate),
                None => return empty_population(),
            },
        };
        OperatorResult::Success((Arc::clone(parent), mate))
    }
}

/// The selections of the search, drawn by weight
#[derive(Clone, Copy, Debug)]
pub enum SelectionKind {
    Random(RandomSelection),
    Tournament(TournamentSelection),
    BestMatch(BestMatchSelection),
}

impl ParentSelection for SelectionKind {
    fn select<R: Rng>(
        &self,
        population: &[Arc<Individual>],
        phase: Phase,
        cache: &AssertionManager,
        rng: &mut R,
    ) -> OperatorResult<(Arc<Individual>, Arc<Individual>)> {
        match self {
            SelectionKind::Random(s) => s.select(population, phase, cache, rng),
            SelectionKind::Tournament(s) => s.select(population, phase, cache, rng),
            SelectionKind::BestMatch(s) => s.select(population, phase, cache, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::population::individual::tests::scored;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn population() -> Vec<Arc<Individual>> {
        vec![
            Arc::new(scored("x > 1", 0.1, 0.9)),
            Arc::new(scored("x > 2", 0.9, 0.1)),
        ]
    }

    #[test]
    fn test_empty_population_fails() {
        let cache = AssertionManager::new(10, 10);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!RandomSelection.select(&[], Phase::Fp, &cache, &mut rng).is_ok());
        assert!(!TournamentSelection::new(false, 5)
            .select(&[], Phase::Fp, &cache, &mut rng)
            .is_ok());
        assert!(!BestMatchSelection::new(0.7).select(&[], Phase::Fp, &cache, &mut rng).is_ok());
    }

    #[test]
    fn test_tournament_follows_phase() {
        let cache = AssertionManager::new(10, 10);
        let mut rng = StdRng::seed_from_u64(7);
        let pop = population();
        let tournament = TournamentSelection::new(false, 5);
        let mut fp_wins = 0;
        let mut fn_wins = 0;
        for _ in 0..200 {
            let (a, b) = tournament.select(&pop, Phase::Fp, &cache, &mut rng).genome().unwrap();
            fp_wins += [a, b].iter().filter(|i| i.assertion() == "(x > 1)").count();
            let (a, b) = tournament.select(&pop, Phase::Fn, &cache, &mut rng).genome().unwrap();
            fn_wins += [a, b].iter().filter(|i| i.assertion() == "(x > 2)").count();
        }
        // a binary tournament loses only when both draws are the worse individual
        assert!(fp_wins > 250);
        assert!(fn_wins > 250);
    }

    #[test]
    fn test_best_match_prefers_complementary_mate() {
        let config = Config::default();
        let cache = AssertionManager::new(100, 10);
        let mut parent = scored("x > 1", 0.5, 0.5);
        parent.false_positives.good = StateIds::new(4);
        parent.false_positives.good.insert(0);
        parent.false_positives.good.insert(1);
        let parent = Arc::new(parent);

        let mut same = scored("x > 2", 0.5, 0.5);
        same.false_positives.good = parent.false_positives.good.clone();
        let mut complement = scored("x > 3", 0.5, 0.5);
        complement.false_positives.good = StateIds::new(4);
        complement.false_positives.good.insert(2);
        complement.false_positives.good.insert(3);
        cache.cache_signature(Phase::Fp, &Arc::new(same), 0, &config);
        cache.cache_signature(Phase::Fp, &Arc::new(complement), 0, &config);

        let selection = BestMatchSelection::new(1.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let (first, mate) = selection
                .select(&[Arc::clone(&parent)], Phase::Fp, &cache, &mut rng)
                .genome()
                .unwrap();
            assert_eq!(first.assertion(), "(x > 1)");
            assert_eq!(mate.assertion(), "(x > 3)");
        }
    }

    fn cache_with_groups(config: &Config) -> AssertionManager {
        let cache = AssertionManager::new(100, 10);
        for i in 0..12usize {
            let mut ind = scored(&format!("x > {}", i), 0.5, 0.5);
            ind.false_positives.good = StateIds::new(12);
            for j in 0..=i {
                ind.false_positives.good.insert((j * 5 + i) % 12);
            }
            cache.cache_signature(Phase::Fp, &Arc::new(ind), 0, config);
        }
        cache
    }

    #[test]
    fn test_best_match_is_reproducible() {
        let config = Config::default();
        let mut parent = scored("x > 100", 0.5, 0.5);
        parent.false_positives.good = StateIds::new(12);
        let parent = Arc::new(parent);
        let draws = |seed: u64| {
            // a fresh map hashes its keys with a fresh random state
            let cache = cache_with_groups(&config);
            let mut rng = StdRng::seed_from_u64(seed);
            (0..30)
                .map(|_| {
                    let (_, mate) = BestMatchSelection::new(1.0)
                        .select(&[Arc::clone(&parent)], Phase::Fp, &cache, &mut rng)
                        .genome()
                        .unwrap();
                    mate.assertion().to_string()
                })
                .collect::<Vec<_>>()
        };
        for seed in [1, 9, 42] {
            assert_eq!(draws(seed), draws(seed));
        }
    }

    #[test]
    fn test_best_match_without_cache() {
        let cache = AssertionManager::new(100, 10);
        let mut rng = StdRng::seed_from_u64(3);
        let pop = population();
        let (a, b) = BestMatchSelection::new(0.7)
            .select(&pop, Phase::Fn, &cache, &mut rng)
            .genome()
            .unwrap();
        assert!(pop.contains(&a));
        assert!(pop.contains(&b));
    }
}
