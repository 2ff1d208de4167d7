//! Elitism
//!
//! The best individuals under every [`Criterion`] survive from one
//! generation to the next. Only elite-valid individuals enter the lists.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::behaviour::BehaviourManager;
use crate::config::Config;
use crate::fitness::bitmap::StateIds;
use crate::population::criteria::Criterion;
use crate::population::individual::Individual;
use crate::population::population::{recompute_all, Population};
use crate::state::Corpus;

/// Elite lists of one phase, one per criterion
#[derive(Clone, Debug)]
pub struct Elitism {
    size: usize,
    best: BTreeMap<Criterion, Vec<Arc<Individual>>>,
    best_of_the_best: Option<Arc<Individual>>,
    generation: usize,
}

impl Elitism {
    /// Keep `size` individuals under each criterion
    pub fn new(size: usize) -> Self {
        Self {
            size,
            best: Criterion::ALL.into_iter().map(|c| (c, Vec::with_capacity(size))).collect(),
            best_of_the_best: None,
            generation: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.size_for_elitism())
    }

    /// Merge the population into the elite lists and return the new elite
    pub fn update(&mut self, population: &Population, generation: usize, config: &Config) -> Vec<Arc<Individual>> {
        let mut elite = Vec::with_capacity(self.size * Criterion::ALL.len());
        for (criterion, list) in self.best.iter_mut() {
            let mut candidates: Vec<Arc<Individual>> = population.iter().cloned().collect();
            candidates.append(list);
            let cmp = criterion.comparator(generation, config);
            candidates.sort_by(|a, b| cmp(a, b));
            *list = distinct(candidates, config.elite_unique_signatures)
                .into_iter()
                .filter(|i| i.is_elite_valid())
                .take(self.size)
                .collect();
            elite.extend(list.iter().cloned());
        }
        elite
    }

    /// Elite lists of one criterion
    pub fn elite(&self, criterion: Criterion) -> &[Arc<Individual>] {
        self.best.get(&criterion).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every elite individual sorted under FP_FN
    ///
    /// Updates the best of the best when the head of the list beats it.
    pub fn all_best(&mut self, generation: usize, config: &Config) -> Vec<Arc<Individual>> {
        let mut all: Vec<Arc<Individual>> = self.best.values().flatten().cloned().collect();
        if all.is_empty() {
            return all;
        }
        let cmp = Criterion::FpFn.comparator(generation, config);
        all.sort_by(|a, b| cmp(a, b));
        let head = &all[0];
        let improved = match &self.best_of_the_best {
            None => true,
            Some(best) => cmp(head, best).is_lt(),
        };
        if improved {
            self.best_of_the_best = Some(Arc::clone(head));
            self.generation = generation;
        }
        all
    }

    /// The distinct best individuals, at most `count_best_individuals`
    pub fn best_individuals(&mut self, generation: usize, config: &Config) -> Vec<Arc<Individual>> {
        let all = self.all_best(generation, config);
        let mut best = distinct(all, config.elite_unique_signatures);
        best.truncate(config.count_best_individuals);
        best
    }

    /// Best individual ever found under FP_FN
    pub fn best_of_the_best(&mut self, generation: usize, config: &Config) -> Option<Arc<Individual>> {
        self.all_best(generation, config);
        self.best_of_the_best.clone()
    }

    /// The last best of the best without updating it
    pub fn current_best(&self) -> Option<&Arc<Individual>> {
        self.best_of_the_best.as_ref()
    }

    /// Generation the best of the best was found
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Bring every elite up to date with a grown corpus
    pub fn recompute(&mut self, behaviour: &BehaviourManager, corpus: &Corpus) {
        for list in self.best.values_mut() {
            recompute_all(list, behaviour, corpus);
            list.retain(|i| i.is_valid() && i.is_elite_valid());
        }
        if let Some(best) = self.best_of_the_best.as_mut() {
            Arc::make_mut(best).recompute(behaviour, corpus);
        }
    }
}

/// Drop repeated assertions, and with `unique_signatures` also repeated
/// FN signatures, keeping the first occurrence
pub fn distinct(individuals: Vec<Arc<Individual>>, unique_signatures: bool) -> Vec<Arc<Individual>> {
    let mut texts: HashSet<String> = HashSet::new();
    let mut signatures: HashSet<StateIds> = HashSet::new();
    individuals
        .into_iter()
        .filter(|i| {
            if unique_signatures && !signatures.insert(i.ids_fn_good().clone()) {
                return false;
            }
            texts.insert(i.assertion().to_string())
        })
        .collect()
}
