//! Migration between the two phases
//!
//! Each phase periodically stores its best individuals under every
//! criterion; the other phase then injects them into its population.

use std::sync::Arc;

use crate::behaviour::BehaviourManager;
use crate::config::Config;
use crate::population::criteria::{Criterion, Phase};
use crate::population::individual::Individual;
use crate::population::population::{recompute_all, Population};
use crate::state::Corpus;

#[derive(Clone, Debug, Default)]
pub struct Migration {
    size: usize,
    stored: [Vec<Arc<Individual>>; 2],
}

impl Migration {
    /// Store `size` individuals per criterion and phase
    pub fn new(size: usize) -> Self {
        Self {
            size,
            stored: [Vec::new(), Vec::new()],
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.size_for_migration())
    }

    /// Replace what `phase` offers with the best of its population
    pub fn store(&mut self, phase: Phase, population: &Population, generation: usize, config: &Config) {
        let stored = &mut self.stored[phase.index()];
        stored.clear();
        for criterion in Criterion::ALL {
            stored.extend(population.best_n(self.size, criterion, generation, config));
        }
    }

    /// What the other phase offers to `phase`
    pub fn elite_from_other(&self, phase: Phase) -> &[Arc<Individual>] {
        &self.stored[phase.other().index()]
    }

    pub fn recompute(&mut self, behaviour: &BehaviourManager, corpus: &Corpus) {
        for stored in self.stored.iter_mut() {
            recompute_all(stored, behaviour, corpus);
            stored.retain(|i| i.is_valid());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::individual::tests::scored;

    #[test]
    fn test_exchange_between_phases() {
        let config = Config::default();
        let mut migration = Migration::new(1);
        let fp_population = Population::from_individuals(
            vec![Arc::new(scored("x > 1", 0.0, 0.9)), Arc::new(scored("x > 2", 0.3, 0.3))],
            2,
        );
        migration.store(Phase::Fp, &fp_population, 0, &config);
        assert!(migration.elite_from_other(Phase::Fp).is_empty());

        let offered: Vec<&str> = migration
            .elite_from_other(Phase::Fn)
            .iter()
            .map(|i| i.assertion())
            .collect();
        // FP_FN, FN_FP, FN+FP, FN*FP
        assert_eq!(offered, vec!["(x > 1)", "(x > 2)", "(x > 2)", "(x > 2)"]);
    }

    #[test]
    fn test_store_replaces_previous_offer() {
        let config = Config::default();
        let mut migration = Migration::new(2);
        let first = Population::from_individuals(vec![Arc::new(scored("x > 1", 0.1, 0.1))], 1);
        let second = Population::from_individuals(vec![Arc::new(scored("y > 1", 0.1, 0.1))], 1);
        migration.store(Phase::Fn, &first, 0, &config);
        migration.store(Phase::Fn, &second, 1, &config);
        let offered = migration.elite_from_other(Phase::Fp);
        assert_eq!(offered.len(), 4);
        assert!(offered.iter().all(|i| i.assertion() == "(y > 1)"));
    }
}
