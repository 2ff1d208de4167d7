//! The assertion manager

use std::sync::Arc;

use dashmap::DashMap;
use log::debug;

use crate::config::Config;
use crate::error::{EvoResult, EvolutionError};
use crate::fitness::bitmap::StateIds;
use crate::population::criteria::{Criterion, Phase};
use crate::population::individual::Individual;

/// Individuals grouped by the executions of one phase they classify correctly
pub type SignatureMap = DashMap<StateIds, Vec<Arc<Individual>>>;

/// Caches of computed individuals shared by both phases
///
/// The text cache maps an assertion to its computed individual and stops
/// growing at `max_size_cache` entries. The signature maps keep, for every
/// classification signature, at most `max_size_signature_list` individuals;
/// when a list overflows the worst entry under FP + FN is evicted.
#[derive(Debug)]
pub struct AssertionManager {
    max_size_cache: usize,
    max_size_signature_list: usize,
    assertions: DashMap<String, Arc<Individual>>,
    signatures: [SignatureMap; 2],
}

impl AssertionManager {
    pub fn new(max_size_cache: usize, max_size_signature_list: usize) -> Self {
        Self {
            max_size_cache,
            max_size_signature_list,
            assertions: DashMap::new(),
            signatures: [DashMap::new(), DashMap::new()],
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_size_cache, config.max_size_best_matching_list)
    }

    /// Computed individual of an assertion, if cached
    pub fn get(&self, assertion: &str) -> Option<Arc<Individual>> {
        self.assertions.get(assertion).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, assertion: &str) -> bool {
        self.assertions.contains_key(assertion)
    }

    /// Cache a computed individual under its text; false when the cache is full
    pub fn cache_assertion(&self, individual: &Arc<Individual>) -> bool {
        if self.assertions.len() >= self.max_size_cache {
            return false;
        }
        self.assertions
            .entry(individual.assertion().to_string())
            .or_insert_with(|| Arc::clone(individual));
        true
    }

    /// Number of cached assertions
    pub fn len(&self) -> usize {
        self.assertions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assertions.is_empty()
    }

    /// Record an individual under its signature for `phase`
    pub fn cache_signature(&self, phase: Phase, individual: &Arc<Individual>, generation: usize, config: &Config) {
        if !individual.is_valid() {
            return;
        }
        let ids = signature_of(phase, individual);
        let map = &self.signatures[phase.index()];
        if !map.contains_key(ids) && map.len() >= self.max_size_cache {
            return;
        }

        let mut list = map.entry(ids.clone()).or_default();
        if list.iter().any(|cached| cached.assertion() == individual.assertion()) {
            return;
        }
        list.push(Arc::clone(individual));
        if list.len() > self.max_size_signature_list {
            let cmp = Criterion::FnPlusFp.comparator(generation, config);
            list.sort_by(|a, b| cmp(a, b));
            if let Some(evicted) = list.pop() {
                debug!("evicted {} from its signature list", evicted.assertion());
            }
        }
    }

    /// Signature groups of `phase`
    pub fn signatures(&self, phase: Phase) -> &SignatureMap {
        &self.signatures[phase.index()]
    }

    /// Individuals sharing the signature `ids` in `phase`
    pub fn individuals_with(&self, phase: Phase, ids: &StateIds) -> Vec<Arc<Individual>> {
        self.signatures[phase.index()]
            .get(ids)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }

    pub fn clear_all(&self) {
        self.assertions.clear();
        for map in &self.signatures {
            map.clear();
        }
    }

    /// Every cached individual must be stored under its own text
    pub fn check_integrity(&self) -> EvoResult<()> {
        for entry in self.assertions.iter() {
            if entry.key() != entry.value().assertion() {
                return Err(EvolutionError::CacheCorrupted {
                    key: entry.key().clone(),
                    assertion: entry.value().assertion().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// The bits of `individual` that key the signature map of `phase`
pub fn signature_of(phase: Phase, individual: &Individual) -> &StateIds {
    match phase {
        Phase::Fp => individual.ids_fp_good(),
        Phase::Fn => individual.ids_fn_good(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::individual::tests::scored;

    fn with_ids(text: &str, fp: f64, fn_: f64, fp_ids: &[usize]) -> Arc<Individual> {
        let mut ind = scored(text, fp, fn_);
        ind.false_positives.good = StateIds::new(4);
        for i in fp_ids {
            ind.false_positives.good.insert(*i);
        }
        Arc::new(ind)
    }

    #[test]
    fn test_text_cache() {
        let manager = AssertionManager::new(2, 10);
        let a = with_ids("x > 1", 0.0, 0.0, &[]);
        let b = with_ids("x > 2", 0.0, 0.0, &[]);
        let c = with_ids("x > 3", 0.0, 0.0, &[]);
        assert!(manager.cache_assertion(&a));
        assert!(manager.cache_assertion(&a));
        assert!(manager.cache_assertion(&b));
        assert!(!manager.cache_assertion(&c));
        assert_eq!(manager.len(), 2);
        assert!(manager.contains("(x > 1)"));
        assert_eq!(manager.get("(x > 2)").unwrap().assertion(), "(x > 2)");
        assert!(manager.get("(x > 3)").is_none());
        assert!(manager.check_integrity().is_ok());
        manager.clear_all();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_signature_lists_evict_worst() {
        let config = Config::default();
        let manager = AssertionManager::new(100, 2);
        let worst = with_ids("x > 1", 0.5, 0.5, &[0, 1]);
        let best = with_ids("x > 2", 0.1, 0.1, &[0, 1]);
        let middle = with_ids("x > 3", 0.2, 0.2, &[0, 1]);
        let other = with_ids("x > 4", 0.2, 0.2, &[3]);
        for ind in [&worst, &best, &middle, &other] {
            manager.cache_signature(Phase::Fp, ind, 0, &config);
        }
        manager.cache_signature(Phase::Fp, &best, 0, &config);

        let ids = signature_of(Phase::Fp, &best).clone();
        let kept: Vec<String> = manager
            .individuals_with(Phase::Fp, &ids)
            .iter()
            .map(|i| i.assertion().to_string())
            .collect();
        assert_eq!(kept, vec!["(x > 2)", "(x > 3)"]);
        assert_eq!(manager.signatures(Phase::Fp).len(), 2);
        assert!(manager.signatures(Phase::Fn).is_empty());
    }

    #[test]
    fn test_invalid_individuals_are_not_grouped() {
        let config = Config::default();
        let manager = AssertionManager::new(100, 2);
        let mut ind = scored("x > 1", 0.0, 0.0);
        ind.valid = Some(false);
        manager.cache_signature(Phase::Fn, &Arc::new(ind), 0, &config);
        assert!(manager.signatures(Phase::Fn).is_empty());
    }
}
