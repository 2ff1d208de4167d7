//! Assertion minimization
//!
//! An assertion is replaced by a smaller one that classifies exactly the
//! same executions correctly, until no such replacement exists.

use std::sync::Arc;

use log::debug;

use crate::algorithms::context::RunContext;
use crate::behaviour::BehaviourManager;
use crate::diagnostics::{StatKey, TimeKey};
use crate::population::individual::Individual;
use crate::state::Corpus;

/// Same correctly classified executions in both phases
pub fn is_min_equivalent(a: &Individual, b: &Individual) -> bool {
    a.ids_fp_good() == b.ids_fp_good() && a.ids_fn_good() == b.ids_fn_good()
}

/// Smallest equivalent of `individual` reachable by replacing one slot
/// with one of its proper subtrees at a time
///
/// The result never has a higher complexity than the input and always
/// classifies the same executions correctly.
pub fn minimize(
    individual: &Arc<Individual>,
    behaviour: &BehaviourManager,
    corpus: &Corpus,
    ctx: &RunContext,
) -> Arc<Individual> {
    ctx.timings
        .measure(TimeKey::Minimization, || minimize_untimed(individual, behaviour, corpus, ctx))
}

fn minimize_untimed(
    individual: &Arc<Individual>,
    behaviour: &BehaviourManager,
    corpus: &Corpus,
    ctx: &RunContext,
) -> Arc<Individual> {
    let mut best = if individual.is_computed() {
        Arc::clone(individual)
    } else {
        ctx.evaluate(individual.as_ref().clone(), behaviour, corpus)
    };
    if !best.is_valid() {
        return best;
    }

    loop {
        let current = Arc::clone(&best);
        if current.complexity <= 1 || ctx.is_interrupted() {
            break;
        }
        for candidate in simplifications(&current, behaviour, corpus, ctx) {
            if candidate.is_valid() && is_min_equivalent(&current, &candidate) && candidate.complexity < best.complexity {
                best = candidate;
            }
        }
        if Arc::ptr_eq(&best, &current) {
            break;
        }
        debug!("minimized {} to {}", current.assertion(), best.assertion());
    }
    best
}

/// Every individual obtained by replacing one slot with a proper subtree
fn simplifications(
    individual: &Individual,
    behaviour: &BehaviourManager,
    corpus: &Corpus,
    ctx: &RunContext,
) -> Vec<Arc<Individual>> {
    let group = individual.group();
    let mut candidates = Vec::new();
    for slot in group.slots() {
        let (Some(builder), Some(tree)) = (group.builder(slot), group.tree(slot)) else {
            continue;
        };
        for subtree in builder.minimize(tree) {
            ctx.stats.increment(StatKey::Minimizations);
            let Ok(candidate) = Individual::from_group(group.with_tree(slot, subtree)) else {
                continue;
            };
            if let Some(cached) = ctx.cached(candidate.assertion()) {
                candidates.push(cached);
                continue;
            }
            let computed = ctx.compute(candidate, behaviour, corpus);
            ctx.cache.cache_assertion(&computed);
            if computed.is_valid() {
                ctx.stats.increment(StatKey::MinimizationImprovements);
            }
            candidates.push(computed);
        }
    }
    candidates
}
