//! Alternating Variable Method
//!
//! Local search over numeric variables: each variable in turn is probed one
//! step in both directions, then moved with doubling steps while the
//! objective improves. Equal objectives are tolerated for a bounded number
//! of moves. The search restarts from the first variable as long as some
//! variable improved.
//!
//! [`LiteralSearch`] applies the method to the numeric literals of an
//! assertion.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::algorithms::context::RunContext;
use crate::behaviour::BehaviourManager;
use crate::genome::group::TreeGroup;
use crate::genome::tree::{round_literal, Node, Tree};
use crate::population::criteria::Criterion;
use crate::population::individual::Individual;
use crate::state::Corpus;

/// Variables searched by [`AvmSearch`]
pub trait SearchProblem {
    type Objective;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value(&self, index: usize) -> f64;

    fn set_value(&mut self, index: usize, value: f64);

    /// Move a variable by `steps` steps; false when it cannot move
    fn update_value(&mut self, index: usize, steps: i64) -> bool;

    fn evaluate(&mut self) -> Self::Objective;

    /// `Less` when `a` is better than `b`
    fn compare(&self, a: &Self::Objective, b: &Self::Objective) -> Ordering;

    /// Checked between moves
    fn should_stop(&self) -> bool {
        false
    }

    fn evaluate_with_delta(&mut self, index: usize, steps: i64) -> Self::Objective {
        let moved = self.update_value(index, steps);
        let objective = self.evaluate();
        if moved {
            self.update_value(index, -steps);
        }
        objective
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AvmSearch {
    pub plateau_steps: usize,
}

impl AvmSearch {
    pub fn new(plateau_steps: usize) -> Self {
        Self { plateau_steps }
    }

    /// Search until no variable improves; true if any did
    pub fn search<P: SearchProblem>(&self, problem: &mut P) -> bool {
        let mut any_improved = false;
        loop {
            let mut has_improved = false;
            for i in 0..problem.len() {
                if problem.should_stop() {
                    return any_improved;
                }
                let initial = problem.evaluate();
                let add = problem.evaluate_with_delta(i, 1);
                let sub = problem.evaluate_with_delta(i, -1);
                let diff_add = problem.compare(&initial, &add);
                let diff_sub = problem.compare(&initial, &sub);
                if diff_add == Ordering::Less && diff_sub == Ordering::Less {
                    continue;
                }
                let mut direction = 0;
                if diff_add != Ordering::Less {
                    direction += 1;
                }
                if diff_sub != Ordering::Less {
                    direction -= 1;
                }

                let old_value = problem.value(i);
                let improved = if direction == 0 {
                    let improved_add = self.search_variable(problem, i, 1);
                    let value_add = problem.value(i);
                    let objective_add = problem.evaluate();
                    problem.set_value(i, old_value);
                    let improved_sub = self.search_variable(problem, i, -1);
                    let value_sub = problem.value(i);
                    let objective_sub = problem.evaluate();
                    if improved_add || improved_sub {
                        if problem.compare(&objective_add, &objective_sub) == Ordering::Less {
                            problem.set_value(i, value_add);
                        } else {
                            problem.set_value(i, value_sub);
                        }
                        true
                    } else {
                        false
                    }
                } else {
                    self.search_variable(problem, i, direction)
                };

                if improved {
                    has_improved = true;
                } else {
                    problem.set_value(i, old_value);
                }
            }
            if !has_improved {
                return any_improved;
            }
            any_improved = true;
        }
    }

    /// Pattern moves with doubling steps from the current value of `index`
    fn search_variable<P: SearchProblem>(&self, problem: &mut P, index: usize, mut delta: i64) -> bool {
        let mut has_improved = false;
        let mut plateau = 0;

        let mut previous = problem.evaluate();
        let mut next = problem.evaluate_with_delta(index, delta);
        let mut progress = problem.compare(&previous, &next);
        match progress {
            Ordering::Greater => has_improved = true,
            Ordering::Less => return false,
            Ordering::Equal => plateau += 1,
        }
        if plateau > self.plateau_steps || !problem.update_value(index, delta) {
            return has_improved;
        }

        let mut updated = true;
        while updated {
            while updated {
                if problem.should_stop() {
                    return has_improved;
                }
                delta = delta.saturating_mul(2);
                updated = problem.update_value(index, delta);
                if updated {
                    previous = next;
                    next = problem.evaluate();
                    progress = problem.compare(&previous, &next);
                    if progress == Ordering::Greater {
                        has_improved = true;
                        plateau = 0;
                    } else {
                        if progress == Ordering::Less {
                            problem.update_value(index, -delta);
                        }
                        break;
                    }
                }
            }
            if progress == Ordering::Equal && plateau < self.plateau_steps {
                plateau += 1;
            } else {
                break;
            }
        }
        has_improved
    }
}

/// Numeric literals of an assertion as search variables
///
/// Every evaluation builds the assertion with the current literal values
/// and computes it on the corpus, through the cache. The best valid
/// individual seen under `criterion` is kept.
pub struct LiteralSearch<'a> {
    behaviour: &'a BehaviourManager,
    corpus: &'a Corpus,
    ctx: &'a RunContext,
    criterion: Criterion,
    generation: usize,
    group: TreeGroup,
    positions: Vec<(usize, Vec<usize>)>,
    values: Vec<f64>,
    step: f64,
    max_abs: f64,
    best: Arc<Individual>,
}

impl<'a> LiteralSearch<'a> {
    pub fn new(
        individual: &Arc<Individual>,
        criterion: Criterion,
        generation: usize,
        behaviour: &'a BehaviourManager,
        corpus: &'a Corpus,
        ctx: &'a RunContext,
    ) -> Self {
        let group = individual.group().clone();
        let positions = group.number_positions();
        let values = positions
            .iter()
            .map(|(slot, path)| match group.tree(*slot).and_then(|t| t.get_subtree(path)) {
                Some(Tree {
                    value: Node::Number(value),
                    ..
                }) => *value,
                _ => 0.0,
            })
            .collect();
        Self {
            behaviour,
            corpus,
            ctx,
            criterion,
            generation,
            group,
            positions,
            values,
            step: ctx.config.constant_search_step,
            max_abs: ctx.config.max_number * 100.0,
            best: Arc::clone(individual),
        }
    }

    pub fn best(&self) -> &Arc<Individual> {
        &self.best
    }

    fn current_group(&self) -> Option<TreeGroup> {
        let mut group = self.group.clone();
        for ((slot, path), value) in self.positions.iter().zip(&self.values) {
            let node = group.tree_mut(*slot)?.get_subtree_mut(path)?;
            *node = Tree::number(*value);
        }
        Some(group)
    }

    fn is_better(&self, candidate: &Individual) -> bool {
        candidate.is_valid()
            && (!self.best.is_valid()
                || self
                    .criterion
                    .compare(candidate, &self.best, self.generation, &self.ctx.config)
                    == Ordering::Less)
    }
}

impl SearchProblem for LiteralSearch<'_> {
    /// `None` for assertions that cannot be built or are invalid
    type Objective = Option<Arc<Individual>>;

    fn len(&self) -> usize {
        self.values.len()
    }

    fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    fn set_value(&mut self, index: usize, value: f64) {
        self.values[index] = round_literal(value);
    }

    fn update_value(&mut self, index: usize, steps: i64) -> bool {
        let value = round_literal(self.values[index] + steps as f64 * self.step);
        if !value.is_finite() || value.abs() > self.max_abs || value == self.values[index] {
            return false;
        }
        self.values[index] = value;
        true
    }

    fn evaluate(&mut self) -> Self::Objective {
        let group = self.current_group()?;
        let candidate = Individual::from_group(group).ok()?;
        let computed = self.ctx.evaluate(candidate, self.behaviour, self.corpus);
        if !computed.is_valid() {
            return None;
        }
        if self.is_better(&computed) {
            self.best = Arc::clone(&computed);
        }
        Some(computed)
    }

    fn compare(&self, a: &Self::Objective, b: &Self::Objective) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => self.criterion.compare(a, b, self.generation, &self.ctx.config),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    fn should_stop(&self) -> bool {
        self.ctx.should_stop()
    }
}

/// Tune the literals of `individual`; the improved individual, if any
pub fn search_constants(
    individual: &Arc<Individual>,
    criterion: Criterion,
    generation: usize,
    behaviour: &BehaviourManager,
    corpus: &Corpus,
    ctx: &RunContext,
) -> Option<Arc<Individual>> {
    let mut problem = LiteralSearch::new(individual, criterion, generation, behaviour, corpus, ctx);
    if problem.is_empty() {
        return None;
    }
    AvmSearch::new(ctx.config.constant_search_plateau).search(&mut problem);
    let best = problem.best();
    (best.assertion() != individual.assertion()).then(|| Arc::clone(best))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::{TestExecution, Variables, VariablesManager};

    /// Minimize |x - target| over integer steps
    struct Distance {
        x: Vec<f64>,
        target: Vec<f64>,
        evaluations: usize,
    }

    impl SearchProblem for Distance {
        type Objective = f64;

        fn len(&self) -> usize {
            self.x.len()
        }

        fn value(&self, index: usize) -> f64 {
            self.x[index]
        }

        fn set_value(&mut self, index: usize, value: f64) {
            self.x[index] = value;
        }

        fn update_value(&mut self, index: usize, steps: i64) -> bool {
            self.x[index] += steps as f64;
            true
        }

        fn evaluate(&mut self) -> f64 {
            self.evaluations += 1;
            self.x.iter().zip(&self.target).map(|(x, t)| (x - t).abs()).sum()
        }

        fn compare(&self, a: &f64, b: &f64) -> Ordering {
            a.total_cmp(b)
        }
    }

    #[test]
    fn test_avm_reaches_optimum() {
        let mut problem = Distance {
            x: vec![0.0, 10.0],
            target: vec![37.0, -5.0],
            evaluations: 0,
        };
        assert!(AvmSearch::new(16).search(&mut problem));
        assert_eq!(problem.x, vec![37.0, -5.0]);
        assert!(problem.evaluations < 1000);
    }

    #[test]
    fn test_avm_at_optimum() {
        let mut problem = Distance {
            x: vec![3.0],
            target: vec![3.0],
            evaluations: 0,
        };
        assert!(!AvmSearch::new(16).search(&mut problem));
        assert_eq!(problem.x, vec![3.0]);
    }

    #[test]
    fn test_search_constants_moves_threshold() {
        let execution = |x: f64| TestExecution::new("v1", format!("t{}", x), Variables::new().with_input("x", x));
        let corpus = Corpus::new(
            vec![execution(0.5), execution(0.8), execution(1.2)],
            vec![execution(0.1), execution(0.2)],
        );
        let vars = VariablesManager::from_variables(&corpus.correct[0].variables);
        let config = Arc::new(Config::default());
        let ctx = RunContext::new(Arc::clone(&config));
        let behaviour = BehaviourManager::regular(vars, config);
        let start = ctx.evaluate(behaviour.parse_individual("x > 0.9").unwrap(), &behaviour, &corpus);
        assert!(start.fitness_fp() > 0.0);

        let tuned = search_constants(&start, Criterion::FpFn, 1, &behaviour, &corpus, &ctx).unwrap();
        assert!(tuned.is_perfect());
        assert!(search_constants(&tuned, Criterion::FpFn, 1, &behaviour, &corpus, &ctx).is_none());

        let no_literals = ctx.evaluate(behaviour.parse_individual("x > x").unwrap(), &behaviour, &corpus);
        assert!(search_constants(&no_literals, Criterion::FpFn, 1, &behaviour, &corpus, &ctx).is_none());
    }
}
