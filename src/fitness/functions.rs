//! False-positive and false-negative fitness functions
//!
//! Both objectives are minimized. The false-positive rate is the share of
//! correct executions on which the assertion fails; the false-negative rate
//! is the share of incorrect executions on which it holds. Evaluation
//! errors count as misclassifications.

use std::fmt::Debug;

use crate::fitness::bitmap::StateIds;
use crate::fitness::evaluator::EvaluationContext;
use crate::genome::tree::Tree;
use crate::state::{Corpus, TestExecution};

/// Outcome of one objective for one assertion
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Score {
    /// Misclassification rate in `[0, 1]`, `None` until computed
    pub value: Option<f64>,
    /// Executions classified correctly
    pub good: StateIds,
}

impl Score {
    /// Number of executions the score was computed on
    pub fn computed(&self) -> usize {
        self.good.len()
    }
}

/// One objective of the search
pub trait FitnessFunction: Send + Sync + Debug {
    /// Executions the objective is measured on
    fn executions<'a>(&self, corpus: &'a Corpus) -> &'a [TestExecution];

    /// Verdict an assertion must give on those executions
    fn expected(&self) -> bool;

    /// Score over the whole corpus
    fn compute(&self, tree: &Tree, ctx: &EvaluationContext<'_>) -> Score {
        self.recompute(tree, &Score::default(), ctx)
    }

    /// Score after the corpus grew
    ///
    /// Executions covered by `previous` keep their classification; only
    /// the new ones are evaluated.
    fn recompute(&self, tree: &Tree, previous: &Score, ctx: &EvaluationContext<'_>) -> Score {
        let executions = self.executions(ctx.corpus);
        let total = executions.len();
        let start = previous.computed().min(total);
        let mut good = StateIds::extend_from(&previous.good, start, total);

        for (offset, execution) in executions[start..].iter().enumerate() {
            let verdict = ctx.evaluator.evaluate(tree, &execution.variables);
            if verdict.as_ref().ok() == Some(&self.expected()) {
                good.insert(start + offset);
            }
        }

        let value = if total == 0 {
            0.0
        } else {
            (total - good.count_ones()) as f64 / total as f64
        };
        Score {
            value: Some(value),
            good,
        }
    }
}

/// Rate of correct executions on which the assertion fails
#[derive(Clone, Copy, Debug, Default)]
pub struct FalsePositiveFitness;

impl FitnessFunction for FalsePositiveFitness {
    fn executions<'a>(&self, corpus: &'a Corpus) -> &'a [TestExecution] {
        &corpus.correct
    }

    fn expected(&self) -> bool {
        true
    }
}

/// Rate of incorrect executions on which the assertion holds
#[derive(Clone, Copy, Debug, Default)]
pub struct FalseNegativeFitness;

impl FitnessFunction for FalseNegativeFitness {
    fn executions<'a>(&self, corpus: &'a Corpus) -> &'a [TestExecution] {
        &corpus.incorrect
    }

    fn expected(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::evaluator::GuardedEvaluator;
    use crate::genome::parser::TreeReader;
    use crate::state::{AnyNumber, Variables};

    fn execution(id: &str, x: f64) -> TestExecution {
        TestExecution::new("sys", id, Variables::new().with_input("x", x))
    }

    fn corpus() -> Corpus {
        Corpus::new(
            vec![execution("c1", 1.0), execution("c2", 5.0), execution("c3", 9.0)],
            vec![execution("i1", -1.0), execution("i2", 3.0)],
        )
    }

    fn tree(text: &str) -> Tree {
        TreeReader::new(&AnyNumber).read(text).unwrap()
    }

    #[test]
    fn test_false_positive_rate() {
        let corpus = corpus();
        let evaluator = GuardedEvaluator::new(1e-4);
        let ctx = EvaluationContext::new(&corpus, &evaluator);
        let score = FalsePositiveFitness.compute(&tree("x > 2"), &ctx);
        assert_eq!(score.value, Some(1.0 / 3.0));
        assert_eq!(score.good.iter_ones().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_false_negative_rate() {
        let corpus = corpus();
        let evaluator = GuardedEvaluator::new(1e-4);
        let ctx = EvaluationContext::new(&corpus, &evaluator);
        let score = FalseNegativeFitness.compute(&tree("x > 2"), &ctx);
        assert_eq!(score.value, Some(0.5));
        assert_eq!(score.good.iter_ones().collect::<Vec<_>>(), vec![0]);

        let weaker = FalseNegativeFitness.compute(&tree("x > 0"), &ctx);
        assert_eq!(weaker.value, Some(0.5));
    }

    #[test]
    fn test_errors_are_misclassifications() {
        let corpus = corpus();
        let evaluator = GuardedEvaluator::new(1e-4);
        let ctx = EvaluationContext::new(&corpus, &evaluator);
        let unknown = tree("y > 0");
        assert_eq!(FalsePositiveFitness.compute(&unknown, &ctx).value, Some(1.0));
        assert_eq!(FalseNegativeFitness.compute(&unknown, &ctx).value, Some(1.0));
    }

    #[test]
    fn test_recompute_after_growth() {
        let mut corpus = corpus();
        let evaluator = GuardedEvaluator::new(1e-4);
        let assertion = tree("x > 2");
        let previous = {
            let ctx = EvaluationContext::new(&corpus, &evaluator);
            FalsePositiveFitness.compute(&assertion, &ctx)
        };
        corpus.correct.push(execution("c4", 0.0));
        corpus.correct.push(execution("c5", 7.0));
        let ctx = EvaluationContext::new(&corpus, &evaluator);
        let incremental = FalsePositiveFitness.recompute(&assertion, &previous, &ctx);
        assert_eq!(incremental, FalsePositiveFitness.compute(&assertion, &ctx));
        assert_eq!(incremental.value, Some(2.0 / 5.0));
        assert_eq!(incremental.computed(), 5);
    }

    #[test]
    fn test_empty_executions() {
        let corpus = Corpus::default();
        let evaluator = GuardedEvaluator::new(1e-4);
        let ctx = EvaluationContext::new(&corpus, &evaluator);
        let score = FalsePositiveFitness.compute(&tree("x > 2"), &ctx);
        assert_eq!(score.value, Some(0.0));
        assert!(score.good.is_empty());
    }
}
