//! Validity constraints on individuals
//!
//! A validator decides whether an individual may live in the population
//! (or, for the elite validator, in the elite lists). Invalid individuals
//! are never scored.

use std::fmt::Debug;

use crate::fitness::evaluator::EvaluationContext;
use crate::genome::relation::is_metamorphic_output_relation;
use crate::population::individual::Individual;

pub trait Validator: Send + Sync + Debug {
    fn validate(&self, individual: &mut Individual, ctx: &EvaluationContext<'_>) -> bool;

    /// Validity after the corpus grew; most validators keep the previous verdict
    fn revalidate(&self, individual: &mut Individual, previous: Option<bool>, ctx: &EvaluationContext<'_>) -> bool {
        match previous {
            Some(valid) => valid,
            None => self.validate(individual, ctx),
        }
    }
}

/// Accepts everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullValidator;

impl Validator for NullValidator {
    fn validate(&self, _individual: &mut Individual, _ctx: &EvaluationContext<'_>) -> bool {
        true
    }
}

/// Bounds the node count of the whole assertion
#[derive(Clone, Copy, Debug)]
pub struct ComplexityValidator {
    pub max: usize,
}

impl Validator for ComplexityValidator {
    fn validate(&self, individual: &mut Individual, _ctx: &EvaluationContext<'_>) -> bool {
        individual.complexity <= self.max
    }
}

/// Bounds the node count of one slot
#[derive(Clone, Copy, Debug)]
pub struct SlotComplexityValidator {
    pub slot: usize,
    pub max: usize,
}

impl Validator for SlotComplexityValidator {
    fn validate(&self, individual: &mut Individual, _ctx: &EvaluationContext<'_>) -> bool {
        individual
            .group()
            .tree(self.slot)
            .is_some_and(|tree| tree.number_of_nodes() <= self.max)
    }
}

/// The input relation must hold on a share of the correct executions
///
/// With `n` correct executions the number satisfying the relation must lie
/// in `[round(n * min), round(n * max)]`. The count is kept on the
/// individual so revalidation only evaluates new executions.
#[derive(Clone, Copy, Debug)]
pub struct InputRelationSatisfactionValidator {
    pub slot: usize,
    pub min: f64,
    pub max: f64,
}

impl InputRelationSatisfactionValidator {
    fn validate_from(&self, individual: &mut Individual, start: usize, count: usize, ctx: &EvaluationContext<'_>) -> bool {
        let executions = &ctx.corpus.correct;
        let total = executions.len();
        let start = start.min(total);
        let satisfied = match individual.group().tree(self.slot) {
            Some(relation) => {
                count
                    + executions[start..]
                        .iter()
                        .filter(|e| matches!(ctx.evaluator.evaluate(relation, &e.variables), Ok(true)))
                        .count()
            }
            None => return false,
        };
        individual.satisfaction.validated = total;
        individual.satisfaction.count = satisfied;

        let lower = (total as f64 * self.min).round() as usize;
        let upper = (total as f64 * self.max).round() as usize;
        satisfied >= lower && satisfied <= upper
    }
}

impl Validator for InputRelationSatisfactionValidator {
    fn validate(&self, individual: &mut Individual, ctx: &EvaluationContext<'_>) -> bool {
        self.validate_from(individual, 0, 0, ctx)
    }

    fn revalidate(&self, individual: &mut Individual, _previous: Option<bool>, ctx: &EvaluationContext<'_>) -> bool {
        let progress = individual.satisfaction;
        self.validate_from(individual, progress.validated, progress.count, ctx)
    }
}

/// The output relation must relate a source output with its follow-up
#[derive(Clone, Copy, Debug)]
pub struct MetamorphicOutputRelationValidator {
    pub slot: usize,
}

impl Validator for MetamorphicOutputRelationValidator {
    fn validate(&self, individual: &mut Individual, _ctx: &EvaluationContext<'_>) -> bool {
        individual
            .group()
            .tree(self.slot)
            .is_some_and(is_metamorphic_output_relation)
    }
}

/// Conjunction of validators, evaluated in order
#[derive(Debug, Default)]
pub struct AllValidator {
    validators: Vec<Box<dyn Validator>>,
}

impl AllValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl Validator for AllValidator {
    fn validate(&self, individual: &mut Individual, ctx: &EvaluationContext<'_>) -> bool {
        self.validators.iter().all(|v| v.validate(individual, ctx))
    }

    fn revalidate(&self, individual: &mut Individual, previous: Option<bool>, ctx: &EvaluationContext<'_>) -> bool {
        if previous.is_none() {
            return self.validate(individual, ctx);
        }
        self.validators
            .iter()
            .all(|v| v.revalidate(individual, previous, ctx))
    }
}
