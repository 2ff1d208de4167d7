//! Random generation of typed trees
//!
//! Trees are grown with the ramped "full or grow" scheme: a coin flip
//! decides whether every branch is expanded down to the depth limit or each
//! internal node is expanded with probability one half. A node budget bounds
//! the complexity of the result.

use std::f64::consts::{E, PI, SQRT_2};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::config::Config;
use crate::error::TreeError;
use crate::genome::functions;
use crate::genome::tree::{round_literal, Tree};
use crate::state::{ValueType, VariablesManager};

/// Magic constants; repetitions weight the draw
pub const MAGIC_CONSTANTS: &[f64] = &[
    1.0,
    1.0,
    1.0,
    2.0,
    2.0,
    PI,
    PI,
    PI / 2.0,
    PI * 2.0,
    E,
    SQRT_2,
];

/// Creates trees from scratch over a fixed set of variables
#[derive(Clone, Debug)]
pub struct TreeFactory {
    variables: VariablesManager,
    config: Arc<Config>,
}

impl TreeFactory {
    pub fn new(variables: VariablesManager, config: Arc<Config>) -> Self {
        Self { variables, config }
    }

    pub fn variables(&self) -> &VariablesManager {
        &self.variables
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn has_sequences(&self) -> bool {
        !self.variables.sequence_vars().is_empty()
    }

    /// Build a random tree of the given type
    ///
    /// The result never exceeds `depth` levels (a leaf when `depth <= 1`) nor
    /// `max_nodes` nodes. `prob_constant` is the probability that the right
    /// operand of a binary node may be a literal.
    pub fn build_tree<R: Rng>(
        &self,
        ty: ValueType,
        depth: usize,
        max_nodes: usize,
        prob_constant: f64,
        rng: &mut R,
    ) -> Result<Tree, TreeError> {
        let full = rng.gen_bool(0.5);
        self.create(ty, depth, max_nodes.max(1), true, full, prob_constant, rng)
    }

    #[allow(clippy::too_many_arguments)]
    fn create<R: Rng>(
        &self,
        ty: ValueType,
        depth: usize,
        budget: usize,
        must_var: bool,
        full: bool,
        prob_constant: f64,
        rng: &mut R,
    ) -> Result<Tree, TreeError> {
        if depth > 1 && budget >= 3 && (full || rng.gen_bool(0.5)) {
            self.create_tree(ty, depth, budget, must_var, full, prob_constant, rng)
        } else {
            self.create_leaf(ty, must_var, rng)
        }
    }

    fn pick<R: Rng>(ops: &'static [&'static str], rng: &mut R) -> &'static str {
        // vocabulary lists are never empty
        ops.choose(rng).copied().unwrap_or(ops[0])
    }

    #[allow(clippy::too_many_arguments)]
    fn create_tree<R: Rng>(
        &self,
        ty: ValueType,
        depth: usize,
        budget: usize,
        must_var: bool,
        full: bool,
        prob_constant: f64,
        rng: &mut R,
    ) -> Result<Tree, TreeError> {
        use ValueType::{Boolean, Number, Sequence};
        let config = &self.config;

        let (op, left_ty, right_ty, unary) = match ty {
            Boolean => {
                if rng.gen::<f64>() < config.prob_bool_with_math {
                    (Self::pick(functions::MATH_RETURNS_BOOLEAN, rng), Number, Number, false)
                } else if self.has_sequences() && rng.gen::<f64>() < config.prob_bool_with_sequence {
                    (
                        Self::pick(functions::BINARY_SEQUENCE_RETURNS_BOOLEAN, rng),
                        Sequence,
                        Sequence,
                        false,
                    )
                } else if rng.gen::<f64>() < config.prob_unary {
                    (
                        Self::pick(functions::UNARY_BOOLEAN_RETURNS_BOOLEAN, rng),
                        Boolean,
                        Boolean,
                        true,
                    )
                } else {
                    (Self::pick(functions::BOOLEAN_RETURNS_BOOLEAN, rng), Boolean, Boolean, false)
                }
            }
            Number => {
                if self.has_sequences()
                    && rng.gen::<f64>() < config.prob_math_with_sequence
                    && rng.gen::<f64>() < config.prob_unary
                {
                    (
                        Self::pick(functions::UNARY_SEQUENCE_RETURNS_MATH, rng),
                        Sequence,
                        Sequence,
                        true,
                    )
                } else if rng.gen::<f64>() < config.prob_unary {
                    (Self::pick(functions::UNARY_MATH_RETURNS_MATH, rng), Number, Number, true)
                } else {
                    (Self::pick(functions::MATH_RETURNS_MATH, rng), Number, Number, false)
                }
            }
            Sequence => {
                if rng.gen::<f64>() < config.prob_unary {
                    if rng.gen::<f64>() < config.prob_sequence_with_math {
                        (
                            Self::pick(functions::UNARY_MATH_RETURNS_SEQUENCE, rng),
                            Number,
                            Number,
                            true,
                        )
                    } else {
                        (
                            Self::pick(functions::UNARY_SEQUENCE_RETURNS_SEQUENCE, rng),
                            Sequence,
                            Sequence,
                            true,
                        )
                    }
                } else {
                    (
                        Self::pick(functions::BINARY_SEQUENCE_MATH_RETURNS_SEQUENCE, rng),
                        Sequence,
                        Number,
                        false,
                    )
                }
            }
        };

        if unary {
            let child = self.create(left_ty, depth - 1, budget - 1, must_var, full, prob_constant, rng)?;
            if child.operator() == Some(op) {
                if functions::is_symmetric(op) {
                    // f(f(x)) == x
                    if let Some(inner) = child.left.as_deref() {
                        return Ok(inner.clone());
                    }
                } else if functions::is_reentrant(op) {
                    return Ok(child);
                }
            }
            return Ok(Tree::unary(op, child, ty));
        }

        let left = self.create(left_ty, depth - 1, budget - 2, must_var, full, prob_constant, rng)?;
        let right_budget = budget - 1 - left.number_of_nodes();
        let right_must_var = rng.gen::<f64>() > prob_constant;
        let right = self.create(right_ty, depth - 1, right_budget, right_must_var, full, prob_constant, rng)?;
        Ok(Tree::binary(op, left, right, ty))
    }

    /// Build a leaf: a variable when `must_var` holds and one exists, else a literal
    pub fn create_leaf<R: Rng>(&self, ty: ValueType, must_var: bool, rng: &mut R) -> Result<Tree, TreeError> {
        let vars = self.variables.vars_of(ty);
        match ty {
            ValueType::Number => match vars.choose(rng) {
                Some(name) if must_var => Ok(Tree::variable(name.clone(), ty)),
                _ => Ok(Tree::number(self.random_number(rng))),
            },
            ValueType::Boolean => match vars.choose(rng) {
                Some(name) if must_var => Ok(Tree::variable(name.clone(), ty)),
                _ => Ok(Tree::boolean(rng.gen_bool(0.5))),
            },
            ValueType::Sequence => vars
                .choose(rng)
                .map(|name| Tree::variable(name.clone(), ty))
                .ok_or_else(|| TreeError::UnsupportedType("SEQUENCE literal".to_string())),
        }
    }

    /// A number in `(-1, 1)`, negative with probability `prob_negative`
    pub fn random_small_number<R: Rng>(&self, rng: &mut R) -> f64 {
        let sign = if rng.gen::<f64>() <= self.config.prob_negative {
            -1.0
        } else {
            1.0
        };
        round_literal(sign * Uniform::new(0.0, 1.0).sample(rng))
    }

    /// A small number scaled by `max_number`
    pub fn random_large_number<R: Rng>(&self, rng: &mut R) -> f64 {
        self.random_small_number(rng) * self.config.max_number
    }

    pub fn random_integer_number<R: Rng>(&self, rng: &mut R) -> f64 {
        self.random_large_number(rng).ceil()
    }

    /// A literal value: magic constant, integer, large or small number
    pub fn random_number<R: Rng>(&self, rng: &mut R) -> f64 {
        let config = &self.config;
        let value = if rng.gen::<f64>() <= config.prob_magic_constant {
            MAGIC_CONSTANTS.choose(rng).copied().unwrap_or(1.0)
        } else if rng.gen::<f64>() <= config.prob_integer_constant {
            self.random_integer_number(rng)
        } else if rng.gen::<f64>() <= config.prob_large_constant {
            self.random_large_number(rng)
        } else {
            self.random_small_number(rng)
        };
        round_literal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Sequence, Variables};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn factory(with_sequences: bool) -> TreeFactory {
        let mut vars = Variables::new()
            .with_input("x", 1.0)
            .with_input("y", 2.0)
            .with_input("b", true);
        if with_sequences {
            vars = vars.with_output("o_s", Sequence::numeric(vec![1.0, 2.0]));
        }
        TreeFactory::new(VariablesManager::from_variables(&vars), Arc::new(Config::default()))
    }

    #[test]
    fn test_build_tree_respects_limits() {
        let mut rng = StdRng::seed_from_u64(42);
        let factory = factory(true);
        for _ in 0..500 {
            let depth = rng.gen_range(0..7);
            let tree = factory
                .build_tree(ValueType::Boolean, depth, 16, 0.2, &mut rng)
                .unwrap();
            assert_eq!(tree.ty, ValueType::Boolean);
            assert!(tree.depth() <= depth.max(1));
            assert!(tree.number_of_nodes() <= 16);
            assert!(tree.is_well_typed(), "{}", tree);
        }
    }

    #[test]
    fn test_build_number_and_sequence_trees() {
        let mut rng = StdRng::seed_from_u64(7);
        let factory = factory(true);
        for _ in 0..200 {
            let number = factory.build_tree(ValueType::Number, 4, 32, 0.3, &mut rng).unwrap();
            assert_eq!(number.ty, ValueType::Number);
            assert!(number.is_well_typed());
            let sequence = factory.build_tree(ValueType::Sequence, 4, 32, 0.3, &mut rng).unwrap();
            assert_eq!(sequence.ty, ValueType::Sequence);
            assert!(sequence.is_well_typed());
        }
    }

    #[test]
    fn test_sequence_leaf_requires_variables() {
        let mut rng = StdRng::seed_from_u64(1);
        let factory = factory(false);
        assert!(matches!(
            factory.create_leaf(ValueType::Sequence, true, &mut rng),
            Err(TreeError::UnsupportedType(_))
        ));
        // no sequence operators without sequence variables
        for _ in 0..200 {
            let tree = factory.build_tree(ValueType::Boolean, 5, 32, 0.2, &mut rng).unwrap();
            assert!(tree.positions_of_type(ValueType::Sequence).is_empty());
        }
    }

    #[test]
    fn test_leaves() {
        let mut rng = StdRng::seed_from_u64(3);
        let factory = factory(false);
        let leaf = factory.create_leaf(ValueType::Number, true, &mut rng).unwrap();
        assert!(leaf.has_variables());
        let literal = factory.create_leaf(ValueType::Boolean, false, &mut rng).unwrap();
        assert!(literal.value.is_literal());
    }

    #[test]
    fn test_random_numbers() {
        let mut rng = StdRng::seed_from_u64(11);
        let factory = factory(false);
        for _ in 0..1000 {
            let small = factory.random_small_number(&mut rng);
            assert!(small.abs() <= 1.0);
            let integer = factory.random_integer_number(&mut rng);
            assert_eq!(integer, integer.ceil());
            assert!(integer.abs() <= 100.0);
            let n = factory.random_number(&mut rng);
            assert_eq!(n, round_literal(n));
        }
    }
}
