//! Mutation operators
//!
//! Tree mutations replace a subtree, a single node or a literal of a copy
//! of the tree. [`SingleTreeMutation`] lifts them to assertions by mutating
//! one slot of the group.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::error::{OperatorError, OperatorResult};
use crate::genome::builder::GeneratedTreeBuilder;
use crate::genome::functions;
use crate::genome::group::TreeGroup;
use crate::genome::tree::{Node, Tree};
use crate::operators::traits::{GroupMutation, TreeMutation};
use crate::state::ValueType;

fn failed<G>(message: impl Into<String>) -> OperatorResult<G> {
    OperatorResult::Failed(OperatorError::MutationFailed(message.into()))
}

/// Subtree replacement
///
/// A random node is replaced by a freshly generated tree of the same type:
/// a leaf with probability `prob_subtree_leaf_mutation`, else a tree of
/// depth 2 to 4. Picking the root regenerates the whole tree. Depth and
/// node limits of the builder bound the replacement.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubTreeMutation;

impl TreeMutation for SubTreeMutation {
    fn mutate<R: Rng>(&self, tree: &Tree, builder: &GeneratedTreeBuilder, rng: &mut R) -> OperatorResult<Tree> {
        let positions = tree.positions();
        let Some(path) = positions.choose(rng) else {
            return failed("empty tree");
        };
        if path.is_empty() {
            return match builder.build_random_tree(rng) {
                Ok(t) => OperatorResult::Success(t),
                Err(e) => failed(e.to_string()),
            };
        }
        let Some(target) = tree.get_subtree(path) else {
            return failed("invalid position");
        };

        let depth = if rng.gen::<f64>() < builder.config().prob_subtree_leaf_mutation {
            1
        } else {
            rng.gen_range(2..=4)
        };
        let remaining_depth = builder.max_depth().saturating_sub(path.len()).max(1);
        let outside = tree.number_of_nodes() - target.number_of_nodes();
        let budget = builder.max_nodes().saturating_sub(outside).max(1);

        match builder.factory().build_tree(
            target.ty,
            depth.min(remaining_depth),
            budget,
            builder.prob_constant(),
            rng,
        ) {
            Ok(subtree) => {
                let mut mutant = tree.clone();
                mutant.replace_subtree(path, subtree);
                OperatorResult::Success(mutant)
            }
            Err(e) => failed(e.to_string()),
        }
    }
}

/// Single node replacement
///
/// A leaf becomes a new leaf of the same type. An operator is swapped for
/// another of its class; operators alone in their class pass the mutation
/// down to a random child.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleNodeMutation;

impl SingleNodeMutation {
    fn mutate_node<R: Rng>(
        node: &mut Tree,
        builder: &GeneratedTreeBuilder,
        rng: &mut R,
    ) -> Result<(), OperatorError> {
        if node.is_leaf() {
            let must_var = rng.gen::<f64>() > builder.prob_constant();
            *node = builder
                .factory()
                .create_leaf(node.ty, must_var, rng)
                .map_err(|e| OperatorError::MutationFailed(e.to_string()))?;
            return Ok(());
        }

        if let Some(op) = node.operator() {
            let args: Vec<ValueType> = node.children().map(|c| c.ty).collect();
            let others: Vec<&'static str> = functions::same_class(op, &args)
                .iter()
                .copied()
                .filter(|other| *other != op)
                .collect();
            if let Some(replacement) = others.choose(rng) {
                node.value = Node::Operator(replacement);
                return Ok(());
            }
        }

        let arity = node.children().count();
        let index = rng.gen_range(0..arity);
        match node.get_subtree_mut(&[index]) {
            Some(child) => Self::mutate_node(child, builder, rng),
            None => Err(OperatorError::MutationFailed("missing child".to_string())),
        }
    }
}

impl TreeMutation for SingleNodeMutation {
    fn mutate<R: Rng>(&self, tree: &Tree, builder: &GeneratedTreeBuilder, rng: &mut R) -> OperatorResult<Tree> {
        let positions = tree.positions();
        let Some(path) = positions.choose(rng) else {
            return failed("empty tree");
        };
        let mut mutant = tree.clone();
        let result = match mutant.get_subtree_mut(path) {
            Some(node) => Self::mutate_node(node, builder, rng),
            None => Err(OperatorError::MutationFailed("invalid position".to_string())),
        };
        match result {
            Ok(()) => OperatorResult::Success(mutant),
            Err(e) => OperatorResult::Failed(e),
        }
    }
}

/// Literal perturbation
///
/// A numeric literal moves by a uniform offset in `[-delta, delta]` (or is
/// redrawn when no delta is set); a boolean literal is negated. A tree
/// without literals gets one: a numeric node `n` becomes `(n + c)` and a
/// boolean node `b` becomes `(b op c)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantValueMutation {
    pub delta: Option<f64>,
}

impl ConstantValueMutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delta(delta: f64) -> Self {
        Self { delta: Some(delta) }
    }

    fn insert_constant<R: Rng>(tree: &Tree, builder: &GeneratedTreeBuilder, rng: &mut R) -> OperatorResult<Tree> {
        let positions: Vec<Vec<usize>> = tree
            .positions()
            .into_iter()
            .filter(|path| {
                tree.get_subtree(path)
                    .map(|t| t.ty != ValueType::Sequence)
                    .unwrap_or(false)
            })
            .collect();
        let Some(path) = positions.choose(rng) else {
            return failed("no position accepts a literal");
        };
        let Some(node) = tree.get_subtree(path) else {
            return failed("invalid position");
        };

        let replacement = match node.ty {
            ValueType::Number => {
                let constant = Tree::number(builder.factory().random_small_number(rng));
                Tree::binary("+", node.clone(), constant, ValueType::Number)
            }
            ValueType::Boolean => {
                let op = functions::BOOLEAN_RETURNS_BOOLEAN
                    .choose(rng)
                    .copied()
                    .unwrap_or("&&");
                match builder.factory().create_leaf(ValueType::Boolean, false, rng) {
                    Ok(constant) => Tree::binary(op, node.clone(), constant, ValueType::Boolean),
                    Err(e) => return failed(e.to_string()),
                }
            }
            ValueType::Sequence => return failed("no SEQUENCE literals"),
        };

        let mut mutant = tree.clone();
        mutant.replace_subtree(path, replacement);
        OperatorResult::Success(mutant)
    }
}

impl TreeMutation for ConstantValueMutation {
    fn mutate<R: Rng>(&self, tree: &Tree, builder: &GeneratedTreeBuilder, rng: &mut R) -> OperatorResult<Tree> {
        let constants = tree.constant_positions();
        let Some(path) = constants.choose(rng) else {
            return Self::insert_constant(tree, builder, rng);
        };

        let mut mutant = tree.clone();
        let Some(node) = mutant.get_subtree_mut(path) else {
            return failed("invalid position");
        };
        let literal = match node.value {
            Node::Number(value) => {
                let new_value = match self.delta {
                    Some(delta) if delta > 0.0 => value + Uniform::new_inclusive(-delta, delta).sample(rng),
                    _ => builder.factory().random_number(rng),
                };
                Tree::number(new_value)
            }
            Node::Boolean(value) => Tree::boolean(!value),
            _ => return failed("not a literal"),
        };
        *node = literal;
        OperatorResult::Success(mutant)
    }
}

/// Tree mutations available to a builder
#[derive(Clone, Copy, Debug)]
pub enum TreeMutationKind {
    SubTree(SubTreeMutation),
    SingleNode(SingleNodeMutation),
    ConstantValue(ConstantValueMutation),
}

impl TreeMutation for TreeMutationKind {
    fn mutate<R: Rng>(&self, tree: &Tree, builder: &GeneratedTreeBuilder, rng: &mut R) -> OperatorResult<Tree> {
        match self {
            Self::SubTree(m) => m.mutate(tree, builder, rng),
            Self::SingleNode(m) => m.mutate(tree, builder, rng),
            Self::ConstantValue(m) => m.mutate(tree, builder, rng),
        }
    }
}

/// Mutates the tree of one random slot with that slot's builder
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleTreeMutation;

impl GroupMutation for SingleTreeMutation {
    fn mutate<R: Rng>(&self, group: &TreeGroup, rng: &mut R) -> OperatorResult<TreeGroup> {
        let slots = group.slots();
        let Some(slot) = slots.choose(rng).copied() else {
            return failed("template without slots");
        };
        let (Some(tree), Some(builder)) = (group.tree(slot), group.builder(slot)) else {
            return failed(format!("slot {} is not bound", slot));
        };
        builder
            .mutate(tree, rng)
            .map(|mutant| group.with_tree(slot, mutant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::genome::factory::TreeFactory;
    use crate::genome::parser::TreeReader;
    use crate::state::{Variables, VariablesManager};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn builder() -> GeneratedTreeBuilder {
        let vars = VariablesManager::from_variables(
            &Variables::new()
                .with_input("x", 1.0)
                .with_input("y", 2.0)
                .with_input("b", true),
        );
        let factory = TreeFactory::new(vars, Arc::new(Config::default()));
        GeneratedTreeBuilder::new(factory, ValueType::Boolean, 6, 32)
    }

    fn read(builder: &GeneratedTreeBuilder, text: &str) -> Tree {
        TreeReader::new(builder.factory().variables()).read(text).unwrap()
    }

    #[test]
    fn test_subtree_mutation_respects_limits() {
        let mut rng = StdRng::seed_from_u64(1);
        let builder = builder();
        let tree = read(&builder, "((x > 0) && (y < 1)) || b");
        for _ in 0..300 {
            let mutant = SubTreeMutation.mutate(&tree, &builder, &mut rng).genome().unwrap();
            assert_eq!(mutant.ty, ValueType::Boolean);
            assert!(mutant.is_well_typed(), "{}", mutant);
            assert!(mutant.depth() <= 6);
            assert!(mutant.number_of_nodes() <= 32);
        }
    }

    #[test]
    fn test_single_node_mutation_changes_one_node() {
        let mut rng = StdRng::seed_from_u64(2);
        let builder = builder();
        let tree = read(&builder, "(x + y) > 3");
        let mut changed = 0;
        for _ in 0..100 {
            let mutant = SingleNodeMutation.mutate(&tree, &builder, &mut rng).genome().unwrap();
            assert!(mutant.is_well_typed(), "{}", mutant);
            assert_eq!(mutant.number_of_nodes(), tree.number_of_nodes());
            if mutant != tree {
                changed += 1;
            }
        }
        assert!(changed > 50);
    }

    #[test]
    fn test_single_node_mutation_recurses_through_not() {
        let mut rng = StdRng::seed_from_u64(3);
        let builder = builder();
        let tree = read(&builder, "NOT(x > y)");
        for _ in 0..50 {
            let mutant = SingleNodeMutation.mutate(&tree, &builder, &mut rng).genome().unwrap();
            assert!(mutant.is_well_typed());
        }
    }

    #[test]
    fn test_constant_value_mutation_perturbs_literal() {
        let mut rng = StdRng::seed_from_u64(4);
        let builder = builder();
        let tree = read(&builder, "x > 3");
        let mutation = ConstantValueMutation::with_delta(0.1);
        for _ in 0..100 {
            let mutant = mutation.mutate(&tree, &builder, &mut rng).genome().unwrap();
            let literal = mutant.get_subtree(&[1]).unwrap();
            match literal.value {
                Node::Number(v) => assert!((v - 3.0).abs() <= 0.1 + 1e-4),
                ref other => panic!("unexpected node {:?}", other),
            }
        }
    }

    #[test]
    fn test_constant_value_mutation_negates_boolean() {
        let mut rng = StdRng::seed_from_u64(5);
        let builder = builder();
        let tree = read(&builder, "b && true");
        let mutant = ConstantValueMutation::new().mutate(&tree, &builder, &mut rng).genome().unwrap();
        assert_eq!(mutant.to_string(), "(b && false)");
    }

    #[test]
    fn test_constant_value_mutation_inserts_literal() {
        let mut rng = StdRng::seed_from_u64(6);
        let builder = builder();
        let tree = read(&builder, "x > y");
        for _ in 0..50 {
            let mutant = ConstantValueMutation::with_delta(0.1)
                .mutate(&tree, &builder, &mut rng)
                .genome()
                .unwrap();
            assert!(mutant.is_well_typed(), "{}", mutant);
            assert_eq!(mutant.constant_positions().len(), 1);
            assert_eq!(mutant.number_of_nodes(), tree.number_of_nodes() + 2);
        }
    }
}
