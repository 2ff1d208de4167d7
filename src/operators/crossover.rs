//! Crossover operators
//!
//! Tree crossovers recombine copies of two trees of the same slot. Group
//! crossovers pick which slots take part.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{OperatorError, OperatorResult};
use crate::genome::builder::GeneratedTreeBuilder;
use crate::genome::functions;
use crate::genome::group::TreeGroup;
use crate::genome::tree::Tree;
use crate::operators::traits::{GroupCrossover, TreeCrossover};
use crate::state::ValueType;

/// Attempts made by the tree crossovers before giving up
pub const MAX_CROSSOVER_TRIES: usize = 10;

/// Swap of two random subtrees of the same type
///
/// Roots are never swapped. Parents are returned unchanged when no
/// compatible pair is found.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTreeCrossover;

impl TreeCrossover for RandomTreeCrossover {
    fn crossover<R: Rng>(
        &self,
        mother: &Tree,
        father: &Tree,
        _builder: &GeneratedTreeBuilder,
        rng: &mut R,
    ) -> OperatorResult<(Tree, Tree)> {
        let mut son = mother.clone();
        let mut daughter = father.clone();
        let mother_positions = mother.positions();
        let father_positions = father.positions();

        for _ in 1..MAX_CROSSOVER_TRIES {
            let (Some(m_path), Some(f_path)) = (
                mother_positions.choose(rng),
                father_positions.choose(rng),
            ) else {
                break;
            };
            if m_path.is_empty() || f_path.is_empty() {
                continue;
            }
            let (Some(m_sub), Some(f_sub)) = (mother.get_subtree(m_path), father.get_subtree(f_path)) else {
                continue;
            };
            if m_sub.ty == f_sub.ty {
                son.replace_subtree(m_path, f_sub.clone());
                daughter.replace_subtree(f_path, m_sub.clone());
                break;
            }
        }
        OperatorResult::Success((son, daughter))
    }
}

/// Merge of two subtrees under a new operator
///
/// Two internal nodes of the tree's type are joined: booleans give
/// `(m && f)` and `(m || f)`, numbers two distinct arithmetic operators.
/// With probability `prob_merge_crossover_as_it_is` the whole parents are
/// merged, provided the result stays below the node limit. Sequence trees
/// are returned unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct MergingTreeCrossover;

impl TreeCrossover for MergingTreeCrossover {
    fn crossover<R: Rng>(
        &self,
        mother: &Tree,
        father: &Tree,
        builder: &GeneratedTreeBuilder,
        rng: &mut R,
    ) -> OperatorResult<(Tree, Tree)> {
        let ty = mother.ty;
        let unchanged = OperatorResult::Success((mother.clone(), father.clone()));
        if ty == ValueType::Sequence || father.ty != ty {
            return unchanged;
        }

        let total = mother.number_of_nodes() + father.number_of_nodes();
        let mother_positions = mother.positions_of_type(ty);
        let father_positions = father.positions_of_type(ty);

        for _ in 1..MAX_CROSSOVER_TRIES {
            let (m_sub, f_sub) = if total < builder.max_nodes()
                && rng.gen::<f64>() < builder.config().prob_merge_crossover_as_it_is
            {
                (mother, father)
            } else {
                let picked = mother_positions
                    .choose(rng)
                    .and_then(|p| mother.get_subtree(p))
                    .zip(father_positions.choose(rng).and_then(|p| father.get_subtree(p)));
                match picked {
                    Some(pair) => pair,
                    None => break,
                }
            };
            if m_sub.is_leaf() || f_sub.is_leaf() {
                continue;
            }

            let (op1, op2) = match ty {
                ValueType::Boolean => ("&&", "||"),
                _ => {
                    let ops: Vec<&'static str> = functions::MATH_RETURNS_MATH
                        .choose_multiple(rng, 2)
                        .copied()
                        .collect();
                    match ops.as_slice() {
                        [a, b] => (*a, *b),
                        _ => break,
                    }
                }
            };
            return OperatorResult::Success((
                Tree::binary(op1, m_sub.clone(), f_sub.clone(), ty),
                Tree::binary(op2, m_sub.clone(), f_sub.clone(), ty),
            ));
        }
        unchanged
    }
}

/// Tree crossovers available to a builder
#[derive(Clone, Copy, Debug)]
pub enum TreeCrossoverKind {
    Random(RandomTreeCrossover),
    Merging(MergingTreeCrossover),
}

impl TreeCrossover for TreeCrossoverKind {
    fn crossover<R: Rng>(
        &self,
        mother: &Tree,
        father: &Tree,
        builder: &GeneratedTreeBuilder,
        rng: &mut R,
    ) -> OperatorResult<(Tree, Tree)> {
        match self {
            Self::Random(c) => c.crossover(mother, father, builder, rng),
            Self::Merging(c) => c.crossover(mother, father, builder, rng),
        }
    }
}

fn random_slot<R: Rng>(group: &TreeGroup, rng: &mut R) -> Result<usize, OperatorError> {
    group
        .slots()
        .choose(rng)
        .copied()
        .ok_or_else(|| OperatorError::CrossoverFailed("template without slots".to_string()))
}

/// Crossover of the trees bound to one random slot
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleTreeCrossover;

impl GroupCrossover for SingleTreeCrossover {
    fn crossover<R: Rng>(
        &self,
        mother: &TreeGroup,
        father: &TreeGroup,
        rng: &mut R,
    ) -> OperatorResult<(TreeGroup, TreeGroup)> {
        let slot = match random_slot(mother, rng) {
            Ok(slot) => slot,
            Err(e) => return OperatorResult::Failed(e),
        };
        let (Some(m_tree), Some(f_tree), Some(builder)) =
            (mother.tree(slot), father.tree(slot), mother.builder(slot))
        else {
            return OperatorResult::Failed(OperatorError::CrossoverFailed(format!(
                "slot {} is not bound",
                slot
            )));
        };
        builder
            .crossover(m_tree, f_tree, rng)
            .map(|(son, daughter)| (mother.with_tree(slot, son), father.with_tree(slot, daughter)))
    }
}

/// Exchange of the whole trees bound to one random slot
///
/// Needs a template with at least two slots.
#[derive(Clone, Copy, Debug, Default)]
pub struct SwappingTreeCrossover;

impl GroupCrossover for SwappingTreeCrossover {
    fn crossover<R: Rng>(
        &self,
        mother: &TreeGroup,
        father: &TreeGroup,
        rng: &mut R,
    ) -> OperatorResult<(TreeGroup, TreeGroup)> {
        if mother.slots().len() < 2 {
            return OperatorResult::Failed(OperatorError::CrossoverFailed(
                "swapping needs two slots".to_string(),
            ));
        }
        let slot = match random_slot(mother, rng) {
            Ok(slot) => slot,
            Err(e) => return OperatorResult::Failed(e),
        };
        match (mother.tree(slot), father.tree(slot)) {
            (Some(m_tree), Some(f_tree)) => OperatorResult::Success((
                mother.with_tree(slot, f_tree.clone()),
                father.with_tree(slot, m_tree.clone()),
            )),
            _ => OperatorResult::Failed(OperatorError::CrossoverFailed(format!(
                "slot {} is not bound",
                slot
            ))),
        }
    }
}

/// Group crossovers used by a behaviour
#[derive(Clone, Copy, Debug)]
pub enum GroupCrossoverKind {
    Single(SingleTreeCrossover),
    Swapping(SwappingTreeCrossover),
}

impl GroupCrossover for GroupCrossoverKind {
    fn crossover<R: Rng>(
        &self,
        mother: &TreeGroup,
        father: &TreeGroup,
        rng: &mut R,
    ) -> OperatorResult<(TreeGroup, TreeGroup)> {
        match self {
            Self::Single(c) => c.crossover(mother, father, rng),
            Self::Swapping(c) => c.crossover(mother, father, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::genome::factory::TreeFactory;
    use crate::genome::parser::TreeReader;
    use crate::genome::template::TreeTemplate;
    use crate::state::{Variables, VariablesManager};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn vars() -> VariablesManager {
        VariablesManager::from_variables(
            &Variables::new()
                .with_input("x", 1.0)
                .with_input("y", 2.0)
                .with_input("b", true),
        )
    }

    fn builder(config: Config) -> GeneratedTreeBuilder {
        let factory = TreeFactory::new(vars(), Arc::new(config));
        GeneratedTreeBuilder::new(factory, ValueType::Boolean, 6, 32)
    }

    fn read(text: &str) -> Tree {
        TreeReader::new(&vars()).read(text).unwrap()
    }

    #[test]
    fn test_random_crossover_swaps_same_type() {
        let mut rng = StdRng::seed_from_u64(10);
        let builder = builder(Config::default());
        let mother = read("(x > 1) && b");
        let father = read("(y + 2) < (x * 3)");
        let total = mother.number_of_nodes() + father.number_of_nodes();
        for _ in 0..100 {
            let (son, daughter) = RandomTreeCrossover
                .crossover(&mother, &father, &builder, &mut rng)
                .genome()
                .unwrap();
            assert!(son.is_well_typed(), "{}", son);
            assert!(daughter.is_well_typed(), "{}", daughter);
            assert_eq!(son.number_of_nodes() + daughter.number_of_nodes(), total);
        }
    }

    #[test]
    fn test_merging_crossover_whole_trees() {
        let mut rng = StdRng::seed_from_u64(11);
        let config = Config {
            prob_merge_crossover_as_it_is: 1.0,
            ..Config::default()
        };
        let builder = builder(config);
        let mother = read("x > 1");
        let father = read("y < 2");
        let (son, daughter) = MergingTreeCrossover
            .crossover(&mother, &father, &builder, &mut rng)
            .genome()
            .unwrap();
        assert_eq!(son.to_string(), "((x > 1) && (y < 2))");
        assert_eq!(daughter.to_string(), "((x > 1) || (y < 2))");
    }

    #[test]
    fn test_merging_crossover_leaves_unchanged() {
        let mut rng = StdRng::seed_from_u64(12);
        let builder = builder(Config::default());
        let mother = read("b");
        let father = read("true");
        let (son, daughter) = MergingTreeCrossover
            .crossover(&mother, &father, &builder, &mut rng)
            .genome()
            .unwrap();
        assert_eq!(son, mother);
        assert_eq!(daughter, father);
    }

    #[test]
    fn test_group_crossovers() {
        let mut rng = StdRng::seed_from_u64(13);
        let config = Arc::new(Config::default());
        let ir = Arc::new(GeneratedTreeBuilder::new(
            TreeFactory::new(vars(), config.clone()),
            ValueType::Boolean,
            5,
            16,
        ));
        let or = Arc::new(GeneratedTreeBuilder::new(
            TreeFactory::new(vars(), config),
            ValueType::Boolean,
            5,
            16,
        ));
        let template = Arc::new(TreeTemplate::metamorphic(ir, or));
        let mother = template.match_tree(&read("(x > 1) => b")).unwrap();
        let father = template.match_tree(&read("(y < 2) => (x == y)")).unwrap();

        let (son, daughter) = SwappingTreeCrossover
            .crossover(&mother, &father, &mut rng)
            .genome()
            .unwrap();
        let swapped = [son.to_string(), daughter.to_string()];
        assert!(
            swapped == ["((y < 2) => b)", "((x > 1) => (x == y))"]
                || swapped == ["((x > 1) => (x == y))", "((y < 2) => b)"]
        );

        for _ in 0..20 {
            let (son, daughter) = SingleTreeCrossover
                .crossover(&mother, &father, &mut rng)
                .genome()
                .unwrap();
            assert!(son.build_tree().unwrap().is_well_typed());
            assert!(daughter.build_tree().unwrap().is_well_typed());
        }
    }

    #[test]
    fn test_swapping_needs_two_slots() {
        let mut rng = StdRng::seed_from_u64(14);
        let template = Arc::new(TreeTemplate::regular(Arc::new(builder(Config::default()))));
        let group = template.match_tree(&read("x > y")).unwrap();
        assert!(!SwappingTreeCrossover.crossover(&group, &group, &mut rng).is_ok());
    }
}
