//! Generation and evolution of the trees bound to a template slot
//!
//! A [`GeneratedTreeBuilder`] owns everything needed to create and evolve
//! the trees of one slot: the factory over the slot's variables, the depth
//! and node limits, and the weighted tree operators. It is shared between
//! threads; the current generation is kept in an atomic so that scheduled
//! parameters follow the run.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::config::Config;
use crate::error::{OperatorError, OperatorResult, TreeError};
use crate::genome::factory::TreeFactory;
use crate::genome::tree::Tree;
use crate::hyperparameter::schedules::LinearAnnealing;
use crate::operators::crossover::{MergingTreeCrossover, RandomTreeCrossover, TreeCrossoverKind};
use crate::operators::mutation::{
    ConstantValueMutation, SingleNodeMutation, SubTreeMutation, TreeMutationKind,
};
use crate::operators::traits::{TreeCrossover, TreeMutation};
use crate::operators::weighted::WeightedChoice;
use crate::state::ValueType;

/// Builder of the trees of one generated slot
pub struct GeneratedTreeBuilder {
    factory: TreeFactory,
    ty: ValueType,
    max_depth: usize,
    max_nodes: usize,
    generation: AtomicUsize,
    mutations: WeightedChoice<TreeMutationKind>,
    crossovers: WeightedChoice<TreeCrossoverKind>,
}

impl fmt::Debug for GeneratedTreeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedTreeBuilder")
            .field("ty", &self.ty)
            .field("max_depth", &self.max_depth)
            .field("max_nodes", &self.max_nodes)
            .field("generation", &self.generation())
            .finish()
    }
}

impl GeneratedTreeBuilder {
    /// Builder with the standard operator mix
    ///
    /// Mutations: subtree 50, single node 50, constant value scheduled from
    /// `constant_value_mutation_weight_min` to `_max`. Crossovers: merging 0,
    /// random subtree swap 100.
    pub fn new(factory: TreeFactory, ty: ValueType, max_depth: usize, max_nodes: usize) -> Self {
        let config = factory.config();
        let mutations = WeightedChoice::new()
            .with(50.0, TreeMutationKind::SubTree(SubTreeMutation))
            .with(50.0, TreeMutationKind::SingleNode(SingleNodeMutation))
            .with_schedule(
                Box::new(LinearAnnealing::new(
                    config.constant_value_mutation_weight_min,
                    config.constant_value_mutation_weight_max,
                )),
                TreeMutationKind::ConstantValue(ConstantValueMutation::with_delta(
                    config.constant_value_mutation_delta,
                )),
            );
        let crossovers = WeightedChoice::new()
            .with(0.0, TreeCrossoverKind::Merging(MergingTreeCrossover))
            .with(100.0, TreeCrossoverKind::Random(RandomTreeCrossover));
        Self::with_operators(factory, ty, max_depth, max_nodes, mutations, crossovers)
    }

    /// Builder with a custom operator mix
    pub fn with_operators(
        factory: TreeFactory,
        ty: ValueType,
        max_depth: usize,
        max_nodes: usize,
        mutations: WeightedChoice<TreeMutationKind>,
        crossovers: WeightedChoice<TreeCrossoverKind>,
    ) -> Self {
        Self {
            factory,
            ty,
            max_depth,
            max_nodes,
            generation: AtomicUsize::new(0),
            mutations,
            crossovers,
        }
    }

    pub fn ty(&self) -> ValueType {
        self.ty
    }

    pub fn factory(&self) -> &TreeFactory {
        &self.factory
    }

    pub fn config(&self) -> &Config {
        self.factory.config()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Notify the builder of the current generation
    pub fn update_generation(&self, generation: usize) {
        self.generation.store(generation, Ordering::Relaxed);
    }

    pub fn generation(&self) -> usize {
        self.generation.load(Ordering::Relaxed)
    }

    /// Probability that a right operand may be a literal, at the current generation
    pub fn prob_constant(&self) -> f64 {
        self.config().prob_constant(self.generation())
    }

    /// Random depth below the limit
    pub fn random_depth<R: Rng>(&self, rng: &mut R) -> usize {
        if self.max_depth == 0 {
            0
        } else {
            rng.gen_range(0..self.max_depth)
        }
    }

    /// Build a tree from scratch
    pub fn build_random_tree<R: Rng>(&self, rng: &mut R) -> Result<Tree, TreeError> {
        let depth = self.random_depth(rng);
        self.factory
            .build_tree(self.ty, depth, self.max_nodes, self.prob_constant(), rng)
    }

    /// Accept a concrete tree for this slot
    pub fn match_tree(&self, tree: &Tree) -> Result<Tree, TreeError> {
        if tree.ty == self.ty {
            Ok(tree.clone())
        } else {
            Err(TreeError::TemplateMismatch(format!(
                "expected {} but found {} in {}",
                self.ty, tree.ty, tree
            )))
        }
    }

    /// Mutate a copy of the tree with a weighted choice of operator
    pub fn mutate<R: Rng>(&self, tree: &Tree, rng: &mut R) -> OperatorResult<Tree> {
        let horizon = self.config().estimated_last_generation;
        match self.mutations.choose(self.generation(), horizon, rng) {
            Some(mutation) => mutation.mutate(tree, self, rng),
            None => OperatorResult::Failed(OperatorError::InvalidConfiguration(
                "no tree mutation available".to_string(),
            )),
        }
    }

    /// Recombine copies of two trees with a weighted choice of operator
    pub fn crossover<R: Rng>(&self, mother: &Tree, father: &Tree, rng: &mut R) -> OperatorResult<(Tree, Tree)> {
        let horizon = self.config().estimated_last_generation;
        match self.crossovers.choose(self.generation(), horizon, rng) {
            Some(crossover) => crossover.crossover(mother, father, self, rng),
            None => OperatorResult::Failed(OperatorError::InvalidConfiguration(
                "no tree crossover available".to_string(),
            )),
        }
    }

    /// Strictly smaller candidates: proper subtrees of the tree's own type
    ///
    /// Candidates are yielded smallest first; each is a fresh copy.
    pub fn minimize<'a>(&self, tree: &'a Tree) -> impl Iterator<Item = Tree> + 'a {
        let mut positions: Vec<(usize, Vec<usize>)> = tree
            .positions_of_type(tree.ty)
            .into_iter()
            .filter(|path| !path.is_empty())
            .filter_map(|path| tree.get_subtree(&path).map(|t| (t.number_of_nodes(), path)))
            .collect();
        positions.sort_by_key(|(size, _)| *size);
        positions
            .into_iter()
            .filter_map(move |(_, path)| tree.get_subtree(&path).cloned())
    }
}
