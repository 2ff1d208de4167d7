//! Operator traits
//!
//! This module defines the operator traits of the search. Tree operators
//! work on a single slot and receive the slot's builder; group operators
//! work on a whole assertion and dispatch to the builders of its template.

use std::sync::Arc;

use rand::Rng;

use crate::cache::AssertionManager;
use crate::error::OperatorResult;
use crate::genome::builder::GeneratedTreeBuilder;
use crate::genome::group::TreeGroup;
use crate::genome::tree::Tree;
use crate::population::criteria::Phase;
use crate::population::individual::Individual;

/// Mutation of a single tree
pub trait TreeMutation: Send + Sync {
    /// Produce a mutated copy of `tree`
    fn mutate<R: Rng>(&self, tree: &Tree, builder: &GeneratedTreeBuilder, rng: &mut R) -> OperatorResult<Tree>;
}

/// Crossover of two trees of the same slot
pub trait TreeCrossover: Send + Sync {
    /// Produce two offspring from copies of the parents
    fn crossover<R: Rng>(
        &self,
        mother: &Tree,
        father: &Tree,
        builder: &GeneratedTreeBuilder,
        rng: &mut R,
    ) -> OperatorResult<(Tree, Tree)>;
}

/// Mutation of an assertion
pub trait GroupMutation: Send + Sync {
    fn mutate<R: Rng>(&self, group: &TreeGroup, rng: &mut R) -> OperatorResult<TreeGroup>;
}

/// Crossover of two assertions sharing a template
pub trait GroupCrossover: Send + Sync {
    fn crossover<R: Rng>(
        &self,
        mother: &TreeGroup,
        father: &TreeGroup,
        rng: &mut R,
    ) -> OperatorResult<(TreeGroup, TreeGroup)>;
}

/// Parent selection
///
/// Selects two individuals from the population of the current phase. The
/// assertion cache gives access to individuals grouped by the executions
/// they classify correctly.
pub trait ParentSelection: Send + Sync {
    fn select<R: Rng>(
        &self,
        population: &[Arc<Individual>],
        phase: Phase,
        cache: &AssertionManager,
        rng: &mut R,
    ) -> OperatorResult<(Arc<Individual>, Arc<Individual>)>;
}
