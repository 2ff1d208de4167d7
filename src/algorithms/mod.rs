//! Search algorithms
//!
//! This module provides the two-phase evolutionary algorithm, the shared
//! run context, assertion minimization and the alternating variable method
//! used to tune numeric literals.

pub mod avm;
pub mod context;
pub mod evolution;
pub mod minimization;

pub use context::RunContext;
pub use evolution::{EvolutionResult, EvolutionaryAlgorithm, EvolutionaryAlgorithmBuilder};

pub mod prelude {
    pub use super::avm::*;
    pub use super::context::*;
    pub use super::evolution::*;
    pub use super::minimization::*;
}
