//! # gassert
//!
//! Evolutionary synthesis of program assertions.
//!
//! Given executions of a program classified as correct or incorrect, the
//! search evolves boolean expressions over the observed variables that hold
//! on the correct executions and fail on the incorrect ones. Metamorphic
//! assertions of the form `IR => OR` relate pairs of executions of the same
//! system.
//!
//! ## Core Concepts
//!
//! - **Two phases**: one population favours few false positives, the other
//!   few false negatives; they share caches and exchange their elites
//! - **Typed trees**: assertions are generated, recombined and mutated as
//!   well-typed expression trees
//! - **Growing corpus**: a states updater may report new correct executions
//!   during the search, after which every assertion is re-evaluated
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gassert::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let args = DataManagerArgs::parse("states;classifications.json")?;
//! let data = RegularDataManager::new(args, &mut rng)?;
//!
//! let result = EvolutionaryAlgorithm::builder(Box::new(data))
//!     .config(Config::load("gassert.toml".as_ref())?)
//!     .initial_assertions(["x > 0"])
//!     .build()?
//!     .run(&mut rng)?;
//! println!("{}", result.output.assertion());
//! ```

pub mod algorithms;
pub mod behaviour;
pub mod cache;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod fitness;
pub mod genome;
pub mod hyperparameter;
pub mod operators;
pub mod population;
pub mod state;
pub mod termination;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::behaviour::prelude::*;
    pub use crate::cache::prelude::*;
    pub use crate::config::*;
    pub use crate::data::prelude::*;
    pub use crate::diagnostics::prelude::*;
    pub use crate::error::*;
    pub use crate::fitness::prelude::*;
    pub use crate::genome::prelude::*;
    pub use crate::hyperparameter::prelude::*;
    pub use crate::operators::prelude::*;
    pub use crate::population::prelude::*;
    pub use crate::state::prelude::*;
    pub use crate::termination::prelude::*;
}
