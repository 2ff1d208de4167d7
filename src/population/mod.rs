//! Population management
//!
//! This module provides individuals, populations, the comparison criteria,
//! elitism and migration between the two search phases.

pub mod criteria;
pub mod elitism;
pub mod individual;
pub mod migration;
#[allow(clippy::module_inception)]
pub mod population;

pub mod prelude {
    pub use super::criteria::*;
    pub use super::elitism::*;
    pub use super::individual::*;
    pub use super::migration::*;
    pub use super::population::*;
}
