//! Fitness evaluation
//!
//! This module provides the tree interpreter, the guarded evaluators, the
//! false-positive and false-negative objectives, and the validators.

pub mod bitmap;
pub mod eval;
pub mod evaluator;
pub mod functions;
pub mod validators;

pub mod prelude {
    pub use super::bitmap::*;
    pub use super::eval::*;
    pub use super::evaluator::*;
    pub use super::functions::*;
    pub use super::validators::*;
}
