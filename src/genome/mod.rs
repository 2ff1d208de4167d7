//! Genome of the search: typed expression trees
//!
//! This module provides the tree data model, the operator vocabulary, the
//! text parser, random generation, and the templates that shape regular
//! assertions and metamorphic relations.

pub mod builder;
pub mod factory;
pub mod functions;
pub mod group;
pub mod parser;
pub mod relation;
pub mod template;
pub mod tree;

pub mod prelude {
    pub use super::builder::*;
    pub use super::factory::*;
    pub use super::group::*;
    pub use super::parser::*;
    pub use super::relation::*;
    pub use super::template::*;
    pub use super::tree::*;
}
