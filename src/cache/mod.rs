//! Assertion caches
//!
//! This module provides the [`AssertionManager`], shared by both phases of
//! the search: a text cache of computed individuals and, per phase, the
//! individuals grouped by the executions they classify correctly.

pub mod manager;

pub use manager::AssertionManager;

pub mod prelude {
    pub use super::manager::*;
}
