//! Corpus loading
//!
//! This module provides the JSON loader of state records and oracle
//! classifications, the regular and metamorphic data managers, and the
//! registries that resolve managers and states updaters by name.

pub mod loader;
pub mod manager;
pub mod registry;

pub use loader::{Classification, Classifications};
pub use manager::{DataManager, DataManagerArgs, MetamorphicDataManager, RegularDataManager};
pub use registry::{DataManagerRegistry, StatesUpdaterRegistry};

pub mod prelude {
    pub use super::loader::*;
    pub use super::manager::*;
    pub use super::registry::*;
}
