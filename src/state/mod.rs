//! Program states
//!
//! Typed variable values recorded by test executions, the evaluation
//! schema derived from them, the correct/incorrect corpus and the updaters
//! that grow it during a run.

pub mod manager;
pub mod updater;
pub mod value;
pub mod variables;

pub use manager::{AnyNumber, Corpus, VariableTypes, VariablesManager};
pub use updater::{DirectoryStatesUpdater, NullStatesUpdater, StatesUpdater};
pub use value::{Sequence, Value, ValueType};
pub use variables::{TestExecution, Variables};

pub mod prelude {
    pub use super::manager::*;
    pub use super::updater::*;
    pub use super::value::*;
    pub use super::variables::{TestExecution, Variables};
}
