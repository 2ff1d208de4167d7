//! Hyperparameter control
//!
//! Deterministic schedules driving the parameters that change with the
//! generation number: the literal probability of the tree factory, the
//! elite-valid reward and the weight of the constant-value mutation.

pub mod schedules;

pub mod prelude {
    pub use super::schedules::*;
}
