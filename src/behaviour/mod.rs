//! Search behaviours
//!
//! A behaviour bundles what differs between kinds of assertions: the
//! template, the validators, the objectives and the operator mix. Regular
//! assertions and metamorphic relations are the two presets.

pub mod manager;

pub use manager::BehaviourManager;

pub mod prelude {
    pub use super::manager::*;
}
