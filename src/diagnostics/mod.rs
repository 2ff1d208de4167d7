//! Diagnostics and statistics
//!
//! This module provides the counters, time accumulators and per-generation
//! history of a run, and the writers of the files a run produces.

pub mod generations;
pub mod output;
pub mod stats;
pub mod timing;

pub use generations::{GenerationRecord, Generations};
pub use output::{BestIndividualsWriter, OutputPaths};
pub use stats::{StatKey, Stats};
pub use timing::{TimeKey, Timings};

pub mod prelude {
    pub use super::generations::*;
    pub use super::output::*;
    pub use super::stats::*;
    pub use super::timing::*;
}
