//! Time accumulators

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::ser::{Serialize, SerializeMap, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeKey {
    CrossOver,
    Selection,
    Mutation,
    Minimization,
    Elitism,
    ComputeFitnessFunction,
    LoadState,
    InitialPopulation,
}

impl TimeKey {
    pub const ALL: [TimeKey; 8] = [
        TimeKey::CrossOver,
        TimeKey::Selection,
        TimeKey::Mutation,
        TimeKey::Minimization,
        TimeKey::Elitism,
        TimeKey::ComputeFitnessFunction,
        TimeKey::LoadState,
        TimeKey::InitialPopulation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TimeKey::CrossOver => "crossOver",
            TimeKey::Selection => "selection",
            TimeKey::Mutation => "mutation",
            TimeKey::Minimization => "minimization",
            TimeKey::Elitism => "elitism",
            TimeKey::ComputeFitnessFunction => "computeFitnessFunction",
            TimeKey::LoadState => "loadState",
            TimeKey::InitialPopulation => "initialPopulation",
        }
    }
}

/// Milliseconds spent in each part of the search, summed over workers
#[derive(Debug)]
pub struct Timings {
    millis: [AtomicU64; 8],
}

impl Default for Timings {
    fn default() -> Self {
        Self::new()
    }
}

impl Timings {
    pub fn new() -> Self {
        Self {
            millis: Default::default(),
        }
    }

    pub fn add(&self, key: TimeKey, elapsed: Duration) {
        self.millis[key as usize].fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    /// Run `f` and charge its duration to `key`
    pub fn measure<T>(&self, key: TimeKey, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.add(key, start.elapsed());
        result
    }

    pub fn get(&self, key: TimeKey) -> u64 {
        self.millis[key as usize].load(Ordering::Relaxed)
    }
}

impl Serialize for Timings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(TimeKey::ALL.len()))?;
        for key in TimeKey::ALL {
            map.serialize_entry(key.name(), &self.get(key))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate() {
        let timings = Timings::new();
        timings.add(TimeKey::Selection, Duration::from_millis(20));
        timings.add(TimeKey::Selection, Duration::from_millis(30));
        assert_eq!(timings.get(TimeKey::Selection), 50);
        assert_eq!(timings.get(TimeKey::Mutation), 0);
    }

    #[test]
    fn test_measure_returns_result() {
        let timings = Timings::new();
        let value = timings.measure(TimeKey::Elitism, || 21 * 2);
        assert_eq!(value, 42);
        let json = serde_json::to_value(&timings).unwrap();
        assert_eq!(json["crossOver"], 0);
        assert_eq!(json.as_object().unwrap().len(), 8);
    }
}
