//! Run counters

use std::io::Write;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Counters reported at the end of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatKey {
    TimestampStart,
    NumberOfTests,
    NumberOfMutants,
    NumberOfMutantTests,
    NumberOfUniqueAssertionEvaluated,
    NumberOfIterations,
    NumberOfGenerations,
    NumberOfBooleanVariables,
    NumberOfNumberVariables,
    NumberCacheMissAssertion,
    NumberCacheHitAssertion,
    NumberMutations,
    MinimizationImprovements,
    Minimizations,
    NumberCrossover,
    GenerationBestSolution,
    /// Unset until a good solution is found
    GenerationGoodSolution,
    /// Unset until a good solution is found
    TimestampGoodSolution,
}

impl StatKey {
    pub const ALL: [StatKey; 18] = [
        StatKey::TimestampStart,
        StatKey::NumberOfTests,
        StatKey::NumberOfMutants,
        StatKey::NumberOfMutantTests,
        StatKey::NumberOfUniqueAssertionEvaluated,
        StatKey::NumberOfIterations,
        StatKey::NumberOfGenerations,
        StatKey::NumberOfBooleanVariables,
        StatKey::NumberOfNumberVariables,
        StatKey::NumberCacheMissAssertion,
        StatKey::NumberCacheHitAssertion,
        StatKey::NumberMutations,
        StatKey::MinimizationImprovements,
        StatKey::Minimizations,
        StatKey::NumberCrossover,
        StatKey::GenerationBestSolution,
        StatKey::GenerationGoodSolution,
        StatKey::TimestampGoodSolution,
    ];

    /// Key in the JSON report
    pub fn name(self) -> &'static str {
        match self {
            StatKey::TimestampStart => "timestampStart",
            StatKey::NumberOfTests => "numberOfTests",
            StatKey::NumberOfMutants => "numberOfMutants",
            StatKey::NumberOfMutantTests => "numberOfMutantTests",
            StatKey::NumberOfUniqueAssertionEvaluated => "numberOfUniqueAssertionEvaluated",
            StatKey::NumberOfIterations => "numberOfIterations",
            StatKey::NumberOfGenerations => "numberOfGenerations",
            StatKey::NumberOfBooleanVariables => "numberOfBooleanVariables",
            StatKey::NumberOfNumberVariables => "numberOfNumberVariables",
            StatKey::NumberCacheMissAssertion => "numberCacheMissAssertion",
            StatKey::NumberCacheHitAssertion => "numberCacheHitAssertion",
            StatKey::NumberMutations => "numberMutations",
            StatKey::MinimizationImprovements => "minimizationImprovments",
            StatKey::Minimizations => "minimizations",
            StatKey::NumberCrossover => "numberCrossover",
            StatKey::GenerationBestSolution => "generationBestSolution",
            StatKey::GenerationGoodSolution => "generationGoodSolution",
            StatKey::TimestampGoodSolution => "timestampGoodSolution",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn starts_unset(self) -> bool {
        matches!(self, StatKey::GenerationGoodSolution | StatKey::TimestampGoodSolution)
    }
}

const UNSET: i64 = i64::MIN;

/// Atomic counters shared by every worker of a run
#[derive(Debug)]
pub struct Stats {
    counters: Vec<AtomicI64>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            counters: StatKey::ALL
                .iter()
                .map(|key| AtomicI64::new(if key.starts_unset() { UNSET } else { 0 }))
                .collect(),
        }
    }

    pub fn increment(&self, key: StatKey) {
        self.add(key, 1);
    }

    pub fn add(&self, key: StatKey, value: i64) {
        let counter = &self.counters[key.index()];
        let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
            Some(if current == UNSET { value } else { current + value })
        });
    }

    pub fn set(&self, key: StatKey, value: i64) {
        self.counters[key.index()].store(value, Ordering::Relaxed);
    }

    /// Set the counter only if it was never set
    pub fn set_if_missing(&self, key: StatKey, value: i64) {
        let _ = self.counters[key.index()].compare_exchange(UNSET, value, Ordering::Relaxed, Ordering::Relaxed);
    }

    pub fn get(&self, key: StatKey) -> Option<i64> {
        match self.counters[key.index()].load(Ordering::Relaxed) {
            UNSET => None,
            value => Some(value),
        }
    }

    /// Write the counters as a JSON object
    pub fn write_json<W: Write>(&self, out: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(out, self)
    }
}

impl Serialize for Stats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(StatKey::ALL.len()))?;
        for key in StatKey::ALL {
            map.serialize_entry(key.name(), &self.get(key))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = Stats::new();
        stats.increment(StatKey::NumberCrossover);
        stats.increment(StatKey::NumberCrossover);
        stats.add(StatKey::Minimizations, 5);
        stats.set(StatKey::NumberOfTests, 12);
        assert_eq!(stats.get(StatKey::NumberCrossover), Some(2));
        assert_eq!(stats.get(StatKey::Minimizations), Some(5));
        assert_eq!(stats.get(StatKey::NumberOfTests), Some(12));
        assert_eq!(stats.get(StatKey::NumberMutations), Some(0));
    }

    #[test]
    fn test_good_solution_keys_start_unset() {
        let stats = Stats::new();
        assert_eq!(stats.get(StatKey::GenerationGoodSolution), None);
        stats.set_if_missing(StatKey::GenerationGoodSolution, 7);
        stats.set_if_missing(StatKey::GenerationGoodSolution, 9);
        assert_eq!(stats.get(StatKey::GenerationGoodSolution), Some(7));
    }

    #[test]
    fn test_json_report() {
        let stats = Stats::new();
        stats.set(StatKey::GenerationBestSolution, 42);
        let mut buffer = Vec::new();
        stats.write_json(&mut buffer).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(json["generationBestSolution"], 42);
        assert_eq!(json["minimizationImprovments"], 0);
        assert!(json["timestampGoodSolution"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 18);
    }
}
