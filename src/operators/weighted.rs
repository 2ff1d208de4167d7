//! Weighted random choice among operators
//!
//! Each entry carries a [`ParameterSchedule`] so that a weight may change
//! with the generation; fixed weights use [`ConstantSchedule`].

use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};

use crate::hyperparameter::schedules::{ConstantSchedule, ParameterSchedule};

/// A set of items drawn with (possibly scheduled) weights
#[derive(Debug)]
pub struct WeightedChoice<T> {
    entries: Vec<(Box<dyn ParameterSchedule>, T)>,
}

impl<T> Default for WeightedChoice<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> WeightedChoice<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item with a fixed weight
    pub fn with(self, weight: f64, item: T) -> Self {
        self.with_schedule(Box::new(ConstantSchedule::new(weight)), item)
    }

    /// Add an item whose weight follows a schedule
    pub fn with_schedule(mut self, schedule: Box<dyn ParameterSchedule>, item: T) -> Self {
        self.entries.push((schedule, item));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weights at a generation
    pub fn weights(&self, generation: usize, horizon: usize) -> Vec<f64> {
        self.entries
            .iter()
            .map(|(schedule, _)| schedule.value_at(generation, horizon).max(0.0))
            .collect()
    }

    /// Items in insertion order
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, item)| item)
    }

    /// Draw an item; None when every weight is zero
    pub fn choose<R: Rng>(&self, generation: usize, horizon: usize, rng: &mut R) -> Option<&T> {
        let dist = WeightedIndex::new(self.weights(generation, horizon)).ok()?;
        self.entries.get(dist.sample(rng)).map(|(_, item)| item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperparameter::schedules::LinearAnnealing;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_weight_never_chosen() {
        let mut rng = StdRng::seed_from_u64(0);
        let choice = WeightedChoice::new().with(0.0, "merge").with(100.0, "random");
        for _ in 0..100 {
            assert_eq!(choice.choose(0, 200, &mut rng), Some(&"random"));
        }
    }

    #[test]
    fn test_all_zero_is_none() {
        let mut rng = StdRng::seed_from_u64(0);
        let choice = WeightedChoice::new().with(0.0, 1);
        assert_eq!(choice.choose(0, 200, &mut rng), None);
        let empty: WeightedChoice<u8> = WeightedChoice::new();
        assert!(empty.is_empty());
        assert_eq!(empty.choose(0, 200, &mut rng), None);
    }

    #[test]
    fn test_scheduled_weights() {
        let choice = WeightedChoice::new()
            .with(50.0, "subtree")
            .with_schedule(Box::new(LinearAnnealing::new(5.0, 50.0)), "constant");
        assert_eq!(choice.weights(0, 200), vec![50.0, 5.0]);
        assert_eq!(choice.weights(400, 200), vec![50.0, 50.0]);
        assert_eq!(choice.len(), 2);
        assert_eq!(choice.items().count(), 2);
    }
}
