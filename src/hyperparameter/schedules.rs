//! Parameter schedules for deterministic control
//!
//! Schedules provide predetermined parameter values based on generation number.

use std::fmt::Debug;

/// Parameter schedule trait
///
/// Defines how a parameter changes over the course of evolution.
pub trait ParameterSchedule: Send + Sync + Debug {
    /// Get the parameter value at a given generation
    fn value_at(&self, generation: usize, horizon: usize) -> f64;
}

/// Constant parameter (no change)
#[derive(Clone, Debug)]
pub struct ConstantSchedule {
    /// The constant value
    pub value: f64,
}

impl ConstantSchedule {
    /// Create a new constant schedule
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl ParameterSchedule for ConstantSchedule {
    fn value_at(&self, _generation: usize, _horizon: usize) -> f64 {
        self.value
    }
}

/// Linear annealing: p(t) = p_start + (p_end - p_start) * min(1, t / T)
///
/// The value stays at `end` once the horizon has passed.
#[derive(Clone, Debug)]
pub struct LinearAnnealing {
    /// Starting value
    pub start: f64,
    /// Ending value
    pub end: f64,
}

impl LinearAnnealing {
    /// Create a new linear annealing schedule
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

impl ParameterSchedule for LinearAnnealing {
    fn value_at(&self, generation: usize, horizon: usize) -> f64 {
        if horizon == 0 {
            return self.end;
        }
        let t = (generation as f64 / horizon as f64).min(1.0);
        self.start + (self.end - self.start) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_schedule() {
        let schedule = ConstantSchedule::new(50.0);
        assert_eq!(schedule.value_at(0, 200), 50.0);
        assert_eq!(schedule.value_at(10_000, 200), 50.0);
    }

    #[test]
    fn test_linear_annealing() {
        let schedule = LinearAnnealing::new(5.0, 50.0);
        assert_eq!(schedule.value_at(0, 200), 5.0);
        assert!((schedule.value_at(100, 200) - 27.5).abs() < 1e-12);
        assert_eq!(schedule.value_at(200, 200), 50.0);
    }

    #[test]
    fn test_linear_annealing_clamps_after_horizon() {
        let schedule = LinearAnnealing::new(1.0, 0.7);
        assert!((schedule.value_at(400, 200) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_zero_horizon() {
        let schedule = LinearAnnealing::new(0.1, 0.3);
        assert_eq!(schedule.value_at(3, 0), 0.3);
    }
}
