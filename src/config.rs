//! Run configuration
//!
//! Every tunable of the search lives in [`Config`]. Defaults reproduce the
//! reference parameter set; a TOML file may override any subset of fields.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hyperparameter::schedules::{LinearAnnealing, ParameterSchedule};

/// Variant of the search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Tournament and best-match selection, elitism and migration
    #[default]
    Gassert,
    /// Tournament selection only
    NaiveSearchBased,
    /// Random selection without elitism or migration
    Random,
}

impl std::str::FromStr for Tool {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "gassert" => Ok(Tool::Gassert),
            "naive_search_based" | "naivesearchbased" => Ok(Tool::NaiveSearchBased),
            "random" => Ok(Tool::Random),
            other => Err(ConfigError::Invalid {
                field: "tool",
                message: format!("unknown tool '{}'", other),
            }),
        }
    }
}

/// Configuration for a GAssert run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search variant
    pub tool: Tool,
    /// Random seed
    pub seed: u64,
    /// Wall-clock budget of the search
    pub time_budget_minutes: u64,
    /// Worker threads for fitness evaluation (None = processors minus two)
    pub worker_threads: Option<usize>,

    // Literal generation
    /// Bound on the magnitude of generated literals
    pub max_number: f64,
    /// Probability of drawing a well-known constant
    pub prob_magic_constant: f64,
    /// Probability of rounding a literal to an integer
    pub prob_integer_constant: f64,
    /// Probability of a large (scaled) literal
    pub prob_large_constant: f64,
    /// Probability of a negative literal
    pub prob_negative: f64,
    /// Probability of a unary operator at an internal node
    pub prob_unary: f64,

    // Operator families
    /// Probability that a boolean node compares numbers
    pub prob_bool_with_math: f64,
    /// Probability that a boolean node compares sequences
    pub prob_bool_with_sequence: f64,
    /// Probability that a numeric node reads a sequence
    pub prob_math_with_sequence: f64,
    /// Probability that a sequence node takes a numeric argument
    pub prob_sequence_with_math: f64,

    // Schedules
    /// Probability of a literal leaf at generation 0
    pub prob_constant_min: f64,
    /// Probability of a literal leaf at the estimated last generation
    pub prob_constant_max: f64,
    /// Reward applied to elite-valid individuals at generation 0
    pub elite_valid_reward_min: f64,
    /// Reward applied to elite-valid individuals at the estimated last generation
    pub elite_valid_reward_max: f64,
    /// Apply the elite-valid reward when ranking
    pub elite_valid_rewarded: bool,
    /// Weight of the constant-value mutation at generation 0
    pub constant_value_mutation_weight_min: f64,
    /// Weight of the constant-value mutation at the estimated last generation
    pub constant_value_mutation_weight_max: f64,
    /// Magnitude of a constant-value perturbation
    pub constant_value_mutation_delta: f64,
    /// Horizon of every schedule
    pub estimated_last_generation: usize,

    // Tree limits
    pub max_depth_tree: usize,
    pub max_complexity: usize,
    pub max_depth_ir_tree: usize,
    pub max_depth_or_tree: usize,
    pub max_ir_complexity: usize,
    pub max_or_complexity: usize,
    /// Minimum share of correct executions satisfying an input relation
    pub ir_satisfaction_min: f64,
    /// Maximum share of correct executions satisfying an input relation
    pub ir_satisfaction_max: f64,

    // Population
    pub population_size: usize,
    /// Share of the population carried over by elitism
    pub elitism_ratio: f64,
    /// Share of the population exchanged by migration
    pub migration_ratio: f64,
    /// Keep one elite per misclassification signature
    pub elite_unique_signatures: bool,
    /// Cache assertions by text
    pub cache_enabled: bool,
    pub max_size_cache: usize,
    pub max_size_best_matching_list: usize,
    /// Distinct individuals reported by `best_individuals`
    pub count_best_individuals: usize,
    /// Individuals per generation written to the best-individuals file
    pub best_individuals_file_count: usize,

    // Generations
    pub max_generation: usize,
    pub min_generation: usize,

    // Operators
    pub prob_crossover: f64,
    pub prob_mutation: f64,
    pub prob_subtree_leaf_mutation: f64,
    pub proportion_mutated_init: f64,
    /// Complexity threshold of the tournament penalty
    pub complexity_theta: i32,
    pub complexity_penalized: bool,
    pub generation_elitism: usize,
    pub minimization_enabled: bool,
    pub generation_minimization: usize,
    pub generation_migration: usize,
    pub prob_best_selection_same_type: f64,
    pub prob_merge_crossover_as_it_is: f64,

    // Evaluation
    /// Tolerance of numeric equality
    pub eval_precision: f64,

    // Constant search
    pub constant_search_generation: usize,
    pub constant_search_plateau: usize,
    pub constant_search_step: f64,
    pub constant_search_individuals: usize,

    // States update and reporting
    /// No states update once less than this remains of the budget
    pub states_update_min_remaining_minutes: u64,
    /// Generations between progress reports
    pub info_interval: usize,
    /// Maximum states sampled per minute of budget
    pub dataset_states_per_minute: usize,
    pub dataset_correct_states_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: Tool::Gassert,
            seed: 0,
            time_budget_minutes: 10,
            worker_threads: None,

            max_number: 100.0,
            prob_magic_constant: 0.1,
            prob_integer_constant: 0.5,
            prob_large_constant: 0.5,
            prob_negative: 0.5,
            prob_unary: 0.3,

            prob_bool_with_math: 0.3,
            prob_bool_with_sequence: 0.3,
            prob_math_with_sequence: 0.3,
            prob_sequence_with_math: 0.3,

            prob_constant_min: 0.1,
            prob_constant_max: 0.3,
            elite_valid_reward_min: 1.0,
            elite_valid_reward_max: 0.7,
            elite_valid_rewarded: true,
            constant_value_mutation_weight_min: 5.0,
            constant_value_mutation_weight_max: 50.0,
            constant_value_mutation_delta: 0.1,
            estimated_last_generation: 200,

            max_depth_tree: 6,
            max_complexity: 32,
            max_depth_ir_tree: 5,
            max_depth_or_tree: 5,
            max_ir_complexity: 16,
            max_or_complexity: 16,
            ir_satisfaction_min: 0.05,
            ir_satisfaction_max: 0.5,

            population_size: 1000,
            elitism_ratio: 0.02,
            migration_ratio: 0.16,
            elite_unique_signatures: true,
            cache_enabled: false,
            max_size_cache: 100_000,
            max_size_best_matching_list: 10,
            count_best_individuals: 10,
            best_individuals_file_count: 4,

            max_generation: 10_000,
            min_generation: 100,

            prob_crossover: 0.9,
            prob_mutation: 0.3,
            prob_subtree_leaf_mutation: 0.7,
            proportion_mutated_init: 0.5,
            complexity_theta: 5,
            complexity_penalized: false,
            generation_elitism: 1,
            minimization_enabled: false,
            generation_minimization: 100,
            generation_migration: 10,
            prob_best_selection_same_type: 0.7,
            prob_merge_crossover_as_it_is: 0.7,

            eval_precision: 1e-4,

            constant_search_generation: 10,
            constant_search_plateau: 16,
            constant_search_step: 0.01,
            constant_search_individuals: 5,

            states_update_min_remaining_minutes: 8,
            info_interval: 10,
            dataset_states_per_minute: 300,
            dataset_correct_states_ratio: 0.1,
        }
    }
}

impl Config {
    /// Load a configuration from a TOML file; absent fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that probabilities and bounds are consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("prob_magic_constant", self.prob_magic_constant),
            ("prob_integer_constant", self.prob_integer_constant),
            ("prob_large_constant", self.prob_large_constant),
            ("prob_negative", self.prob_negative),
            ("prob_unary", self.prob_unary),
            ("prob_bool_with_math", self.prob_bool_with_math),
            ("prob_bool_with_sequence", self.prob_bool_with_sequence),
            ("prob_math_with_sequence", self.prob_math_with_sequence),
            ("prob_sequence_with_math", self.prob_sequence_with_math),
            ("prob_constant_min", self.prob_constant_min),
            ("prob_constant_max", self.prob_constant_max),
            ("elitism_ratio", self.elitism_ratio),
            ("migration_ratio", self.migration_ratio),
            ("prob_crossover", self.prob_crossover),
            ("prob_mutation", self.prob_mutation),
            ("prob_subtree_leaf_mutation", self.prob_subtree_leaf_mutation),
            ("proportion_mutated_init", self.proportion_mutated_init),
            ("prob_best_selection_same_type", self.prob_best_selection_same_type),
            ("prob_merge_crossover_as_it_is", self.prob_merge_crossover_as_it_is),
            ("dataset_correct_states_ratio", self.dataset_correct_states_ratio),
        ];
        for (field, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("{} is not a probability", p),
                });
            }
        }
        if self.population_size == 0 {
            return Err(ConfigError::Invalid {
                field: "population_size",
                message: "must be positive".to_string(),
            });
        }
        if self.max_depth_tree == 0 || self.max_complexity == 0 {
            return Err(ConfigError::Invalid {
                field: "max_depth_tree",
                message: "tree limits must be positive".to_string(),
            });
        }
        if self.ir_satisfaction_min > self.ir_satisfaction_max {
            return Err(ConfigError::Invalid {
                field: "ir_satisfaction_min",
                message: "must not exceed ir_satisfaction_max".to_string(),
            });
        }
        if self.min_generation > self.max_generation {
            return Err(ConfigError::Invalid {
                field: "min_generation",
                message: "must not exceed max_generation".to_string(),
            });
        }
        if self.max_number <= 0.0 || self.eval_precision <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "max_number",
                message: "max_number and eval_precision must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Individuals carried over by elitism
    pub fn size_for_elitism(&self) -> usize {
        scaled_size(self.population_size, self.elitism_ratio)
    }

    /// Individuals exchanged by migration
    pub fn size_for_migration(&self) -> usize {
        scaled_size(self.population_size, self.migration_ratio)
    }

    /// Worker threads for the evaluation pool
    pub fn worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(2))
                .unwrap_or(1)
                .max(1)
        })
    }

    /// Time budget in milliseconds
    pub fn time_budget_millis(&self) -> u64 {
        self.time_budget_minutes * 60 * 1000
    }

    /// Probability that a generated leaf is a literal
    pub fn prob_constant(&self, generation: usize) -> f64 {
        LinearAnnealing::new(self.prob_constant_min, self.prob_constant_max)
            .value_at(generation, self.estimated_last_generation)
    }

    /// Fitness multiplier applied to elite-valid individuals
    pub fn elite_valid_reward(&self, generation: usize) -> f64 {
        LinearAnnealing::new(self.elite_valid_reward_min, self.elite_valid_reward_max)
            .value_at(generation, self.estimated_last_generation)
    }

    /// Selection weight of the constant-value mutation
    pub fn constant_value_mutation_weight(&self, generation: usize) -> f64 {
        LinearAnnealing::new(
            self.constant_value_mutation_weight_min,
            self.constant_value_mutation_weight_max,
        )
        .value_at(generation, self.estimated_last_generation)
    }

    /// Minutes granted to the states updater at this generation, if any
    pub fn states_update_budget(&self, generation: usize, remaining_millis: u64) -> Option<u64> {
        if remaining_millis <= self.states_update_min_remaining_minutes * 60 * 1000 {
            return None;
        }
        match generation {
            30 => Some(3),
            60 => Some(4),
            g if g % 100 == 0 => Some(6),
            _ => None,
        }
    }

    /// Maximum number of states sampled for a time budget
    pub fn dataset_max_states(&self, minutes: u64) -> usize {
        self.dataset_states_per_minute * minutes as usize
    }

    /// Correct states sampled for a time budget
    pub fn dataset_correct_states(&self, minutes: u64) -> usize {
        (self.dataset_max_states(minutes) as f64 * self.dataset_correct_states_ratio) as usize
    }

    /// Incorrect states sampled for a time budget
    pub fn dataset_incorrect_states(&self, minutes: u64) -> usize {
        self.dataset_max_states(minutes) - self.dataset_correct_states(minutes)
    }
}

/// `round(population × ratio)`, at least one individual for a positive ratio
fn scaled_size(population: usize, ratio: f64) -> usize {
    let size = (population as f64 * ratio).round() as usize;
    if ratio > 0.0 && population > 0 {
        size.max(1)
    } else {
        size
    }
}
