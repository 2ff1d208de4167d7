//! Error types for gassert
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Error type for tree construction, parsing and template matching
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    /// The assertion text could not be parsed
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// A variable is not part of the evaluation schema
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// Parentheses do not balance
    #[error("Unbalanced parentheses in: {0}")]
    UnbalancedParentheses(String),

    /// A token appeared where it cannot be used
    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    /// Empty input
    #[error("Empty expression")]
    EmptyExpression,

    /// A concrete tree does not fit the shape of a template
    #[error("Tree does not match template: {0}")]
    TemplateMismatch(String),

    /// A template slot has no bound tree
    #[error("Missing mapping for slot {0}")]
    MissingSlot(usize),

    /// No generator is able to produce the requested type
    #[error("Cannot generate a tree of type {0}")]
    UnsupportedType(String),
}

/// Error type for evaluation of a tree against a program state
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// The state does not contain the variable
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// The operator is not part of the vocabulary
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// The operands have the wrong value type
    #[error("Type mismatch for '{operator}': {message}")]
    TypeMismatch { operator: String, message: String },

    /// A boolean result was expected
    #[error("Expression does not evaluate to a boolean: {0}")]
    NotBoolean(String),

    /// An operator node lacks a child
    #[error("Missing operand for '{0}'")]
    MissingOperand(String),
}

/// Error type for operator failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OperatorError {
    /// Crossover operation failed
    #[error("Crossover failed: {0}")]
    CrossoverFailed(String),

    /// Mutation operation failed
    #[error("Mutation failed: {0}")]
    MutationFailed(String),

    /// Selection operation failed
    #[error("Selection failed: {0}")]
    SelectionFailed(String),

    /// Invalid operator configuration
    #[error("Invalid operator configuration: {0}")]
    InvalidConfiguration(String),
}

/// Error type for loading and updating the state corpus
#[derive(Debug, Error)]
pub enum DataError {
    /// IO error while reading or writing corpus files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record is structurally invalid
    #[error("Invalid record {record}: {message}")]
    InvalidRecord { record: String, message: String },

    /// A variable required for a metamorphic pair is absent
    #[error("Missing variable '{0}' in execution")]
    MissingVariable(String),

    /// A variable changes type across executions
    #[error("Variable '{name}' has type {expected} but {actual} was found")]
    TypeConflict {
        name: String,
        expected: String,
        actual: String,
    },

    /// No data manager is registered under the key
    #[error("Unknown data manager: {0}")]
    UnknownManager(String),

    /// No states updater is registered under the key
    #[error("Unknown states updater: {0}")]
    UnknownUpdater(String),

    /// Manager or updater arguments are malformed
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid configuration value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Top-level error type for evolution operations
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Tree error
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// Evaluation error
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Operator error
    #[error("Operator error: {0}")]
    Operator(#[from] OperatorError),

    /// Data error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Empty population
    #[error("Empty population")]
    EmptyPopulation,

    /// A cached individual does not match its key
    #[error("Cached data corrupted: key {key}, assertion {assertion}")]
    CacheCorrupted { key: String, assertion: String },

    /// IO error while writing run outputs
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of run outputs failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for evolution operations
pub type EvoResult<T> = Result<T, EvolutionError>;

/// Result of an operator application
#[derive(Debug, Clone)]
pub enum OperatorResult<G> {
    /// Operation succeeded
    Success(G),
    /// Operation failed, callers fall back to the parents
    Failed(OperatorError),
}

impl<G> OperatorResult<G> {
    /// Returns the genome if successful, None if failed
    pub fn genome(self) -> Option<G> {
        match self {
            Self::Success(g) => Some(g),
            Self::Failed(_) => None,
        }
    }

    /// Returns true if the operation was successful
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Maps the genome type
    pub fn map<U, F: FnOnce(G) -> U>(self, f: F) -> OperatorResult<U> {
        match self {
            Self::Success(g) => OperatorResult::Success(f(g)),
            Self::Failed(e) => OperatorResult::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_error_display() {
        let err = TreeError::UnknownVariable("x".to_string());
        assert_eq!(err.to_string(), "Unknown variable: x");

        let err = TreeError::UnexpectedToken {
            token: ")".to_string(),
            position: 3,
        };
        assert_eq!(err.to_string(), "Unexpected token ')' at position 3");
    }

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::TypeMismatch {
            operator: "&&".to_string(),
            message: "expected booleans".to_string(),
        };
        assert_eq!(err.to_string(), "Type mismatch for '&&': expected booleans");
    }

    #[test]
    fn test_operator_error_display() {
        let err = OperatorError::CrossoverFailed("no compatible nodes".to_string());
        assert_eq!(err.to_string(), "Crossover failed: no compatible nodes");
    }

    #[test]
    fn test_evolution_error_from_tree_error() {
        let err: EvolutionError = TreeError::EmptyExpression.into();
        assert!(matches!(err, EvolutionError::Tree(_)));

        let err: EvolutionError = DataError::UnknownManager("foo".to_string()).into();
        assert!(matches!(err, EvolutionError::Data(_)));
    }

    #[test]
    fn test_operator_result_success() {
        let result: OperatorResult<i32> = OperatorResult::Success(42);
        assert!(result.is_ok());
        assert_eq!(result.genome(), Some(42));
    }

    #[test]
    fn test_operator_result_failed() {
        let result: OperatorResult<i32> =
            OperatorResult::Failed(OperatorError::MutationFailed("empty".to_string()));
        assert!(!result.is_ok());
        assert_eq!(result.genome(), None);
    }

    #[test]
    fn test_operator_result_map() {
        let result: OperatorResult<i32> = OperatorResult::Success(21);
        assert_eq!(result.map(|g| g * 2).genome(), Some(42));
    }
}
