//! Evaluation schema and state corpus

use std::collections::BTreeMap;

use crate::error::DataError;
use crate::state::value::ValueType;
use crate::state::variables::{to_followup, to_source, TestExecution, Variables};

/// Resolves the type of a variable name
pub trait VariableTypes {
    fn type_of(&self, name: &str) -> Option<ValueType>;
}

/// Typed variable names available to generated assertions
///
/// The schema is fixed for a run: every execution must agree on the type
/// of each variable it binds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariablesManager {
    types: BTreeMap<String, ValueType>,
    numeric: Vec<String>,
    boolean: Vec<String>,
    sequence: Vec<String>,
}

impl VariablesManager {
    /// Build from an explicit name-to-type map
    pub fn from_types(types: BTreeMap<String, ValueType>) -> Self {
        let mut numeric = Vec::new();
        let mut boolean = Vec::new();
        let mut sequence = Vec::new();
        for (name, ty) in &types {
            match ty {
                ValueType::Number => numeric.push(name.clone()),
                ValueType::Boolean => boolean.push(name.clone()),
                ValueType::Sequence => sequence.push(name.clone()),
            }
        }
        Self {
            types,
            numeric,
            boolean,
            sequence,
        }
    }

    /// Infer the schema from the values of one execution; opaque values are skipped
    pub fn from_variables(variables: &Variables) -> Self {
        Self::from_types(
            variables
                .values()
                .iter()
                .filter_map(|(name, value)| value.value_type().map(|t| (name.clone(), t)))
                .collect(),
        )
    }

    pub fn types(&self) -> &BTreeMap<String, ValueType> {
        &self.types
    }

    pub fn numeric_vars(&self) -> &[String] {
        &self.numeric
    }

    pub fn boolean_vars(&self) -> &[String] {
        &self.boolean
    }

    pub fn sequence_vars(&self) -> &[String] {
        &self.sequence
    }

    /// Variables of a given type
    pub fn vars_of(&self, ty: ValueType) -> &[String] {
        match ty {
            ValueType::Number => &self.numeric,
            ValueType::Boolean => &self.boolean,
            ValueType::Sequence => &self.sequence,
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Keep only the variables satisfying the predicate
    pub fn filter<F: Fn(&str, ValueType) -> bool>(&self, f: F) -> Self {
        Self::from_types(
            self.types
                .iter()
                .filter(|(name, ty)| f(name, **ty))
                .map(|(name, ty)| (name.clone(), *ty))
                .collect(),
        )
    }

    /// Schema of metamorphic pairs: each variable split into source and follow-up
    pub fn make_metamorphic(&self) -> Self {
        let mut types = BTreeMap::new();
        for (name, ty) in &self.types {
            types.insert(to_source(name), *ty);
            types.insert(to_followup(name), *ty);
        }
        Self::from_types(types)
    }

    /// Reject executions whose values disagree with the schema
    pub fn check_consistency(&self, variables: &Variables) -> Result<(), DataError> {
        for (name, value) in variables.values() {
            if let (Some(expected), Some(actual)) = (self.types.get(name), value.value_type()) {
                if *expected != actual {
                    return Err(DataError::TypeConflict {
                        name: name.clone(),
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl VariableTypes for VariablesManager {
    fn type_of(&self, name: &str) -> Option<ValueType> {
        self.types.get(name).copied()
    }
}

/// Resolver accepting every name as a number
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyNumber;

impl VariableTypes for AnyNumber {
    fn type_of(&self, _name: &str) -> Option<ValueType> {
        Some(ValueType::Number)
    }
}

/// Correct and incorrect executions the assertions are evaluated against
#[derive(Clone, Debug, Default)]
pub struct Corpus {
    pub correct: Vec<TestExecution>,
    pub incorrect: Vec<TestExecution>,
}

impl Corpus {
    pub fn new(correct: Vec<TestExecution>, incorrect: Vec<TestExecution>) -> Self {
        Self { correct, incorrect }
    }

    /// True if either side has no execution
    pub fn is_degenerate(&self) -> bool {
        self.correct.is_empty() || self.incorrect.is_empty()
    }
}
