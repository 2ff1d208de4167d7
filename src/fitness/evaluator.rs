//! Assertion evaluators
//!
//! An evaluator decides whether an assertion holds on one program state.
//! The guarded evaluator treats variables that are missing because an
//! enclosing object was null as an implication with a false antecedent.

use std::fmt::Debug;

use crate::error::EvalError;
use crate::fitness::eval::TreeEval;
use crate::genome::tree::Tree;
use crate::state::{Corpus, Value, Variables};

/// Suffix of the variables recording whether a reference was null
pub const NULL_SUFFIX: &str = "isNull";

/// Delimiter of method accesses in mangled variable names
pub const DELIMITER_METHODS: &str = "_ACCESSING_METHODS_";

/// Delimiter of field accesses in mangled variable names
pub const DELIMITER_FIELDS: &str = "_ACCESSING_FIELDS_";

/// Delimiter of method parameters in mangled variable names
pub const DELIMITER_PARAMETERS: &str = "_PARAMETER_METHOD_";

/// Boolean evaluation of an assertion on a state
pub trait Evaluator: Send + Sync + Debug {
    fn evaluate(&self, tree: &Tree, state: &Variables) -> Result<bool, EvalError>;
}

/// Plain evaluation, every variable must be present
#[derive(Clone, Copy, Debug)]
pub struct BasicEvaluator {
    eval: TreeEval,
}

impl BasicEvaluator {
    pub fn new(precision: f64) -> Self {
        Self {
            eval: TreeEval::new(precision),
        }
    }
}

impl Evaluator for BasicEvaluator {
    fn evaluate(&self, tree: &Tree, state: &Variables) -> Result<bool, EvalError> {
        self.eval.eval_bool(tree, state)
    }
}

/// Evaluation under the null guard
///
/// For every variable used by the tree but absent from the state, the
/// `*isNull` variables covering it form the guard `NOT(g1) && NOT(g2) ...`.
/// A false guard makes the assertion vacuously true.
#[derive(Clone, Copy, Debug)]
pub struct GuardedEvaluator {
    eval: TreeEval,
}

impl GuardedEvaluator {
    pub fn new(precision: f64) -> Self {
        Self {
            eval: TreeEval::new(precision),
        }
    }
}

/// The `*isNull` variables of `state` guarding the missing variables of `tree`
pub fn guard_variables<'a>(tree: &Tree, state: &'a Variables) -> Vec<&'a str> {
    let missing: Vec<String> = tree
        .variables()
        .into_iter()
        .filter(|name| !state.contains(name))
        .collect();
    if missing.is_empty() {
        return Vec::new();
    }

    let mut guards: Vec<&str> = state
        .names()
        .map(String::as_str)
        .filter(|available| {
            let Some(prefix) = available.strip_suffix(NULL_SUFFIX) else {
                return false;
            };
            let owner = available.split(DELIMITER_METHODS).next().unwrap_or(available);
            missing
                .iter()
                .any(|name| name.starts_with(prefix) || name.contains(owner))
        })
        .collect();
    guards.sort_unstable();
    guards
}

impl Evaluator for GuardedEvaluator {
    fn evaluate(&self, tree: &Tree, state: &Variables) -> Result<bool, EvalError> {
        for guard in guard_variables(tree, state) {
            match state.get(guard) {
                Some(Value::Bool(true)) => return Ok(true),
                Some(Value::Bool(false)) => {}
                _ => return Err(EvalError::NotBoolean(guard.to_string())),
            }
        }
        self.eval.eval_bool(tree, state)
    }
}

/// What validators and fitness functions read: the corpus and how to evaluate on it
#[derive(Clone, Copy, Debug)]
pub struct EvaluationContext<'a> {
    pub corpus: &'a Corpus,
    pub evaluator: &'a dyn Evaluator,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(corpus: &'a Corpus, evaluator: &'a dyn Evaluator) -> Self {
        Self { corpus, evaluator }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::parser::TreeReader;
    use crate::state::{AnyNumber, ValueType, VariableTypes};
    use std::collections::BTreeMap;

    struct Typed(BTreeMap<String, ValueType>);

    impl VariableTypes for Typed {
        fn type_of(&self, name: &str) -> Option<ValueType> {
            self.0.get(name).copied()
        }
    }

    fn read(text: &str) -> Tree {
        TreeReader::new(&AnyNumber).read(text).unwrap()
    }

    #[test]
    fn test_basic_evaluator() {
        let evaluator = BasicEvaluator::new(1e-4);
        let state = Variables::new().with_input("x", 10.0).with_input("y", 1.0);
        assert!(evaluator.evaluate(&read("(x > 5) && (y < 3)"), &state).unwrap());
        assert!(evaluator.evaluate(&read("z > 5"), &state).is_err());
    }

    #[test]
    fn test_guard_by_prefix() {
        let evaluator = GuardedEvaluator::new(1e-4);
        let tree = read("this_ACCESSING_FIELDS_size > 2");
        let null = Variables::new().with_input("this_isNull", true);
        assert_eq!(guard_variables(&tree, &null), vec!["this_isNull"]);
        assert!(evaluator.evaluate(&tree, &null).unwrap());

        let present = Variables::new()
            .with_input("this_isNull", false)
            .with_input("this_ACCESSING_FIELDS_size", 1.0);
        assert!(guard_variables(&tree, &present).is_empty());
        assert!(!evaluator.evaluate(&tree, &present).unwrap());
    }

    #[test]
    fn test_guard_by_method_owner() {
        let tree = read("o_list_ACCESSING_METHODS_size > 0");
        let state = Variables::new().with_output("list_ACCESSING_METHODS_isNull", true);
        assert_eq!(guard_variables(&tree, &state), vec!["list_ACCESSING_METHODS_isNull"]);
        assert!(GuardedEvaluator::new(1e-4).evaluate(&tree, &state).unwrap());
    }

    #[test]
    fn test_false_guard_evaluates_tree() {
        let tree = read("this_ACCESSING_FIELDS_size > 2");
        let state = Variables::new().with_input("this_isNull", false);
        assert!(matches!(
            GuardedEvaluator::new(1e-4).evaluate(&tree, &state),
            Err(EvalError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_non_boolean_guard() {
        let tree = read("this_ACCESSING_FIELDS_size > 2");
        let state = Variables::new().with_input("this_isNull", 3.0);
        assert!(matches!(
            GuardedEvaluator::new(1e-4).evaluate(&tree, &state),
            Err(EvalError::NotBoolean(_))
        ));
    }

    #[test]
    fn test_boolean_variables() {
        let mut types = BTreeMap::new();
        types.insert("b".to_string(), ValueType::Boolean);
        let tree = TreeReader::new(&Typed(types)).read("NOT(b)").unwrap();
        let state = Variables::new().with_input("b", false);
        assert!(GuardedEvaluator::new(1e-4).evaluate(&tree, &state).unwrap());
    }
}
