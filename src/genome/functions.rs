//! Operator and function vocabulary of the assertion language
//!
//! The generation lists are ordered; operators are drawn from them by
//! index. The "extra" operators are accepted by the parser and the
//! evaluator but never generated.

use crate::state::ValueType;

pub const MATH_RETURNS_MATH: &[&str] = &["+", "*", "-", "/"];
pub const MATH_RETURNS_BOOLEAN: &[&str] = &["==", "<", ">", "<=", ">=", "<>"];
pub const BOOLEAN_RETURNS_BOOLEAN: &[&str] = &["&&", "||", "<>", "=>", "<=>"];
pub const UNARY_BOOLEAN_RETURNS_BOOLEAN: &[&str] = &["NOT"];
pub const UNARY_MATH_RETURNS_MATH: &[&str] = &["ABS"];

pub const MATH_RETURNS_MATH_EXTRA: &[&str] = &["^"];
pub const MATH_RETURNS_BOOLEAN_EXTRA: &[&str] = &["!="];

pub const UNARY_MATH_RETURNS_SEQUENCE: &[&str] = &["string"];
pub const UNARY_SEQUENCE_RETURNS_MATH: &[&str] = &["length", "sum"];
pub const UNARY_SEQUENCE_RETURNS_SEQUENCE: &[&str] = &["flip"];
pub const BINARY_SEQUENCE_RETURNS_BOOLEAN: &[&str] = &["==", "<>"];
pub const BINARY_SEQUENCE_MATH_RETURNS_SEQUENCE: &[&str] = &["remove", "truncate"];

/// f(f(x)) == f(x)
pub const REENTRANT: &[&str] = &["ABS"];
/// f(f(x)) == x
pub const SYMMETRIC: &[&str] = &["NOT", "flip"];

const ALL: &[&[&str]] = &[
    MATH_RETURNS_MATH,
    MATH_RETURNS_BOOLEAN,
    BOOLEAN_RETURNS_BOOLEAN,
    UNARY_BOOLEAN_RETURNS_BOOLEAN,
    UNARY_MATH_RETURNS_MATH,
    MATH_RETURNS_MATH_EXTRA,
    MATH_RETURNS_BOOLEAN_EXTRA,
    UNARY_MATH_RETURNS_SEQUENCE,
    UNARY_SEQUENCE_RETURNS_MATH,
    UNARY_SEQUENCE_RETURNS_SEQUENCE,
    BINARY_SEQUENCE_RETURNS_BOOLEAN,
    BINARY_SEQUENCE_MATH_RETURNS_SEQUENCE,
];

/// Interned name of an operator, None if not in the vocabulary
pub fn lookup(name: &str) -> Option<&'static str> {
    ALL.iter()
        .flat_map(|group| group.iter())
        .find(|op| **op == name)
        .copied()
}

pub fn is_operator(name: &str) -> bool {
    lookup(name).is_some()
}

/// Operators spelled as identifiers print in call syntax
pub fn is_identifier(name: &str) -> bool {
    name.chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false)
}

pub fn is_reentrant(op: &str) -> bool {
    REENTRANT.contains(&op)
}

pub fn is_symmetric(op: &str) -> bool {
    SYMMETRIC.contains(&op)
}

pub fn is_unary(op: &str) -> bool {
    UNARY_BOOLEAN_RETURNS_BOOLEAN.contains(&op)
        || UNARY_MATH_RETURNS_MATH.contains(&op)
        || UNARY_MATH_RETURNS_SEQUENCE.contains(&op)
        || UNARY_SEQUENCE_RETURNS_MATH.contains(&op)
        || UNARY_SEQUENCE_RETURNS_SEQUENCE.contains(&op)
}

/// Accepted `(argument types, result type)` combinations of an operator
pub fn signatures(op: &str) -> Vec<(Vec<ValueType>, ValueType)> {
    use ValueType::{Boolean as B, Number as N, Sequence as S};

    let mut result = Vec::new();
    if MATH_RETURNS_MATH.contains(&op) || MATH_RETURNS_MATH_EXTRA.contains(&op) {
        result.push((vec![N, N], N));
    }
    if MATH_RETURNS_BOOLEAN.contains(&op) || MATH_RETURNS_BOOLEAN_EXTRA.contains(&op) {
        result.push((vec![N, N], B));
    }
    if BOOLEAN_RETURNS_BOOLEAN.contains(&op) || op == "==" || op == "!=" {
        result.push((vec![B, B], B));
    }
    if UNARY_BOOLEAN_RETURNS_BOOLEAN.contains(&op) {
        result.push((vec![B], B));
    }
    if UNARY_MATH_RETURNS_MATH.contains(&op) {
        result.push((vec![N], N));
    }
    if UNARY_MATH_RETURNS_SEQUENCE.contains(&op) {
        result.push((vec![N], S));
    }
    if UNARY_SEQUENCE_RETURNS_MATH.contains(&op) {
        result.push((vec![S], N));
    }
    if UNARY_SEQUENCE_RETURNS_SEQUENCE.contains(&op) {
        result.push((vec![S], S));
    }
    if BINARY_SEQUENCE_RETURNS_BOOLEAN.contains(&op) || op == "!=" {
        result.push((vec![S, S], B));
    }
    if BINARY_SEQUENCE_MATH_RETURNS_SEQUENCE.contains(&op) {
        result.push((vec![S, N], S));
    }
    result
}

/// Result type of an operator applied to arguments of the given types
pub fn result_type(op: &str, args: &[ValueType]) -> Option<ValueType> {
    signatures(op)
        .into_iter()
        .find(|(params, _)| params.as_slice() == args)
        .map(|(_, ret)| ret)
}

/// Operators interchangeable with `op` for single-node mutation
///
/// The class is chosen by the node's argument types so the replacement
/// keeps the tree well typed.
pub fn same_class(op: &str, args: &[ValueType]) -> &'static [&'static str] {
    use ValueType::{Boolean as B, Number as N, Sequence as S};

    match args {
        [N, N] if MATH_RETURNS_MATH.contains(&op) => MATH_RETURNS_MATH,
        [N, N] if MATH_RETURNS_BOOLEAN.contains(&op) => MATH_RETURNS_BOOLEAN,
        [B, B] if BOOLEAN_RETURNS_BOOLEAN.contains(&op) => BOOLEAN_RETURNS_BOOLEAN,
        [S, S] if BINARY_SEQUENCE_RETURNS_BOOLEAN.contains(&op) => BINARY_SEQUENCE_RETURNS_BOOLEAN,
        [S, N] if BINARY_SEQUENCE_MATH_RETURNS_SEQUENCE.contains(&op) => {
            BINARY_SEQUENCE_MATH_RETURNS_SEQUENCE
        }
        [S] if UNARY_SEQUENCE_RETURNS_MATH.contains(&op) => UNARY_SEQUENCE_RETURNS_MATH,
        [S] if UNARY_SEQUENCE_RETURNS_SEQUENCE.contains(&op) => UNARY_SEQUENCE_RETURNS_SEQUENCE,
        [N] if UNARY_MATH_RETURNS_SEQUENCE.contains(&op) => UNARY_MATH_RETURNS_SEQUENCE,
        [N] if UNARY_MATH_RETURNS_MATH.contains(&op) => UNARY_MATH_RETURNS_MATH,
        [B] if UNARY_BOOLEAN_RETURNS_BOOLEAN.contains(&op) => UNARY_BOOLEAN_RETURNS_BOOLEAN,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ValueType::{Boolean as B, Number as N, Sequence as S};

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("&&"), Some("&&"));
        assert_eq!(lookup("truncate"), Some("truncate"));
        assert_eq!(lookup("^"), Some("^"));
        assert_eq!(lookup("%"), None);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("NOT"));
        assert!(is_identifier("length"));
        assert!(!is_identifier("&&"));
        assert!(!is_identifier("<=>"));
    }

    #[test]
    fn test_result_types() {
        assert_eq!(result_type("&&", &[B, B]), Some(B));
        assert_eq!(result_type("&&", &[N, N]), None);
        assert_eq!(result_type("+", &[N, N]), Some(N));
        assert_eq!(result_type("<>", &[N, N]), Some(B));
        assert_eq!(result_type("<>", &[B, B]), Some(B));
        assert_eq!(result_type("<>", &[S, S]), Some(B));
        assert_eq!(result_type("remove", &[S, N]), Some(S));
        assert_eq!(result_type("string", &[N]), Some(S));
        assert_eq!(result_type("length", &[S]), Some(N));
        assert_eq!(result_type("NOT", &[N]), None);
    }

    #[test]
    fn test_same_class() {
        assert_eq!(same_class("<>", &[B, B]), BOOLEAN_RETURNS_BOOLEAN);
        assert_eq!(same_class("<>", &[N, N]), MATH_RETURNS_BOOLEAN);
        assert_eq!(same_class("flip", &[S]), UNARY_SEQUENCE_RETURNS_SEQUENCE);
        assert!(same_class("^", &[N, N]).is_empty());
    }

    #[test]
    fn test_special_effects() {
        assert!(is_reentrant("ABS"));
        assert!(is_symmetric("NOT"));
        assert!(is_symmetric("flip"));
        assert!(!is_symmetric("ABS"));
        assert!(is_unary("sum"));
        assert!(!is_unary("remove"));
    }
}
