//! Helpers on assertions and metamorphic relations

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

use crate::error::TreeError;
use crate::genome::parser::TreeReader;
use crate::genome::tree::{Node, Tree};
use crate::state::variables::{FOLLOWUP_SUFFIX, OUTPUT_PREFIX, SOURCE_SUFFIX};
use crate::state::AnyNumber;

lazy_static! {
    static ref TRIVIAL: Regex =
        Regex::new(r"^\s*\(*\s*(\d*\.?\d*|true|false)\s*\)*\s*$").expect("trivial assertion pattern");
}

/// True for assertions that are a lone literal, like `true` or `(1)`
pub fn is_trivial(assertion: &str) -> bool {
    TRIVIAL.is_match(assertion)
}

/// Input and output relation of a metamorphic relation `IR => OR`
pub fn split_mr(tree: &Tree) -> Result<(Tree, Tree), TreeError> {
    match (&tree.value, tree.left.as_deref(), tree.right.as_deref()) {
        (Node::Operator("=>"), Some(ir), Some(or)) => Ok((ir.clone(), or.clone())),
        _ => Err(TreeError::TemplateMismatch(format!(
            "root of a metamorphic relation must be =>, found {}",
            tree.value
        ))),
    }
}

/// [`split_mr`] on text; every variable reads as numeric
pub fn split_mr_text(text: &str) -> Result<(String, String), TreeError> {
    let tree = TreeReader::new(&AnyNumber).read(text)?;
    let (ir, or) = split_mr(&tree)?;
    Ok((ir.to_string(), or.to_string()))
}

/// True if the tree uses some output `o_X_s` together with `o_X_f`
pub fn is_metamorphic_output_relation(tree: &Tree) -> bool {
    let mut source = BTreeSet::new();
    let mut followup = BTreeSet::new();
    for name in tree.variables() {
        if !name.starts_with(OUTPUT_PREFIX) {
            continue;
        }
        if let Some(base) = name.strip_suffix(SOURCE_SUFFIX) {
            source.insert(base.to_string());
        } else if let Some(base) = name.strip_suffix(FOLLOWUP_SUFFIX) {
            followup.insert(base.to_string());
        }
    }
    !source.is_disjoint(&followup)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Tree {
        TreeReader::new(&AnyNumber).read(text).unwrap()
    }

    #[test]
    fn test_trivial() {
        for text in ["true", "false", "(true)", " ( 1 ) ", "0.5", "((false))", ""] {
            assert!(is_trivial(text), "{}", text);
        }
        for text in ["x > 1", "(a && b)", "true && false", "-1 < x"] {
            assert!(!is_trivial(text), "{}", text);
        }
    }

    #[test]
    fn test_split_mr() {
        let (ir, or) = split_mr(&read("(x_s < x_f) => (o_r_s <= o_r_f)")).unwrap();
        assert_eq!(ir.to_string(), "(x_s < x_f)");
        assert_eq!(or.to_string(), "(o_r_s <= o_r_f)");
        assert!(split_mr(&read("x_s < x_f")).is_err());
    }

    #[test]
    fn test_split_mr_text() {
        let (ir, or) = split_mr_text("(x_s + 1) == x_f => o_r_f == (o_r_s + 1)").unwrap();
        assert_eq!(ir, "((x_s + 1) == x_f)");
        assert_eq!(or, "(o_r_f == (o_r_s + 1))");
        assert!(split_mr_text("x_s > 1 &&").is_err());
    }

    #[test]
    fn test_metamorphic_output_relation() {
        assert!(is_metamorphic_output_relation(&read("o_r_s < o_r_f")));
        assert!(is_metamorphic_output_relation(&read("(o_r_s + x_s) == (o_q_f * o_r_f)")));
        assert!(!is_metamorphic_output_relation(&read("o_r_s < o_q_f")));
        assert!(!is_metamorphic_output_relation(&read("x_s < x_f")));
        assert!(!is_metamorphic_output_relation(&read("o_r_s < 3")));
    }
}
