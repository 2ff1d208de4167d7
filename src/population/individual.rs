//! Candidate assertions
//!
//! An [`Individual`] wraps a [`TreeGroup`] with the assertion it builds and
//! the outcome of evaluating that assertion on the corpus. Fitness is
//! computed once and then only extended when the corpus grows.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::behaviour::BehaviourManager;
use crate::error::TreeError;
use crate::fitness::bitmap::StateIds;
use crate::fitness::functions::Score;
use crate::genome::group::TreeGroup;
use crate::genome::parser::TreeReader;
use crate::genome::template::TreeTemplate;
use crate::genome::tree::Tree;
use crate::state::{Corpus, VariableTypes};

/// Progress of the input-relation satisfaction check
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Satisfaction {
    /// Executions the count covers
    pub validated: usize,
    /// Executions satisfying the input relation
    pub count: usize,
}

/// One candidate assertion of the population
#[derive(Clone, Debug)]
pub struct Individual {
    group: TreeGroup,
    tree: Tree,
    text: String,
    /// Node count of the assertion
    pub complexity: usize,
    /// Accepted by the validator, `None` until computed
    pub valid: Option<bool>,
    /// Accepted by the elite validator, `None` until computed
    pub elite_valid: Option<bool>,
    pub false_positives: Score,
    pub false_negatives: Score,
    pub satisfaction: Satisfaction,
}

impl Individual {
    pub fn from_group(group: TreeGroup) -> Result<Self, TreeError> {
        let tree = group.build_tree()?;
        Ok(Self::assemble(group, tree))
    }

    /// Recognize a concrete assertion as an instance of `template`
    pub fn from_tree(tree: Tree, template: &Arc<TreeTemplate>) -> Result<Self, TreeError> {
        let group = template.match_tree(&tree)?;
        Ok(Self::assemble(group, tree))
    }

    /// Parse and recognize an assertion in text form
    pub fn from_text<V: VariableTypes>(
        text: &str,
        template: &Arc<TreeTemplate>,
        variables: &V,
    ) -> Result<Self, TreeError> {
        let tree = TreeReader::new(variables).read(text)?;
        Self::from_tree(tree, template)
    }

    fn assemble(group: TreeGroup, tree: Tree) -> Self {
        let text = tree.to_string();
        let complexity = tree.number_of_nodes();
        Self {
            group,
            tree,
            text,
            complexity,
            valid: None,
            elite_valid: None,
            false_positives: Score::default(),
            false_negatives: Score::default(),
            satisfaction: Satisfaction::default(),
        }
    }

    pub fn group(&self) -> &TreeGroup {
        &self.group
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Textual form of the assertion
    pub fn assertion(&self) -> &str {
        &self.text
    }

    /// Validate and, when valid, compute both objectives
    ///
    /// Does nothing if the individual was computed before.
    pub fn compute(&mut self, behaviour: &BehaviourManager, corpus: &Corpus) {
        if self.valid.is_some() {
            return;
        }
        let ctx = behaviour.context(corpus);
        let valid = behaviour.validator.validate(self, &ctx);
        self.valid = Some(valid);
        if valid {
            self.elite_valid = Some(behaviour.elite_validator.validate(self, &ctx));
            self.false_positives = behaviour.fitness_fp.compute(&self.tree, &ctx);
            self.false_negatives = behaviour.fitness_fn.compute(&self.tree, &ctx);
        }
    }

    /// Bring validity and objectives up to date after the corpus grew
    pub fn recompute(&mut self, behaviour: &BehaviourManager, corpus: &Corpus) {
        let ctx = behaviour.context(corpus);
        let previous = self.valid;
        let valid = behaviour.validator.revalidate(self, previous, &ctx);
        self.valid = Some(valid);
        if valid {
            let previous = self.elite_valid;
            self.elite_valid = Some(behaviour.elite_validator.revalidate(self, previous, &ctx));
            self.false_positives = behaviour.fitness_fp.recompute(&self.tree, &self.false_positives, &ctx);
            self.false_negatives = behaviour.fitness_fn.recompute(&self.tree, &self.false_negatives, &ctx);
        }
    }

    pub fn is_computed(&self) -> bool {
        self.valid.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.valid.unwrap_or(false)
    }

    pub fn is_elite_valid(&self) -> bool {
        self.elite_valid.unwrap_or(false)
    }

    /// False-positive rate, worst when not computed
    pub fn fitness_fp(&self) -> f64 {
        self.false_positives.value.unwrap_or(1.0)
    }

    /// False-negative rate, worst when not computed
    pub fn fitness_fn(&self) -> f64 {
        self.false_negatives.value.unwrap_or(1.0)
    }

    /// Correct executions on which the assertion holds
    pub fn ids_fp_good(&self) -> &StateIds {
        &self.false_positives.good
    }

    /// Incorrect executions on which the assertion fails
    pub fn ids_fn_good(&self) -> &StateIds {
        &self.false_negatives.good
    }

    /// Classification signature: both sets of correctly classified executions
    pub fn signature(&self) -> (&StateIds, &StateIds) {
        (self.ids_fp_good(), self.ids_fn_good())
    }

    /// No false positive and at least one detected failure
    pub fn is_good(&self) -> bool {
        self.fitness_fp() == 0.0 && (1.0 - self.fitness_fn()) > 1e-6
    }

    pub fn is_perfect(&self) -> bool {
        self.fitness_fp() == 0.0 && self.fitness_fn() == 0.0
    }

    /// FP, then FN, then complexity
    pub fn compare_fp_fn(&self, other: &Individual) -> Ordering {
        self.fitness_fp()
            .total_cmp(&other.fitness_fp())
            .then_with(|| self.fitness_fn().total_cmp(&other.fitness_fn()))
            .then_with(|| self.complexity.cmp(&other.complexity))
    }

    /// FN, then FP, then complexity
    pub fn compare_fn_fp(&self, other: &Individual) -> Ordering {
        self.fitness_fn()
            .total_cmp(&other.fitness_fn())
            .then_with(|| self.fitness_fp().total_cmp(&other.fitness_fp()))
            .then_with(|| self.complexity.cmp(&other.complexity))
    }

    /// [`compare_fp_fn`](Self::compare_fp_fn) with rates scaled by the complexity penalty
    pub fn compare_fp_fn_penalized(&self, other: &Individual, theta: i32) -> Ordering {
        let (p, q) = (self.penalty(theta), other.penalty(theta));
        (self.fitness_fp() * p)
            .total_cmp(&(other.fitness_fp() * q))
            .then_with(|| (self.fitness_fn() * p).total_cmp(&(other.fitness_fn() * q)))
            .then_with(|| self.complexity.cmp(&other.complexity))
    }

    /// [`compare_fn_fp`](Self::compare_fn_fp) with rates scaled by the complexity penalty
    pub fn compare_fn_fp_penalized(&self, other: &Individual, theta: i32) -> Ordering {
        let (p, q) = (self.penalty(theta), other.penalty(theta));
        (self.fitness_fn() * p)
            .total_cmp(&(other.fitness_fn() * q))
            .then_with(|| (self.fitness_fp() * p).total_cmp(&(other.fitness_fp() * q)))
            .then_with(|| self.complexity.cmp(&other.complexity))
    }

    /// `2^(complexity - theta)` from `theta` on, 1 below
    pub fn penalty(&self, theta: i32) -> f64 {
        let complexity = self.complexity as i32;
        if complexity < theta {
            1.0
        } else {
            2f64.powi(complexity - theta)
        }
    }
}

impl PartialEq for Individual {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.text)?;
        writeln!(f, "fitnessFP={}", self.fitness_fp())?;
        writeln!(f, "fitnessFN={}", self.fitness_fn())?;
        writeln!(f, "complexity={}", self.complexity)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::genome::builder::GeneratedTreeBuilder;
    use crate::genome::factory::TreeFactory;
    use crate::state::{ValueType, Variables, VariablesManager};

    pub(crate) fn regular_template() -> Arc<TreeTemplate> {
        let vars = VariablesManager::from_variables(&Variables::new().with_input("x", 1.0).with_input("y", 1.0));
        let factory = TreeFactory::new(vars, Arc::new(Config::default()));
        Arc::new(TreeTemplate::regular(Arc::new(GeneratedTreeBuilder::new(
            factory,
            ValueType::Boolean,
            6,
            32,
        ))))
    }

    /// Individual with fixed rates, for comparator tests
    pub(crate) fn scored(text: &str, fp: f64, fn_: f64) -> Individual {
        let template = regular_template();
        let vars = VariablesManager::from_variables(&Variables::new().with_input("x", 1.0).with_input("y", 1.0));
        let mut ind = Individual::from_text(text, &template, &vars).unwrap();
        ind.valid = Some(true);
        ind.elite_valid = Some(true);
        ind.false_positives.value = Some(fp);
        ind.false_negatives.value = Some(fn_);
        ind
    }

    #[test]
    fn test_from_text() {
        let ind = scored("(x > 5) && (y < 3)", 0.0, 0.0);
        assert_eq!(ind.assertion(), "((x > 5) && (y < 3))");
        assert_eq!(ind.complexity, 7);
        assert_eq!(ind.group().complexity(), 7);
    }

    #[test]
    fn test_good_and_perfect() {
        assert!(scored("x > 1", 0.0, 0.5).is_good());
        assert!(!scored("x > 1", 0.0, 1.0).is_good());
        assert!(!scored("x > 1", 0.1, 0.0).is_good());
        assert!(scored("x > 1", 0.0, 0.0).is_perfect());
    }

    #[test]
    fn test_complexity_tie_break() {
        let small = scored("x > 1", 0.0, 0.0);
        let large = scored("(x > 1) && (y > 1)", 0.0, 0.0);
        assert_eq!(small.compare_fp_fn(&large), Ordering::Less);
        assert_eq!(small.compare_fn_fp(&large), Ordering::Less);
        assert_eq!(large.compare_fn_fp(&small), Ordering::Greater);
    }

    #[test]
    fn test_penalized_comparison() {
        let small = scored("x > 1", 0.2, 0.2);
        let large = scored("(x > 1) && (y > (1 + 2))", 0.15, 0.15);
        assert_eq!(small.penalty(5), 1.0);
        assert_eq!(large.penalty(5), 16.0);
        assert_eq!(large.compare_fp_fn(&small), Ordering::Less);
        assert_eq!(large.compare_fp_fn_penalized(&small, 5), Ordering::Greater);
        assert_eq!(small.compare_fn_fp_penalized(&large, 5), Ordering::Less);
    }

    #[test]
    fn test_uncomputed_is_worst() {
        let template = regular_template();
        let vars = VariablesManager::from_variables(&Variables::new().with_input("x", 1.0));
        let ind = Individual::from_text("x > 1", &template, &vars).unwrap();
        assert!(!ind.is_computed());
        assert_eq!(ind.fitness_fp(), 1.0);
        assert_eq!(ind.fitness_fn(), 1.0);
    }
}
