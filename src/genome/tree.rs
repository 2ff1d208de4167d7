//! Typed expression trees
//!
//! An assertion is a binary tree whose nodes carry an operator, a variable
//! name or a literal, plus the [`ValueType`] the node evaluates to. Unary
//! operators keep their operand on the left.

use std::collections::BTreeSet;
use std::fmt;

use crate::genome::functions;
use crate::state::ValueType;

/// Decimal places kept by literals
pub const LITERAL_DECIMALS: i32 = 4;

/// Round a literal to the precision of the textual form
pub fn round_literal(value: f64) -> f64 {
    let scale = 10f64.powi(LITERAL_DECIMALS);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        // no negative zero
        0.0
    } else {
        rounded
    }
}

/// Format a literal with at most four decimals and no trailing zeros
pub fn format_number(value: f64) -> String {
    format!("{}", round_literal(value))
}

/// The payload of a tree node
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Operator or function from the vocabulary
    Operator(&'static str),
    /// Variable reference
    Variable(String),
    /// Numeric literal
    Number(f64),
    /// Boolean literal
    Boolean(bool),
}

impl Node {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Boolean(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator(op) => write!(f, "{}", op),
            Self::Variable(name) => write!(f, "{}", name),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A typed expression tree
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
    pub value: Node,
    pub ty: ValueType,
    pub left: Option<Box<Tree>>,
    pub right: Option<Box<Tree>>,
}

impl Tree {
    /// Create a leaf
    pub fn leaf(value: Node, ty: ValueType) -> Self {
        Self {
            value,
            ty,
            left: None,
            right: None,
        }
    }

    /// Variable reference of the given type
    pub fn variable(name: impl Into<String>, ty: ValueType) -> Self {
        Self::leaf(Node::Variable(name.into()), ty)
    }

    /// Numeric literal, rounded to the textual precision
    pub fn number(value: f64) -> Self {
        Self::leaf(Node::Number(round_literal(value)), ValueType::Number)
    }

    /// Boolean literal
    pub fn boolean(value: bool) -> Self {
        Self::leaf(Node::Boolean(value), ValueType::Boolean)
    }

    /// Unary operator application
    pub fn unary(op: &'static str, child: Tree, ty: ValueType) -> Self {
        Self {
            value: Node::Operator(op),
            ty,
            left: Some(Box::new(child)),
            right: None,
        }
    }

    /// Binary operator application
    pub fn binary(op: &'static str, left: Tree, right: Tree, ty: ValueType) -> Self {
        Self {
            value: Node::Operator(op),
            ty,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Operator of an internal node
    pub fn operator(&self) -> Option<&'static str> {
        match self.value {
            Node::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// Children in order: left, then right
    pub fn children(&self) -> impl Iterator<Item = &Tree> {
        self.left.iter().chain(self.right.iter()).map(|c| c.as_ref())
    }

    pub fn child(&self, index: usize) -> Option<&Tree> {
        match index {
            0 => self.left.as_deref(),
            1 => self.right.as_deref(),
            _ => None,
        }
    }

    fn child_mut(&mut self, index: usize) -> Option<&mut Tree> {
        match index {
            0 => self.left.as_deref_mut(),
            1 => self.right.as_deref_mut(),
            _ => None,
        }
    }

    /// Complexity of the tree
    pub fn number_of_nodes(&self) -> usize {
        1 + self.children().map(Tree::number_of_nodes).sum::<usize>()
    }

    /// Depth of the tree, a leaf has depth 1
    pub fn depth(&self) -> usize {
        1 + self.children().map(Tree::depth).max().unwrap_or(0)
    }

    /// True if some leaf is a variable
    pub fn has_variables(&self) -> bool {
        if self.is_leaf() {
            matches!(self.value, Node::Variable(_))
        } else {
            self.children().any(Tree::has_variables)
        }
    }

    /// Names of the variables used by the tree
    pub fn variables(&self) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.collect_variables(&mut result);
        result
    }

    fn collect_variables(&self, result: &mut BTreeSet<String>) {
        if let Node::Variable(name) = &self.value {
            result.insert(name.clone());
        }
        for child in self.children() {
            child.collect_variables(result);
        }
    }

    /// Rewrite `==` between booleans into `<=>`
    pub fn fix_ambiguity(&mut self) {
        if self.value == Node::Operator("==") {
            let both_boolean = matches!(
                (&self.left, &self.right),
                (Some(l), Some(r)) if l.ty == ValueType::Boolean && r.ty == ValueType::Boolean
            );
            if both_boolean {
                self.value = Node::Operator("<=>");
                self.ty = ValueType::Boolean;
            }
        }
        if let Some(left) = self.left.as_deref_mut() {
            left.fix_ambiguity();
        }
        if let Some(right) = self.right.as_deref_mut() {
            right.fix_ambiguity();
        }
    }

    /// True if every node agrees with the operator signatures
    pub fn is_well_typed(&self) -> bool {
        match &self.value {
            Node::Operator(op) => {
                let args: Vec<ValueType> = self.children().map(|c| c.ty).collect();
                functions::result_type(op, &args) == Some(self.ty)
                    && self.children().all(Tree::is_well_typed)
            }
            Node::Number(_) => self.is_leaf() && self.ty == ValueType::Number,
            Node::Boolean(_) => self.is_leaf() && self.ty == ValueType::Boolean,
            Node::Variable(_) => self.is_leaf(),
        }
    }

    /// Negation of [`Tree::is_well_typed`]
    pub fn is_corrupted(&self) -> bool {
        !self.is_well_typed()
    }

    /// Get all node positions (preorder traversal paths)
    pub fn positions(&self) -> Vec<Vec<usize>> {
        let mut positions = Vec::new();
        self.collect_positions(&mut Vec::new(), &mut |_: &Tree| true, &mut positions);
        positions
    }

    /// Positions of the nodes of the given type
    pub fn positions_of_type(&self, ty: ValueType) -> Vec<Vec<usize>> {
        let mut positions = Vec::new();
        self.collect_positions(&mut Vec::new(), &mut |t: &Tree| t.ty == ty, &mut positions);
        positions
    }

    /// Positions of the leaves
    pub fn leaf_positions(&self) -> Vec<Vec<usize>> {
        let mut positions = Vec::new();
        self.collect_positions(&mut Vec::new(), &mut Tree::is_leaf, &mut positions);
        positions
    }

    /// Positions of the literals
    pub fn constant_positions(&self) -> Vec<Vec<usize>> {
        let mut positions = Vec::new();
        self.collect_positions(&mut Vec::new(), &mut |t: &Tree| t.value.is_literal(), &mut positions);
        positions
    }

    /// Positions of the numeric literals
    pub fn number_positions(&self) -> Vec<Vec<usize>> {
        let mut positions = Vec::new();
        self.collect_positions(
            &mut Vec::new(),
            &mut |t: &Tree| matches!(t.value, Node::Number(_)),
            &mut positions,
        );
        positions
    }

    fn collect_positions<P: FnMut(&Tree) -> bool>(
        &self,
        path: &mut Vec<usize>,
        predicate: &mut P,
        positions: &mut Vec<Vec<usize>>,
    ) {
        if predicate(self) {
            positions.push(path.clone());
        }
        for i in 0..2 {
            if let Some(child) = self.child(i) {
                path.push(i);
                child.collect_positions(path, predicate, positions);
                path.pop();
            }
        }
    }

    /// Get a subtree at the given path
    pub fn get_subtree(&self, path: &[usize]) -> Option<&Tree> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.child(*first)?.get_subtree(rest),
        }
    }

    /// Get a mutable subtree at the given path
    pub fn get_subtree_mut(&mut self, path: &[usize]) -> Option<&mut Tree> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.child_mut(*first)?.get_subtree_mut(rest),
        }
    }

    /// Replace a subtree at the given path
    pub fn replace_subtree(&mut self, path: &[usize], new_subtree: Tree) -> bool {
        match self.get_subtree_mut(path) {
            Some(node) => {
                *node = new_subtree;
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.left.as_deref(), self.right.as_deref()) {
            (value, None, None) => write!(f, "{}", value),
            (Node::Operator(op), Some(left), right) if functions::is_identifier(op) => {
                write!(f, "{}({}", op, left)?;
                if let Some(right) = right {
                    write!(f, ", {}", right)?;
                }
                write!(f, ")")
            }
            (value, left, right) => {
                write!(f, "(")?;
                if let Some(left) = left {
                    write!(f, "{}", left)?;
                }
                write!(f, " {} ", value)?;
                if let Some(right) = right {
                    write!(f, "{}", right)?;
                }
                write!(f, ")")
            }
        }
    }
}
