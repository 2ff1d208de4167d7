//! Evaluation of a tree against one program state

use crate::error::EvalError;
use crate::genome::tree::{Node, Tree};
use crate::state::{Sequence, Value, Variables};

/// Tree interpreter with a numeric tolerance
///
/// Numbers compare equal when closer than `precision`; division by a
/// divisor closer to zero than `precision` yields 1.
#[derive(Clone, Copy, Debug)]
pub struct TreeEval {
    pub precision: f64,
}

impl TreeEval {
    pub fn new(precision: f64) -> Self {
        Self { precision }
    }

    /// Evaluate a boolean tree
    pub fn eval_bool(&self, tree: &Tree, state: &Variables) -> Result<bool, EvalError> {
        match self.eval(tree, state)? {
            Value::Bool(b) => Ok(b),
            _ => Err(EvalError::NotBoolean(tree.to_string())),
        }
    }

    /// Evaluate a numeric tree
    pub fn eval_number(&self, tree: &Tree, state: &Variables) -> Result<f64, EvalError> {
        let value = self.eval(tree, state)?;
        num(&value, "number")
    }

    pub fn eval(&self, tree: &Tree, state: &Variables) -> Result<Value, EvalError> {
        let op = match &tree.value {
            Node::Number(n) => return Ok(Value::Number(*n)),
            Node::Boolean(b) => return Ok(Value::Bool(*b)),
            Node::Variable(name) => {
                return state
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UnknownVariable(name.clone()))
            }
            Node::Operator(op) => *op,
        };

        let left = match tree.left.as_deref() {
            Some(l) => self.eval(l, state)?,
            None => return Err(EvalError::MissingOperand(op.to_string())),
        };
        let right_value = tree.right.as_deref().map(|r| self.eval(r, state)).transpose()?;
        let right = || {
            right_value
                .as_ref()
                .ok_or_else(|| EvalError::MissingOperand(op.to_string()))
        };

        let value = match op {
            "+" => Value::Number(num(&left, op)? + num(right()?, op)?),
            "-" => Value::Number(num(&left, op)? - num(right()?, op)?),
            "*" => Value::Number(num(&left, op)? * num(right()?, op)?),
            "/" => Value::Number(self.protected_division(num(&left, op)?, num(right()?, op)?)),
            "^" => Value::Number(num(&left, op)?.powf(num(right()?, op)?)),
            "==" => Value::Bool(self.equals(&left, right()?, op)?),
            "!=" | "<>" => Value::Bool(!self.equals(&left, right()?, op)?),
            "<" => Value::Bool(num(&left, op)? < num(right()?, op)?),
            ">" => Value::Bool(num(&left, op)? > num(right()?, op)?),
            "<=" => Value::Bool(num(&left, op)? <= num(right()?, op)?),
            ">=" => Value::Bool(num(&left, op)? >= num(right()?, op)?),
            "&&" => Value::Bool(boolean(&left, op)? && boolean(right()?, op)?),
            "||" => Value::Bool(boolean(&left, op)? || boolean(right()?, op)?),
            "=>" => Value::Bool(!boolean(&left, op)? || boolean(right()?, op)?),
            "<=>" => Value::Bool(boolean(&left, op)? == boolean(right()?, op)?),
            "NOT" => Value::Bool(!boolean(&left, op)?),
            "ABS" => Value::Number(num(&left, op)?.abs()),
            "string" => Value::Sequence(Sequence::from_number(num(&left, op)?)),
            "length" => Value::Number(seq(&left, op)?.len() as f64),
            "sum" => Value::Number(seq(&left, op)?.sum()),
            "flip" => Value::Sequence(seq(&left, op)?.flip()),
            "remove" => Value::Sequence(seq(&left, op)?.remove(num(right()?, op)? as i64)),
            "truncate" => Value::Sequence(seq(&left, op)?.truncate(num(right()?, op)? as i64)),
            other => return Err(EvalError::UnknownOperator(other.to_string())),
        };
        Ok(value)
    }

    pub fn numeric_equals(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.precision
    }

    pub fn protected_division(&self, dividend: f64, divisor: f64) -> f64 {
        if self.numeric_equals(divisor, 0.0) {
            1.0
        } else {
            dividend / divisor
        }
    }

    fn equals(&self, a: &Value, b: &Value, op: &str) -> Result<bool, EvalError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(self.numeric_equals(*x, *y)),
            (Value::Sequence(x), Value::Sequence(y)) => Ok(x.approx_eq(y, self.precision)),
            (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
            _ => Err(mismatch(op, "operands of different types")),
        }
    }
}

fn mismatch(op: &str, message: &str) -> EvalError {
    EvalError::TypeMismatch {
        operator: op.to_string(),
        message: message.to_string(),
    }
}

fn num(value: &Value, op: &str) -> Result<f64, EvalError> {
    value.as_number().ok_or_else(|| mismatch(op, "expected a number"))
}

fn boolean(value: &Value, op: &str) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| mismatch(op, "expected a boolean"))
}

fn seq<'a>(value: &'a Value, op: &str) -> Result<&'a Sequence, EvalError> {
    value.as_sequence().ok_or_else(|| mismatch(op, "expected a sequence"))
}
