//! Typed variable values
//!
//! A recorded program state binds names to booleans, numbers or sequences.
//! Values that cannot take part in an assertion (unserializable objects,
//! nulls, recorded errors) are kept as [`Value::Opaque`] so that the name is
//! still known to be present.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value type tag, shared by variables and tree nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Number,
    Sequence,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Number => write!(f, "NUMBER"),
            Self::Sequence => write!(f, "SEQUENCE"),
        }
    }
}

/// An ordered sequence of numeric items
///
/// Textual sequences hold character codes; their `sum` is always zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub items: Vec<f64>,
    pub textual: bool,
}

impl Sequence {
    /// Sequence of numeric items
    pub fn numeric(items: Vec<f64>) -> Self {
        Self {
            items,
            textual: false,
        }
    }

    /// Sequence of the characters of a string
    pub fn text(s: &str) -> Self {
        Self {
            items: s.chars().map(|c| c as u32 as f64).collect(),
            textual: true,
        }
    }

    /// Decimal representation of the integer part of a number, as text
    pub fn from_number(number: f64) -> Self {
        Self::text(&(number as i64).to_string())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the items, zero for text
    pub fn sum(&self) -> f64 {
        if self.textual {
            0.0
        } else {
            self.items.iter().sum()
        }
    }

    /// Items in reverse order
    pub fn flip(&self) -> Self {
        Self {
            items: self.items.iter().rev().copied().collect(),
            textual: self.textual,
        }
    }

    /// Remove one item; negative indices count from the end.
    /// Out-of-range indices leave the sequence unchanged.
    pub fn remove(&self, index: i64) -> Self {
        let len = self.items.len() as i64;
        let target = if index >= 0 && index < len {
            Some(index)
        } else if index < 0 && -index <= len {
            Some(len + index)
        } else {
            None
        };
        match target {
            Some(t) => Self {
                items: self
                    .items
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i as i64 != t)
                    .map(|(_, v)| *v)
                    .collect(),
                textual: self.textual,
            },
            None => self.clone(),
        }
    }

    /// Keep the first `index` items, or drop the first `-index` items when negative
    pub fn truncate(&self, index: i64) -> Self {
        let len = self.items.len();
        let (start, end) = if index < 0 {
            ((index.unsigned_abs() as usize).min(len), len)
        } else {
            (0, (index as usize).min(len))
        };
        Self {
            items: self.items[start..end].to_vec(),
            textual: self.textual,
        }
    }

    /// Element-wise equality within a tolerance
    pub fn approx_eq(&self, other: &Sequence, precision: f64) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| (a - b).abs() < precision)
    }
}

/// A value bound to a variable in a program state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Sequence(Sequence),
    /// Present but unusable in an assertion
    Opaque,
}

impl Value {
    /// Type of the value, None for opaque values
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Bool(_) => Some(ValueType::Boolean),
            Self::Number(_) => Some(ValueType::Number),
            Self::Sequence(_) => Some(ValueType::Sequence),
            Self::Opaque => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Sequence> for Value {
    fn from(s: Sequence) -> Self {
        Self::Sequence(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: &[f64]) -> Sequence {
        Sequence::numeric(items.to_vec())
    }

    #[test]
    fn test_sequence_from_number() {
        let s = Sequence::from_number(42.7);
        assert_eq!(s, Sequence::text("42"));
        assert_eq!(s.len(), 2);
        assert_eq!(s.sum(), 0.0);
    }

    #[test]
    fn test_sequence_sum_and_flip() {
        let s = seq(&[1.0, 2.0, 3.5]);
        assert_eq!(s.sum(), 6.5);
        assert_eq!(s.flip(), seq(&[3.5, 2.0, 1.0]));
        assert_eq!(Sequence::text("ab").flip(), Sequence::text("ba"));
    }

    #[test]
    fn test_sequence_remove() {
        let s = seq(&[1.0, 2.0, 3.0]);
        assert_eq!(s.remove(0), seq(&[2.0, 3.0]));
        assert_eq!(s.remove(-1), seq(&[1.0, 2.0]));
        assert_eq!(s.remove(-3), seq(&[2.0, 3.0]));
        assert_eq!(s.remove(3), s);
        assert_eq!(s.remove(-4), s);
    }

    #[test]
    fn test_sequence_truncate() {
        let s = seq(&[1.0, 2.0, 3.0]);
        assert_eq!(s.truncate(2), seq(&[1.0, 2.0]));
        assert_eq!(s.truncate(10), s);
        assert_eq!(s.truncate(-1), seq(&[2.0, 3.0]));
        assert_eq!(s.truncate(-10), seq(&[]));
        assert_eq!(s.truncate(0), seq(&[]));
    }

    #[test]
    fn test_sequence_approx_eq() {
        let a = seq(&[1.0, 2.0]);
        let b = seq(&[1.00001, 2.0]);
        assert!(a.approx_eq(&b, 1e-4));
        assert!(!a.approx_eq(&seq(&[1.0]), 1e-4));
        assert!(!a.approx_eq(&seq(&[1.1, 2.0]), 1e-4));
    }

    #[test]
    fn test_value_types() {
        assert_eq!(Value::from(true).value_type(), Some(ValueType::Boolean));
        assert_eq!(Value::from(1.0).value_type(), Some(ValueType::Number));
        assert_eq!(Value::Opaque.value_type(), None);
        assert_eq!(ValueType::Sequence.to_string(), "SEQUENCE");
    }
}
