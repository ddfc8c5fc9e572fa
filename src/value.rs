//! Dynamic values passed between units of work.
//!
//! Every unit consumes a slice of `Value` arguments and produces zero or
//! more `Value` results. The enum stays deliberately small: combinators
//! only move values around, test them for truthiness, and add them (Sum).

use std::fmt;

use crate::error::{Error, ErrorKind, Result};

/// A value that can flow through a combinator graph.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Str(String),
    Symbol(String),
    List(Vec<Value>),
    /// Missing/unknown value, produced when a unit returns nothing.
    Missing,
    /// A reified error, produced by `Safe` instead of propagating.
    Failure { kind: ErrorKind, message: String },
}

impl Value {
    /// Name of this value's type, used in type-error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Real(_) => "Real",
            Value::Boolean(_) => "Boolean",
            Value::Str(_) => "Str",
            Value::Symbol(_) => "Symbol",
            Value::List(_) => "List",
            Value::Missing => "Missing",
            Value::Failure { .. } => "Failure",
        }
    }

    /// Truthiness test, the default predicate of Filter and Split.
    ///
    /// Zero numbers, empty strings/lists, `Missing`, and `Failure` are
    /// falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Real(r) => *r != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Symbol(_) => true,
            Value::List(items) => !items.is_empty(),
            Value::Missing => false,
            Value::Failure { .. } => false,
        }
    }

    /// Addition, the fold step of Sum.
    ///
    /// Integers add (with overflow detection), mixed numerics promote to
    /// `Real`, strings and lists concatenate. Anything else is a type
    /// error.
    pub fn checked_add(&self, other: &Value) -> Result<Value> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a
                .checked_add(*b)
                .map(Value::Integer)
                .ok_or_else(|| Error::runtime(format!("integer overflow adding {a} and {b}"))),
            (Value::Integer(a), Value::Real(b)) => Ok(Value::Real(*a as f64 + b)),
            (Value::Real(a), Value::Integer(b)) => Ok(Value::Real(a + *b as f64)),
            (Value::Real(a), Value::Real(b)) => Ok(Value::Real(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                let mut joined = a.clone();
                joined.extend(b.iter().cloned());
                Ok(Value::List(joined))
            }
            (a, b) => Err(Error::type_error(
                "two addable values (numeric, Str, or List)",
                format!("{} and {}", a.type_name(), b.type_name()),
            )),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            // Bit comparison keeps Eq and Hash consistent for NaN and
            // signed zero.
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Missing, Value::Missing) => true,
            (
                Value::Failure { kind: ka, message: ma },
                Value::Failure { kind: kb, message: mb },
            ) => ka == kb && ma == mb,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Integer(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            Value::Real(r) => {
                1u8.hash(state);
                // Bit representation keeps hashing consistent with Eq.
                r.to_bits().hash(state);
            }
            Value::Boolean(b) => {
                2u8.hash(state);
                b.hash(state);
            }
            Value::Str(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Value::Symbol(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::List(items) => {
                5u8.hash(state);
                items.hash(state);
            }
            Value::Missing => {
                6u8.hash(state);
            }
            Value::Failure { kind, message } => {
                7u8.hash(state);
                kind.hash(state);
                message.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Value::Missing => write!(f, "Missing"),
            Value::Failure { kind, message } => write!(f, "Failure[{kind:?}: {message}]"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(Value::Integer(1).is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Real(0.0).is_truthy());
        assert!(Value::Str("x".to_string()).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::List(vec![Value::Missing]).is_truthy());
        assert!(!Value::Missing.is_truthy());
        assert!(Value::Symbol("s".to_string()).is_truthy());
    }

    #[test]
    fn test_checked_add_numeric_promotion() {
        let sum = Value::Integer(2).checked_add(&Value::Real(0.5)).unwrap();
        assert_eq!(sum, Value::Real(2.5));

        let sum = Value::Integer(2).checked_add(&Value::Integer(3)).unwrap();
        assert_eq!(sum, Value::Integer(5));
    }

    #[test]
    fn test_checked_add_concatenation() {
        let sum = Value::from("ab").checked_add(&Value::from("cd")).unwrap();
        assert_eq!(sum, Value::from("abcd"));

        let sum = Value::List(vec![Value::Integer(1)])
            .checked_add(&Value::List(vec![Value::Integer(2)]))
            .unwrap();
        assert_eq!(sum, Value::List(vec![Value::Integer(1), Value::Integer(2)]));
    }

    #[test]
    fn test_checked_add_type_error() {
        let err = Value::Integer(1).checked_add(&Value::Boolean(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_checked_add_overflow() {
        let err = Value::Integer(i64::MAX).checked_add(&Value::Integer(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_equality_across_types_is_false() {
        assert_ne!(Value::Integer(1), Value::Real(1.0));
        assert_ne!(Value::Str("1".to_string()), Value::Integer(1));
    }

    #[test]
    fn test_display() {
        let list = Value::List(vec![Value::Integer(1), Value::from("a")]);
        assert_eq!(list.to_string(), "{1, \"a\"}");
    }
}
