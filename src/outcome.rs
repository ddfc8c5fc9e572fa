//! Outcome sets and the shared flattening policy.
//!
//! A unit of work returns zero or more values. `Outcome` makes the
//! arity explicit instead of overloading a single value type, and the
//! one-level `flatten` rule here is the only aggregation rule fan-out
//! combinators (Fork, Route, and their concurrent variants) ever use.

use crate::value::Value;

/// The result of invoking one unit of work.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// The unit produced nothing.
    None,
    /// One value.
    Single(Value),
    /// An ordered tuple of values.
    Many(Vec<Value>),
}

impl Outcome {
    /// Build an outcome from a caller's argument list: zero arguments is
    /// no value, one argument passes through, more become a tuple.
    ///
    /// This is the identity behavior of the empty Pipe and of
    /// SideEffects.
    pub fn from_args(args: &[Value]) -> Outcome {
        match args {
            [] => Outcome::None,
            [value] => Outcome::Single(value.clone()),
            values => Outcome::Many(values.to_vec()),
        }
    }

    /// Convert an outcome into the argument list for the next stage:
    /// a tuple splices into positional arguments, a single value is one
    /// argument, no value is no arguments.
    pub fn into_args(self) -> Vec<Value> {
        match self {
            Outcome::None => Vec::new(),
            Outcome::Single(value) => vec![value],
            Outcome::Many(values) => values,
        }
    }

    /// Collapse an outcome into one `Value` (tuples become lists, no
    /// value becomes `Missing`). Used where a single element is needed,
    /// e.g. per-element Map results and predicate tests.
    pub fn into_value(self) -> Value {
        match self {
            Outcome::None => Value::Missing,
            Outcome::Single(value) => value,
            Outcome::Many(values) => Value::List(values),
        }
    }

    /// The shared flattening policy.
    ///
    /// Each `Many` outcome splices its elements into the aggregate (one
    /// level only, never recursive), each `Single` contributes one
    /// element, and `None` contributes nothing. An aggregate of zero
    /// elements is no value; exactly one element is returned unwrapped;
    /// otherwise the full ordered tuple is returned.
    pub fn flatten(outcomes: Vec<Outcome>) -> Outcome {
        let mut aggregate = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::None => {}
                Outcome::Single(value) => aggregate.push(value),
                Outcome::Many(values) => aggregate.extend(values),
            }
        }
        match aggregate.len() {
            0 => Outcome::None,
            1 => Outcome::Single(aggregate.into_iter().next().unwrap_or(Value::Missing)),
            _ => Outcome::Many(aggregate),
        }
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Single(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    #[test]
    fn test_flatten_empty_is_none() {
        assert_eq!(Outcome::flatten(vec![]), Outcome::None);
        assert_eq!(Outcome::flatten(vec![Outcome::None, Outcome::None]), Outcome::None);
    }

    #[test]
    fn test_flatten_single_unwraps() {
        assert_eq!(
            Outcome::flatten(vec![Outcome::Single(int(1))]),
            Outcome::Single(int(1))
        );
        // A one-element tuple also unwraps.
        assert_eq!(
            Outcome::flatten(vec![Outcome::Many(vec![int(7)])]),
            Outcome::Single(int(7))
        );
        assert_eq!(
            Outcome::flatten(vec![Outcome::None, Outcome::Single(int(3)), Outcome::None]),
            Outcome::Single(int(3))
        );
    }

    #[test]
    fn test_flatten_splices_one_level_only() {
        let nested = Outcome::Many(vec![int(2), Value::List(vec![int(3), int(4)])]);
        let flat = Outcome::flatten(vec![Outcome::Single(int(1)), nested]);
        // The inner List survives untouched: splicing never recurses.
        assert_eq!(
            flat,
            Outcome::Many(vec![int(1), int(2), Value::List(vec![int(3), int(4)])])
        );
    }

    #[test]
    fn test_flatten_preserves_order() {
        let flat = Outcome::flatten(vec![
            Outcome::Many(vec![int(1), int(2)]),
            Outcome::Single(int(3)),
            Outcome::Many(vec![int(4)]),
        ]);
        assert_eq!(flat, Outcome::Many(vec![int(1), int(2), int(3), int(4)]));
    }

    #[test]
    fn test_args_round_trip() {
        assert_eq!(Outcome::from_args(&[]), Outcome::None);
        assert_eq!(Outcome::from_args(&[int(1)]), Outcome::Single(int(1)));
        assert_eq!(
            Outcome::from_args(&[int(1), int(2)]),
            Outcome::Many(vec![int(1), int(2)])
        );

        assert_eq!(Outcome::Many(vec![int(1), int(2)]).into_args(), vec![int(1), int(2)]);
        assert_eq!(Outcome::None.into_args(), Vec::<Value>::new());
    }

    #[test]
    fn test_into_value() {
        assert_eq!(Outcome::None.into_value(), Value::Missing);
        assert_eq!(
            Outcome::Many(vec![int(1), int(2)]).into_value(),
            Value::List(vec![int(1), int(2)])
        );
    }
}
