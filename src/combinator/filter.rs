//! Filter and Split: predicate-driven selection over one list.

use std::any::Any;
use std::fmt;

use crate::error::{Error, Result};
use crate::outcome::Outcome;
use crate::unit::{Unit, UnitObj};
use crate::value::Value;

fn items(args: &[Value]) -> Result<&[Value]> {
    match args {
        [Value::List(items)] => Ok(items),
        [other] => Err(Error::type_error("List", other.type_name())),
        _ => Err(Error::arity(1, args.len())),
    }
}

/// Evaluate the predicate for one element. `None` tests the element's
/// own truthiness.
fn passes(predicate: &Option<UnitObj>, item: &Value) -> Result<bool> {
    match predicate {
        None => Ok(item.is_truthy()),
        Some(unit) => Ok(unit.call(std::slice::from_ref(item))?.into_value().is_truthy()),
    }
}

fn wrap(wrapper: &Option<UnitObj>, kept: Vec<Value>) -> Result<Value> {
    match wrapper {
        None => Ok(Value::List(kept)),
        Some(wrapper) => Ok(wrapper.call(&kept)?.into_value()),
    }
}

/// Keeps the elements of one list a predicate accepts.
///
/// Eager: every element is tested before anything is wrapped, so a
/// predicate failure surfaces before any partial result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    predicate: Option<UnitObj>,
    wrapper: Option<UnitObj>,
}

impl Filter {
    /// Truthiness filter: keeps the elements that are truthy themselves.
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn predicate(mut self, predicate: impl Into<UnitObj>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn wrapper(mut self, wrapper: impl Into<UnitObj>) -> Self {
        self.wrapper = Some(wrapper.into());
        self
    }
}

impl Unit for Filter {
    fn name(&self) -> String {
        "Filter".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        let items = items(args)?;
        let mut kept = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match passes(&self.predicate, item) {
                Ok(true) => kept.push(item.clone()),
                Ok(false) => {}
                Err(error) => {
                    return Err(Error::Filter {
                        index,
                        value: item.clone(),
                        source: Box::new(error),
                    })
                }
            }
        }
        Ok(Outcome::Single(wrap(&self.wrapper, kept)?))
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<Filter>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match &self.predicate {
            None => write!(f, "Filter: truthy"),
            Some(predicate) => {
                write!(f, "Filter: ")?;
                predicate.describe(f, indent + 2)
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

/// Partitions one list into the kept and rejected sides of a predicate.
/// Returns `Outcome::Many([kept, rejected])`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Split {
    predicate: Option<UnitObj>,
    wrapper: Option<UnitObj>,
}

impl Split {
    pub fn new() -> Self {
        Split::default()
    }

    pub fn predicate(mut self, predicate: impl Into<UnitObj>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn wrapper(mut self, wrapper: impl Into<UnitObj>) -> Self {
        self.wrapper = Some(wrapper.into());
        self
    }
}

impl Unit for Split {
    fn name(&self) -> String {
        "Split".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        let items = items(args)?;
        let mut kept = Vec::new();
        let mut rejected = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match passes(&self.predicate, item) {
                Ok(true) => kept.push(item.clone()),
                Ok(false) => rejected.push(item.clone()),
                Err(error) => {
                    return Err(Error::Split {
                        index,
                        value: item.clone(),
                        source: Box::new(error),
                    })
                }
            }
        }
        Ok(Outcome::Many(vec![
            wrap(&self.wrapper, kept)?,
            wrap(&self.wrapper, rejected)?,
        ]))
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<Split>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match &self.predicate {
            None => write!(f, "Split: truthy"),
            Some(predicate) => {
                write!(f, "Split: ")?;
                predicate.describe(f, indent + 2)
            }
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ints(ns: &[i64]) -> Value {
        Value::List(ns.iter().copied().map(Value::Integer).collect())
    }

    fn is_even() -> UnitObj {
        UnitObj::function("is_even", |args| match args {
            [Value::Integer(n)] => Ok(Value::Boolean(n % 2 == 0)),
            other => Err(Error::type_error("Integer", format!("{other:?}"))),
        })
    }

    #[test]
    fn test_filter_with_predicate_unit() {
        let filter = Filter::new().predicate(is_even());
        let out = filter.call(&[ints(&[1, 2, 3, 4, 5])]).unwrap();
        assert_eq!(out, Outcome::Single(ints(&[2, 4])));
    }

    #[test]
    fn test_default_predicate_is_truthiness() {
        let filter = Filter::new();
        let input = Value::List(vec![
            Value::Integer(0),
            Value::Integer(7),
            Value::Str(String::new()),
            Value::Str("x".to_string()),
            Value::Missing,
            Value::Boolean(true),
        ]);
        let out = filter.call(&[input]).unwrap();
        assert_eq!(
            out,
            Outcome::Single(Value::List(vec![
                Value::Integer(7),
                Value::Str("x".to_string()),
                Value::Boolean(true),
            ]))
        );
    }

    #[test]
    fn test_predicate_outcome_is_truthy_tested() {
        // A predicate returning a non-Boolean still works by truthiness.
        let identity = UnitObj::function("identity", |args| Ok(args[0].clone()));
        let filter = Filter::new().predicate(identity);
        let out = filter.call(&[ints(&[0, 3, 0, 9])]).unwrap();
        assert_eq!(out, Outcome::Single(ints(&[3, 9])));
    }

    #[test]
    fn test_filter_failure_names_index_and_value() {
        let filter = Filter::new().predicate(is_even());
        let input = Value::List(vec![Value::Integer(2), Value::Str("oops".to_string())]);
        match filter.call(&[input]).unwrap_err() {
            Error::Filter { index, value, .. } => {
                assert_eq!(index, 1);
                assert_eq!(value, Value::Str("oops".to_string()));
            }
            other => panic!("expected Filter error, got {other:?}"),
        }
    }

    #[test]
    fn test_filter_rejects_non_list() {
        let err = Filter::new().call(&[Value::Integer(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_split_partitions_in_order() {
        let split = Split::new().predicate(is_even());
        let out = split.call(&[ints(&[1, 2, 3, 4])]).unwrap();
        assert_eq!(out, Outcome::Many(vec![ints(&[2, 4]), ints(&[1, 3])]));
    }

    #[test]
    fn test_split_of_empty_list() {
        let split = Split::new();
        let out = split.call(&[ints(&[])]).unwrap();
        assert_eq!(out, Outcome::Many(vec![ints(&[]), ints(&[])]));
    }

    #[test]
    fn test_split_failure_is_a_split_error() {
        let split = Split::new().predicate(is_even());
        let input = Value::List(vec![Value::Missing]);
        let err = split.call(&[input]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Split);
    }

    #[test]
    fn test_custom_wrapper_applies_to_both_sides() {
        let count = UnitObj::function("count", |args| Ok(Value::Integer(args.len() as i64)));
        let split = Split::new().predicate(is_even()).wrapper(count);
        let out = split.call(&[ints(&[1, 2, 3, 4, 5])]).unwrap();
        assert_eq!(
            out,
            Outcome::Many(vec![Value::Integer(2), Value::Integer(3)])
        );
    }
}
