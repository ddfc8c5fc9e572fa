//! Pipe: sequential chaining of units.

use std::any::Any;
use std::fmt;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::outcome::Outcome;
use crate::unit::{Unit, UnitObj};
use crate::value::Value;

use super::{describe_tree, UnitSeq};

/// Calls its units in order, feeding each result into the next: a tuple
/// result becomes multiple positional arguments, a single value becomes
/// one argument. The last result is returned. An empty Pipe is the
/// identity.
///
/// The first failure aborts the chain with a [`Error::Pipe`] carrying
/// the 0-based step index, the failing unit's name, and the arguments
/// that step received; no partial results surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    units: UnitSeq,
}

impl Pipe {
    pub fn new(units: impl IntoIterator<Item = UnitObj>) -> Self {
        Pipe {
            units: UnitSeq::new(units),
        }
    }

    /// A new Pipe with both sequences concatenated in order.
    pub fn concat(&self, other: &Pipe) -> Pipe {
        Pipe {
            units: self.units.concat(&other.units),
        }
    }

    /// A new Pipe with one unit appended.
    pub fn concat_unit(&self, unit: UnitObj) -> Pipe {
        Pipe {
            units: self.units.with(unit),
        }
    }

    /// Concatenate with another unit if it is also a Pipe; `None` is the
    /// recoverable refusal for incompatible operands.
    pub fn try_concat(&self, other: &dyn Unit) -> Option<Pipe> {
        other.as_any().downcast_ref::<Pipe>().map(|p| self.concat(p))
    }

    pub fn at(&self, index: usize) -> Option<&UnitObj> {
        self.units.at(index)
    }

    /// A re-sliced Pipe over the given step range.
    pub fn slice(&self, range: Range<usize>) -> Pipe {
        Pipe {
            units: self.units.slice(range),
        }
    }

    pub fn reversed(&self) -> Pipe {
        Pipe {
            units: self.units.reversed(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnitObj> {
        self.units.iter()
    }
}

impl Unit for Pipe {
    fn name(&self) -> String {
        "Pipe".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        let mut current = args.to_vec();
        for (step, unit) in self.units.iter().enumerate() {
            match unit.call(&current) {
                Ok(outcome) => current = outcome.into_args(),
                Err(error) => {
                    return Err(Error::Pipe {
                        step,
                        unit: unit.name(),
                        args: current,
                        source: Box::new(error),
                    })
                }
            }
        }
        Ok(Outcome::from_args(&current))
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<Pipe>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        describe_tree(f, "Pipe", indent, self.units.as_slice())
    }
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

impl<'a> IntoIterator for &'a Pipe {
    type Item = &'a UnitObj;
    type IntoIter = std::slice::Iter<'a, UnitObj>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn double() -> UnitObj {
        UnitObj::function("double", |args| match args {
            [Value::Integer(n)] => Ok(Value::Integer(n * 2)),
            _ => Err(Error::arity(1, args.len())),
        })
    }

    fn inc() -> UnitObj {
        UnitObj::function("inc", |args| match args {
            [Value::Integer(n)] => Ok(Value::Integer(n + 1)),
            _ => Err(Error::arity(1, args.len())),
        })
    }

    fn raiser() -> UnitObj {
        UnitObj::function("raiser", |_| Err(Error::runtime("boom")))
    }

    #[test]
    fn test_chain_feeds_results_forward() {
        let pipe = Pipe::new([double(), inc()]);
        let out = pipe.call(&[int(20)]).unwrap();
        assert_eq!(out, Outcome::Single(int(41)));
    }

    #[test]
    fn test_tuple_result_spreads_into_arguments() {
        let spread = UnitObj::multi_function("spread", |args| match args {
            [Value::Integer(n)] => Ok(Outcome::Many(vec![int(*n), int(n + 1)])),
            _ => Err(Error::arity(1, args.len())),
        });
        let add = UnitObj::function("add", |args| match args {
            [Value::Integer(a), Value::Integer(b)] => Ok(int(a + b)),
            _ => Err(Error::arity(2, args.len())),
        });
        let pipe = Pipe::new([spread, add]);
        assert_eq!(pipe.call(&[int(10)]).unwrap(), Outcome::Single(int(21)));
    }

    #[test]
    fn test_empty_pipe_is_identity() {
        let pipe = Pipe::new([]);
        assert_eq!(
            pipe.call(&[int(1), int(2)]).unwrap(),
            Outcome::Many(vec![int(1), int(2)])
        );
        assert_eq!(pipe.call(&[int(1)]).unwrap(), Outcome::Single(int(1)));
        assert_eq!(pipe.call(&[]).unwrap(), Outcome::None);
    }

    #[test]
    fn test_failure_carries_step_and_name() {
        let pipe = Pipe::new([double(), raiser(), inc()]);
        let err = pipe.call(&[int(1)]).unwrap_err();
        match err {
            Error::Pipe { step, unit, args, .. } => {
                assert_eq!(step, 1);
                assert_eq!(unit, "raiser");
                assert_eq!(args, vec![int(2)]);
            }
            other => panic!("expected Pipe error, got {other:?}"),
        }
    }

    #[test]
    fn test_concat_is_immutable() {
        let a = Pipe::new([double()]);
        let b = a.concat_unit(inc());
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_try_concat_refuses_other_kinds() {
        let pipe = Pipe::new([double()]);
        let fork = super::super::Fork::new([inc()]);
        assert!(pipe.try_concat(&fork).is_none());
        assert_eq!(pipe.try_concat(&Pipe::new([inc()])).unwrap().len(), 2);
    }

    #[test]
    fn test_slice_returns_same_kind() {
        let pipe = Pipe::new([double(), inc(), raiser()]);
        let sliced = pipe.slice(0..2);
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.call(&[int(3)]).unwrap(), Outcome::Single(int(7)));
    }

    #[test]
    fn test_nested_pipe_is_a_unit() {
        let inner = Pipe::new([double()]);
        let outer = Pipe::new([UnitObj::new(inner), inc()]);
        assert_eq!(outer.call(&[int(5)]).unwrap(), Outcome::Single(int(11)));
    }

    #[test]
    fn test_equality_is_structural_within_kind() {
        let d = double();
        let a = Pipe::new([d.clone(), inc()]);
        let b = Pipe::new([d, inc()]);
        // Same first unit, but the two `inc` closures are distinct.
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_error_kind_is_pipe() {
        let pipe = Pipe::new([raiser()]);
        assert_eq!(pipe.call(&[]).unwrap_err().kind(), ErrorKind::Pipe);
    }
}
