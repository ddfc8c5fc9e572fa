//! Reduce and Sum: leftward folds over one list.

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

/// Folds a binary unit leftward over one list.
///
/// Without a seed the first element seeds the fold and an empty input
/// is a type error; with a seed an empty input yields the seed.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduce {
    unit: UnitObj,
    seed: Option<Value>,
}

impl Reduce {
    pub fn new(unit: impl Into<UnitObj>) -> Self {
        Reduce {
            unit: unit.into(),
            seed: None,
        }
    }

    pub fn seed(mut self, seed: Value) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn unit(&self) -> &UnitObj {
        &self.unit
    }

    fn fold(&self, items: &[Value]) -> Result<Value> {
        let (mut acc, rest, mut index) = match (&self.seed, items) {
            (Some(seed), rest) => (seed.clone(), rest, 0),
            (None, [first, rest @ ..]) => (first.clone(), rest, 1),
            (None, []) => {
                return Err(Error::type_error("non-empty List", "empty List"));
            }
        };
        for item in rest {
            match self.unit.call(&[acc, item.clone()]) {
                Ok(outcome) => acc = outcome.into_value(),
                Err(error) => {
                    return Err(Error::Reduce {
                        index,
                        unit: self.unit.name(),
                        source: Box::new(error),
                    })
                }
            }
            index += 1;
        }
        Ok(acc)
    }
}

impl Unit for Reduce {
    fn name(&self) -> String {
        "Reduce".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        Ok(Outcome::Single(self.fold(items(args)?)?))
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<Reduce>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "Reduce: ")?;
        self.unit.describe(f, indent + 2)?;
        if let Some(seed) = &self.seed {
            write!(f, " (seed {seed})")?;
        }
        Ok(())
    }
}

impl fmt::Display for Reduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

/// Reduce specialized to addition, with numeric promotion and string
/// and list concatenation per [`Value::checked_add`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sum {
    seed: Option<Value>,
}

impl Sum {
    pub fn new() -> Self {
        Sum::default()
    }

    pub fn seed(mut self, seed: Value) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Unit for Sum {
    fn name(&self) -> String {
        "Sum".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        let items = items(args)?;
        let (mut acc, rest, mut index) = match (&self.seed, items) {
            (Some(seed), rest) => (seed.clone(), rest, 0),
            (None, [first, rest @ ..]) => (first.clone(), rest, 1),
            (None, []) => {
                return Err(Error::type_error("non-empty List", "empty List"));
            }
        };
        for item in rest {
            acc = acc.checked_add(item).map_err(|error| Error::Reduce {
                index,
                unit: self.name(),
                source: Box::new(error),
            })?;
            index += 1;
        }
        Ok(Outcome::Single(acc))
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<Sum>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for Sum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.seed {
            Some(seed) => write!(f, "Sum (seed {seed})"),
            None => write!(f, "Sum"),
        }
    }
}
