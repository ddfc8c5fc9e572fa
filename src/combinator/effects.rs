//! SideEffects and Safe: effect sequencing and error capture.

use std::any::Any;
use std::fmt;
use std::ops::Range;

use crate::error::{CatchFilter, Error, Result};
use crate::outcome::Outcome;
use crate::unit::{Unit, UnitObj};
use crate::value::Value;

use super::{describe_tree, UnitSeq};

/// Invokes every unit with the same arguments purely for effect, then
/// returns the original input unchanged. The units' results are
/// discarded; their errors are not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SideEffects {
    units: UnitSeq,
}

impl SideEffects {
    pub fn new(units: impl IntoIterator<Item = UnitObj>) -> Self {
        SideEffects {
            units: UnitSeq::new(units),
        }
    }

    pub fn concat(&self, other: &SideEffects) -> SideEffects {
        SideEffects {
            units: self.units.concat(&other.units),
        }
    }

    pub fn with(&self, unit: UnitObj) -> SideEffects {
        SideEffects {
            units: self.units.with(unit),
        }
    }

    pub fn try_concat(&self, other: &dyn Unit) -> Option<SideEffects> {
        other
            .as_any()
            .downcast_ref::<SideEffects>()
            .map(|o| self.concat(o))
    }

    pub fn at(&self, index: usize) -> Option<&UnitObj> {
        self.units.at(index)
    }

    pub fn slice(&self, range: Range<usize>) -> SideEffects {
        SideEffects {
            units: self.units.slice(range),
        }
    }

    pub fn reversed(&self) -> SideEffects {
        SideEffects {
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

impl Unit for SideEffects {
    fn name(&self) -> String {
        "SideEffects".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        for (index, unit) in self.units.iter().enumerate() {
            if let Err(error) = unit.call(args) {
                return Err(Error::SideEffects {
                    index,
                    unit: unit.name(),
                    args: args.to_vec(),
                    source: Box::new(error),
                });
            }
        }
        Ok(Outcome::from_args(args))
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<SideEffects>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        describe_tree(f, "SideEffects", indent, self.units.as_slice())
    }
}

impl fmt::Display for SideEffects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

/// Converts a matching error from the wrapped unit into a returned
/// `Value::Failure` instead of raising it. Non-matching errors
/// propagate untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Safe {
    unit: UnitObj,
    catch: CatchFilter,
}

impl Safe {
    pub fn new(unit: impl Into<UnitObj>) -> Self {
        Safe {
            unit: unit.into(),
            catch: CatchFilter::All,
        }
    }

    pub fn catch(mut self, filter: CatchFilter) -> Self {
        self.catch = filter;
        self
    }

    pub fn unit(&self) -> &UnitObj {
        &self.unit
    }
}

impl Unit for Safe {
    fn name(&self) -> String {
        "Safe".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        match self.unit.call(args) {
            Ok(outcome) => Ok(outcome),
            Err(error) if self.catch.matches(&error) => {
                Ok(Outcome::Single(Value::Failure {
                    kind: error.kind(),
                    message: error.to_string(),
                }))
            }
            Err(error) => Err(error),
        }
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<Safe>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "Safe: ")?;
        self.unit.describe(f, indent + 2)
    }
}

impl fmt::Display for Safe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}
