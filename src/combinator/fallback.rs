//! Fallback: try units in order until one succeeds.

use std::any::Any;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{CatchFilter, Error, Failure, Result};
use crate::outcome::Outcome;
use crate::unit::{Unit, UnitObj};
use crate::value::Value;

use super::{describe_tree, UnitSeq};

/// Observer invoked once per caught failure, before the next unit is
/// tried. Runs on the calling thread.
pub type FailureCallback = Arc<Mutex<dyn FnMut(&str, &[Value], &Error) + Send>>;

/// Units tried left to right with the caller's arguments; the first
/// success wins. Errors matching `catch` are recorded and swallowed,
/// anything else propagates untouched.
#[derive(Clone)]
pub struct Fallback {
    units: UnitSeq,
    catch: CatchFilter,
    on_failure: Option<FailureCallback>,
}

impl Fallback {
    pub fn new(units: impl IntoIterator<Item = UnitObj>) -> Self {
        Fallback {
            units: UnitSeq::new(units),
            catch: CatchFilter::All,
            on_failure: None,
        }
    }

    /// Restrict which error kinds are swallowed.
    pub fn catch(mut self, filter: CatchFilter) -> Self {
        self.catch = filter;
        self
    }

    /// Observe each caught failure (unit name, arguments, error).
    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&str, &[Value], &Error) + Send + 'static,
    {
        self.on_failure = Some(Arc::new(Mutex::new(callback)));
        self
    }

    pub fn concat(&self, other: &Fallback) -> Fallback {
        Fallback {
            units: self.units.concat(&other.units),
            catch: self.catch.clone(),
            on_failure: self.on_failure.clone(),
        }
    }

    pub fn with(&self, unit: UnitObj) -> Fallback {
        Fallback {
            units: self.units.with(unit),
            catch: self.catch.clone(),
            on_failure: self.on_failure.clone(),
        }
    }

    pub fn try_concat(&self, other: &dyn Unit) -> Option<Fallback> {
        other
            .as_any()
            .downcast_ref::<Fallback>()
            .map(|o| self.concat(o))
    }

    pub fn at(&self, index: usize) -> Option<&UnitObj> {
        self.units.at(index)
    }

    pub fn slice(&self, range: Range<usize>) -> Fallback {
        Fallback {
            units: self.units.slice(range),
            catch: self.catch.clone(),
            on_failure: self.on_failure.clone(),
        }
    }

    pub fn reversed(&self) -> Fallback {
        Fallback {
            units: self.units.reversed(),
            catch: self.catch.clone(),
            on_failure: self.on_failure.clone(),
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

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback")
            .field("units", &self.units)
            .field("catch", &self.catch)
            .field("on_failure", &self.on_failure.as_ref().map(|_| ".."))
            .finish()
    }
}

impl PartialEq for Fallback {
    fn eq(&self, other: &Self) -> bool {
        // The callback is an observer and does not affect behavior.
        self.units == other.units && self.catch == other.catch
    }
}

impl Unit for Fallback {
    fn name(&self) -> String {
        "Fallback".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        if self.units.is_empty() {
            return Ok(Outcome::from_args(args));
        }

        let mut failures = Vec::new();
        for unit in self.units.iter() {
            match unit.call(args) {
                Ok(outcome) => return Ok(Outcome::flatten(vec![outcome])),
                Err(error) if self.catch.matches(&error) => {
                    if let Some(callback) = &self.on_failure {
                        let mut callback = callback.lock();
                        (*callback)(&unit.name(), args, &error);
                    }
                    failures.push(Failure {
                        unit: unit.name(),
                        args: args.to_vec(),
                        error: Box::new(error),
                    });
                }
                Err(error) => return Err(error),
            }
        }
        Err(Error::FallbackExhausted { failures })
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<Fallback>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        describe_tree(f, "Fallback", indent, self.units.as_slice())
    }
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}
