//! Route: selective-argument fan-out.
//!
//! Each unit is paired with a route naming which of the caller's
//! incoming arguments, in order, feed it. Reordering and duplication
//! are allowed; an empty route forwards nothing.

use std::any::Any;
use std::fmt;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::outcome::Outcome;
use crate::unit::{Unit, UnitObj};
use crate::value::Value;

use super::UnitSeq;

/// Construction-time route description. Bare integers promote to
/// one-element routes.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteSpec {
    Index(i64),
    Select(Vec<i64>),
}

impl From<i64> for RouteSpec {
    fn from(index: i64) -> Self {
        RouteSpec::Index(index)
    }
}

impl From<Vec<i64>> for RouteSpec {
    fn from(indices: Vec<i64>) -> Self {
        RouteSpec::Select(indices)
    }
}

impl RouteSpec {
    /// Coerce into validated non-negative argument indices.
    fn resolve(&self) -> Result<Vec<usize>> {
        let indices = match self {
            RouteSpec::Index(index) => std::slice::from_ref(index),
            RouteSpec::Select(indices) => indices.as_slice(),
        };
        indices
            .iter()
            .map(|&index| {
                usize::try_from(index).map_err(|_| Error::RouteIndex { index })
            })
            .collect()
    }
}

/// Ordered (route, unit) pairs over the caller's arguments.
///
/// Construction validates that route count equals unit count and that
/// every index is non-negative; a violation is permanent and
/// non-retryable. Invocation requires at least as many arguments as the
/// highest referenced index plus one.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    routes: Vec<Vec<usize>>,
    units: UnitSeq,
}

impl Route {
    pub fn new(
        routes: impl IntoIterator<Item = RouteSpec>,
        units: impl IntoIterator<Item = UnitObj>,
    ) -> Result<Self> {
        let specs: Vec<RouteSpec> = routes.into_iter().collect();
        let units = UnitSeq::new(units);
        if specs.len() != units.len() {
            return Err(Error::RouteShape {
                routes: specs.len(),
                units: units.len(),
            });
        }
        let routes = specs
            .iter()
            .map(RouteSpec::resolve)
            .collect::<Result<Vec<_>>>()?;
        Ok(Route { routes, units })
    }

    /// Fewest call arguments any invocation can succeed with.
    pub fn min_args(&self) -> usize {
        self.routes
            .iter()
            .flatten()
            .max()
            .map(|&highest| highest + 1)
            .unwrap_or(0)
    }

    /// Both route tables and unit sequences concatenated pairwise.
    pub fn concat(&self, other: &Route) -> Route {
        let mut routes = self.routes.clone();
        routes.extend(other.routes.iter().cloned());
        Route {
            routes,
            units: self.units.concat(&other.units),
        }
    }

    pub fn try_concat(&self, other: &dyn Unit) -> Option<Route> {
        other
            .as_any()
            .downcast_ref::<Route>()
            .map(|o| self.concat(o))
    }

    pub fn at(&self, index: usize) -> Option<&UnitObj> {
        self.units.at(index)
    }

    /// The route feeding the unit at `index`.
    pub fn route_at(&self, index: usize) -> Option<&[usize]> {
        self.routes.get(index).map(Vec::as_slice)
    }

    /// A re-sliced Route; pairs stay together.
    pub fn slice(&self, range: Range<usize>) -> Route {
        let start = range.start.min(self.routes.len());
        let end = range.end.min(self.routes.len()).max(start);
        Route {
            routes: self.routes[start..end].to_vec(),
            units: self.units.slice(start..end),
        }
    }

    pub fn reversed(&self) -> Route {
        let mut routes = self.routes.clone();
        routes.reverse();
        Route {
            routes,
            units: self.units.reversed(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[usize], &UnitObj)> {
        self.routes
            .iter()
            .map(Vec::as_slice)
            .zip(self.units.iter())
    }
}

impl Unit for Route {
    fn name(&self) -> String {
        "Route".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        let required = self.min_args();
        if args.len() < required {
            return Err(Error::RouteArity {
                required,
                got: args.len(),
            });
        }

        let mut outcomes = Vec::with_capacity(self.units.len());
        for (index, (route, unit)) in self.iter().enumerate() {
            let selected: Vec<Value> = route.iter().map(|&i| args[i].clone()).collect();
            match unit.call(&selected) {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => {
                    return Err(Error::Route {
                        index,
                        unit: unit.name(),
                        args: selected,
                        source: Box::new(error),
                    })
                }
            }
        }
        Ok(Outcome::flatten(outcomes))
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<Route>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "Route:")?;
        if self.is_empty() {
            return write!(f, " (empty)");
        }
        for (route, unit) in self.iter() {
            write!(f, "\n{:width$}- {route:?} ", "", width = indent + 2)?;
            unit.describe(f, indent + 4)?;
        }
        Ok(())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}
