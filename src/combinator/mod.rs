//! The combinator algebra.
//!
//! Every combinator is an immutable value wrapping an ordered sequence
//! of units (plus kind-specific configuration), and is itself a unit of
//! work. Concatenation, slicing, and reversal always return a new
//! combinator; the wrapped sequence is fixed for a combinator's
//! lifetime.

pub mod effects;
pub mod fallback;
pub mod filter;
pub mod fork;
pub mod map;
pub mod pipe;
pub mod reduce;
pub mod route;

pub use effects::{Safe, SideEffects};
pub use fallback::{Fallback, FailureCallback};
pub use filter::{Filter, Split};
pub use fork::{Fork, ProcessFork, ThreadFork};
pub use map::{Map, ProcessMap, ThreadMap};
pub use pipe::Pipe;
pub use reduce::{Reduce, Sum};
pub use route::{Route, RouteSpec};

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::pool::Initializer;
use crate::unit::UnitObj;
use crate::value::Value;

/// Immutable ordered sequence of units, shared by every sequence-holding
/// combinator. All operations return new sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct UnitSeq {
    units: Vec<UnitObj>,
}

impl UnitSeq {
    pub fn new(units: impl IntoIterator<Item = UnitObj>) -> Self {
        UnitSeq {
            units: units.into_iter().collect(),
        }
    }

    /// Both sequences concatenated in order.
    pub fn concat(&self, other: &UnitSeq) -> UnitSeq {
        let mut units = self.units.clone();
        units.extend(other.units.iter().cloned());
        UnitSeq { units }
    }

    /// This sequence with one unit appended.
    pub fn with(&self, unit: UnitObj) -> UnitSeq {
        let mut units = self.units.clone();
        units.push(unit);
        UnitSeq { units }
    }

    pub fn at(&self, index: usize) -> Option<&UnitObj> {
        self.units.get(index)
    }

    /// A re-sliced copy. Out-of-range bounds clamp to the sequence.
    pub fn slice(&self, range: Range<usize>) -> UnitSeq {
        let start = range.start.min(self.units.len());
        let end = range.end.min(self.units.len()).max(start);
        UnitSeq {
            units: self.units[start..end].to_vec(),
        }
    }

    pub fn reversed(&self) -> UnitSeq {
        let mut units = self.units.clone();
        units.reverse();
        UnitSeq { units }
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

    pub fn as_slice(&self) -> &[UnitObj] {
        &self.units
    }
}

/// Write the multi-line diagnostic tree: a header line followed by one
/// indented `- ` entry per wrapped unit, recursing into nested
/// combinators.
pub(crate) fn describe_tree(
    f: &mut fmt::Formatter<'_>,
    header: &str,
    indent: usize,
    units: &[UnitObj],
) -> fmt::Result {
    write!(f, "{header}:")?;
    if units.is_empty() {
        return write!(f, " (empty)");
    }
    for unit in units {
        write!(f, "\n{:width$}- ", "", width = indent + 2)?;
        unit.describe(f, indent + 4)?;
    }
    Ok(())
}

/// Bridge a configured initializer unit into a pool startup hook. An
/// initializer failure cannot abort a worker that is already running,
/// so it is logged and the worker serves jobs anyway.
pub(crate) fn pool_initializer(
    configured: &Option<(UnitObj, Vec<Value>)>,
) -> Option<Initializer> {
    configured.as_ref().map(|(unit, args)| {
        let unit = unit.clone();
        let args = args.clone();
        let hook: Initializer = Arc::new(move || {
            if let Err(error) = unit.call(&args) {
                log::debug!("pool initializer {} failed: {error}", unit.name());
            }
        });
        hook
    })
}
