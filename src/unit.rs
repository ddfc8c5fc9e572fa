//! The opaque unit-of-work capability.
//!
//! A unit is anything invocable with positional `Value` arguments that
//! produces zero or more values. The core never inspects a unit beyond
//! invoking it, resolving its name, or comparing it for identity.
//! Combinators implement `Unit` themselves, which is what makes
//! arbitrary nesting work.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::outcome::Outcome;
use crate::value::Value;

/// Trait for units of work that combinators can wrap.
pub trait Unit: fmt::Debug + Send + Sync {
    /// Stable, human-readable label for this unit.
    ///
    /// Named functions resolve to their given name, anonymous closures
    /// to the placeholder `"lambda"`, and combinators to their kind
    /// label.
    fn name(&self) -> String;

    /// Invoke the unit with positional arguments.
    fn call(&self, args: &[Value]) -> Result<Outcome>;

    /// Structural equality against another unit. Defaults to false;
    /// combinators override this with element-wise comparison.
    /// Comparing across kinds is always false, never an error.
    fn eq_unit(&self, _other: &dyn Unit) -> bool {
        false
    }

    /// Reference to this unit as `Any` for safe downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Write the diagnostic representation at the given indent level.
    /// Leaf units are a single line; combinators recurse.
    fn describe(&self, f: &mut fmt::Formatter<'_>, _indent: usize) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Type-erased, cheaply cloneable handle to a unit of work.
///
/// Cloning shares the underlying unit, so a unit held by several
/// combinators (after concat or slicing) is the same object everywhere;
/// equality checks pointer identity first, then structural equality.
#[derive(Clone)]
pub struct UnitObj {
    inner: Arc<dyn Unit>,
}

impl UnitObj {
    /// Wrap any `Unit` implementation.
    pub fn new(unit: impl Unit + 'static) -> Self {
        UnitObj {
            inner: Arc::new(unit),
        }
    }

    /// A named native function returning one value.
    pub fn function<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        UnitObj::new(NativeFunction {
            name: Some(name.into()),
            f: Arc::new(move |args| f(args).map(Outcome::Single)),
        })
    }

    /// A named native function returning zero or more values.
    pub fn multi_function<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Outcome> + Send + Sync + 'static,
    {
        UnitObj::new(NativeFunction {
            name: Some(name.into()),
            f: Arc::new(f),
        })
    }

    /// An anonymous closure. Its resolved name is `"lambda"`.
    pub fn lambda<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        UnitObj::new(NativeFunction {
            name: None,
            f: Arc::new(move |args| f(args).map(Outcome::Single)),
        })
    }

    pub fn name(&self) -> String {
        self.inner.name()
    }

    pub fn call(&self, args: &[Value]) -> Result<Outcome> {
        self.inner.call(args)
    }

    /// Reference to the wrapped unit.
    pub fn as_unit(&self) -> &dyn Unit {
        self.inner.as_ref()
    }

    /// Attempt to downcast the wrapped unit to a concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    pub(crate) fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        self.inner.describe(f, indent)
    }
}

impl<T: Unit + 'static> From<T> for UnitObj {
    fn from(unit: T) -> Self {
        UnitObj::new(unit)
    }
}

impl fmt::Debug for UnitObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitObj({:?})", self.inner)
    }
}

impl fmt::Display for UnitObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

impl PartialEq for UnitObj {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.eq_unit(other.inner.as_ref())
    }
}

/// A native Rust closure wrapped as a unit of work.
struct NativeFunction {
    name: Option<String>,
    f: Arc<dyn Fn(&[Value]) -> Result<Outcome> + Send + Sync>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name())
    }
}

impl Unit for NativeFunction {
    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "lambda".to_string())
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        (self.f)(args)
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        // Closures have no structure to compare; identity of the
        // underlying function object is the only meaningful equality.
        match other.as_any().downcast_ref::<NativeFunction>() {
            Some(other) => {
                Arc::as_ptr(&self.f) as *const u8 == Arc::as_ptr(&other.f) as *const u8
            }
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
