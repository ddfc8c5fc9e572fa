//! Immutable combinators for composing units of work.
//!
//! A unit of work is anything implementing [`Unit`]: a named function,
//! a closure wrapped by [`UnitObj::function`], or another combinator.
//! Combinators hold their units for life and return new values from
//! every structural operation, so a composed pipeline can be shared
//! freely across threads.
//!
//! ```
//! use plumb::{Pipe, Unit, UnitObj, Value};
//!
//! let double = UnitObj::function("double", |args| match args {
//!     [Value::Integer(n)] => Ok(Value::Integer(n * 2)),
//!     other => Err(plumb::Error::type_error("Integer", format!("{other:?}"))),
//! });
//! let pipe = Pipe::new([double.clone(), double]);
//! let out = pipe.call(&[Value::Integer(3)]).unwrap();
//! assert_eq!(out.into_value(), Value::Integer(12));
//! ```

pub mod combinator;
pub mod error;
pub mod outcome;
pub mod pool;
pub mod unit;
pub mod value;

pub use combinator::{
    Fallback, FailureCallback, Filter, Fork, Map, Pipe, ProcessFork, ProcessMap, Reduce, Route,
    RouteSpec, Safe, SideEffects, Split, Sum, ThreadFork, ThreadMap,
};
pub use error::{CatchFilter, Error, ErrorKind, Failure, Result};
pub use outcome::Outcome;
pub use unit::{Unit, UnitObj};
pub use value::Value;
