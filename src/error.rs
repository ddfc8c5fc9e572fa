//! Error taxonomy for the combinator core.
//!
//! Each combinator kind has one dedicated error variant carrying the
//! failing unit's name, its position where one exists, and the arguments
//! it received. Underlying errors are never discarded; they chain through
//! boxed `source` fields.

use thiserror::Error;

use crate::value::Value;

pub type Result<T> = std::result::Result<T, Error>;

/// Closed set of error discriminants.
///
/// `Raised` unit failures carry one of the leaf kinds; every combinator
/// variant maps to its own kind. Catch filters (Fallback, Safe) compare
/// by kind, never by message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    Type,
    Index,
    Arity,
    Runtime,
    Io,
    Pipe,
    Fork,
    Route,
    Fallback,
    Map,
    Filter,
    Split,
    Reduce,
    SideEffects,
    Pool,
}

/// One captured failure inside a Fallback chain.
#[derive(Debug, Clone)]
pub struct Failure {
    /// Resolved name of the unit that failed.
    pub unit: String,
    /// Arguments the unit received.
    pub args: Vec<Value>,
    /// The error it failed with.
    pub error: Box<Error>,
}

/// Errors raised by units of work and by the combinators wrapping them.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A failure raised directly by a unit of work.
    #[error("{kind:?} error: {message}")]
    Raised { kind: ErrorKind, message: String },

    #[error("Pipe step {step} ({unit}) failed with args {args:?}: {source}")]
    Pipe {
        step: usize,
        unit: String,
        args: Vec<Value>,
        source: Box<Error>,
    },

    #[error("Fork unit {index} ({unit}) failed with args {args:?}: {source}")]
    Fork {
        index: usize,
        unit: String,
        args: Vec<Value>,
        source: Box<Error>,
    },

    #[error("Route unit {index} ({unit}) failed with routed args {args:?}: {source}")]
    Route {
        index: usize,
        unit: String,
        args: Vec<Value>,
        source: Box<Error>,
    },

    /// Too few call arguments for the routes a Route references.
    #[error("Route requires at least {required} arguments, got {got}")]
    RouteArity { required: usize, got: usize },

    /// Route/unit count mismatch at construction. Permanent.
    #[error("Route count {routes} does not match unit count {units}")]
    RouteShape { routes: usize, units: usize },

    /// A route referenced a negative argument index at construction.
    #[error("Route index {index} is negative")]
    RouteIndex { index: i64 },

    /// Every unit in a Fallback chain failed.
    #[error("all {} fallback units failed", failures.len())]
    FallbackExhausted { failures: Vec<Failure> },

    #[error("Map transform {unit} failed at index {index} on value {value}: {source}")]
    Map {
        index: usize,
        value: Value,
        unit: String,
        source: Box<Error>,
    },

    /// The Map result wrapper itself failed.
    #[error("Map wrapper {unit} failed: {source}")]
    MapWrapper { unit: String, source: Box<Error> },

    #[error("Filter predicate failed at index {index} on value {value}: {source}")]
    Filter {
        index: usize,
        value: Value,
        source: Box<Error>,
    },

    #[error("Split predicate failed at index {index} on value {value}: {source}")]
    Split {
        index: usize,
        value: Value,
        source: Box<Error>,
    },

    #[error("Reduce unit {unit} failed folding index {index}: {source}")]
    Reduce {
        index: usize,
        unit: String,
        source: Box<Error>,
    },

    #[error("SideEffects unit {index} ({unit}) failed with args {args:?}: {source}")]
    SideEffects {
        index: usize,
        unit: String,
        args: Vec<Value>,
        source: Box<Error>,
    },

    /// Worker-pool sizes are validated at construction; zero is rejected.
    #[error("invalid worker pool size: {size}")]
    PoolSize { size: usize },
}

impl Error {
    /// A runtime failure with a free-form message.
    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Raised {
            kind: ErrorKind::Runtime,
            message: message.into(),
        }
    }

    /// A type mismatch.
    pub fn type_error(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::Raised {
            kind: ErrorKind::Type,
            message: format!("expected {}, got {}", expected.into(), actual.into()),
        }
    }

    /// An argument-count mismatch.
    pub fn arity(expected: usize, actual: usize) -> Self {
        Error::Raised {
            kind: ErrorKind::Arity,
            message: format!("expected {expected} arguments, got {actual}"),
        }
    }

    /// An out-of-bounds access.
    pub fn index(index: i64, length: usize) -> Self {
        Error::Raised {
            kind: ErrorKind::Index,
            message: format!("index {index} out of bounds for length {length}"),
        }
    }

    /// A unit failure with an explicit kind, for callers building their
    /// own discriminated failures.
    pub fn raised(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error::Raised {
            kind,
            message: message.into(),
        }
    }

    /// A per-result timeout. Deliberately not a category of its own: the
    /// owning combinator wraps it like any other failing unit.
    pub fn timeout(elapsed: std::time::Duration) -> Self {
        Error::runtime(format!("timed out after {elapsed:?}"))
    }

    /// The discriminant used by catch filters.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Raised { kind, .. } => *kind,
            Error::Pipe { .. } => ErrorKind::Pipe,
            Error::Fork { .. } => ErrorKind::Fork,
            Error::Route { .. } | Error::RouteArity { .. } => ErrorKind::Route,
            Error::RouteShape { .. } | Error::RouteIndex { .. } => ErrorKind::Route,
            Error::FallbackExhausted { .. } => ErrorKind::Fallback,
            Error::Map { .. } | Error::MapWrapper { .. } => ErrorKind::Map,
            Error::Filter { .. } => ErrorKind::Filter,
            Error::Split { .. } => ErrorKind::Split,
            Error::Reduce { .. } => ErrorKind::Reduce,
            Error::SideEffects { .. } => ErrorKind::SideEffects,
            Error::PoolSize { .. } => ErrorKind::Pool,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Raised {
            kind: ErrorKind::Io,
            message: err.to_string(),
        }
    }
}

/// Which error kinds a Fallback or Safe swallows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CatchFilter {
    /// Catch everything. The default.
    #[default]
    All,
    /// Catch only the listed kinds; anything else propagates untouched.
    Kinds(Vec<ErrorKind>),
}

impl CatchFilter {
    pub fn matches(&self, error: &Error) -> bool {
        match self {
            CatchFilter::All => true,
            CatchFilter::Kinds(kinds) => kinds.contains(&error.kind()),
        }
    }
}
