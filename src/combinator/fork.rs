//! Fork and its concurrent variants: shared-input fan-out.
//!
//! All units receive the same arguments; results are collected in unit
//! order and flattened by the shared policy. The concurrent variants
//! acquire a worker pool per call and tear it down unconditionally
//! before anything — result or error — is returned.

use std::any::Any;
use std::fmt;
use std::ops::Range;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::outcome::Outcome;
use crate::pool::{await_in_order, ThreadPool, WorkerPool, DEFAULT_THREAD_WORKERS};
use crate::unit::{Unit, UnitObj};
use crate::value::Value;

use super::{describe_tree, pool_initializer, UnitSeq};

/// In-order, single-threaded fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct Fork {
    units: UnitSeq,
}

impl Fork {
    pub fn new(units: impl IntoIterator<Item = UnitObj>) -> Self {
        Fork {
            units: UnitSeq::new(units),
        }
    }

    pub fn concat(&self, other: &Fork) -> Fork {
        Fork {
            units: self.units.concat(&other.units),
        }
    }

    pub fn concat_unit(&self, unit: UnitObj) -> Fork {
        Fork {
            units: self.units.with(unit),
        }
    }

    pub fn try_concat(&self, other: &dyn Unit) -> Option<Fork> {
        other.as_any().downcast_ref::<Fork>().map(|o| self.concat(o))
    }

    pub fn at(&self, index: usize) -> Option<&UnitObj> {
        self.units.at(index)
    }

    pub fn slice(&self, range: Range<usize>) -> Fork {
        Fork {
            units: self.units.slice(range),
        }
    }

    pub fn reversed(&self) -> Fork {
        Fork {
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

impl Unit for Fork {
    fn name(&self) -> String {
        "Fork".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        let mut outcomes = Vec::with_capacity(self.units.len());
        for (index, unit) in self.units.iter().enumerate() {
            match unit.call(args) {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => {
                    return Err(Error::Fork {
                        index,
                        unit: unit.name(),
                        args: args.to_vec(),
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
            .downcast_ref::<Fork>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        describe_tree(f, "Fork", indent, self.units.as_slice())
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

/// Fan-out over a per-call thread pool.
///
/// Every unit is submitted to the pool with the same arguments; results
/// are awaited in submission order, so completion order never affects
/// the aggregate. The first failing submission (by submission order)
/// decides the error, and the pool is drained and joined before it
/// surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadFork {
    units: UnitSeq,
    pool_size: usize,
    timeout: Option<Duration>,
    initializer: Option<(UnitObj, Vec<Value>)>,
}

impl ThreadFork {
    pub fn new(units: impl IntoIterator<Item = UnitObj>) -> Self {
        ThreadFork {
            units: UnitSeq::new(units),
            pool_size: DEFAULT_THREAD_WORKERS,
            timeout: None,
            initializer: None,
        }
    }

    /// Set the worker count. Zero is rejected here, at construction.
    pub fn pool_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::PoolSize { size });
        }
        self.pool_size = size;
        Ok(self)
    }

    /// Per-result timeout; a late result fails its unit like any other
    /// error.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Unit run once per worker before it serves any unit, with the
    /// given arguments.
    pub fn initializer(mut self, unit: impl Into<UnitObj>, args: Vec<Value>) -> Self {
        self.initializer = Some((unit.into(), args));
        self
    }

    /// Concatenation keeps the left operand's configuration.
    pub fn concat(&self, other: &ThreadFork) -> ThreadFork {
        ThreadFork {
            units: self.units.concat(&other.units),
            ..self.clone()
        }
    }

    pub fn concat_unit(&self, unit: UnitObj) -> ThreadFork {
        ThreadFork {
            units: self.units.with(unit),
            ..self.clone()
        }
    }

    pub fn try_concat(&self, other: &dyn Unit) -> Option<ThreadFork> {
        other
            .as_any()
            .downcast_ref::<ThreadFork>()
            .map(|o| self.concat(o))
    }

    pub fn at(&self, index: usize) -> Option<&UnitObj> {
        self.units.at(index)
    }

    pub fn slice(&self, range: Range<usize>) -> ThreadFork {
        ThreadFork {
            units: self.units.slice(range),
            ..self.clone()
        }
    }

    pub fn reversed(&self) -> ThreadFork {
        ThreadFork {
            units: self.units.reversed(),
            ..self.clone()
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

impl Unit for ThreadFork {
    fn name(&self) -> String {
        "ThreadFork".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        if self.units.is_empty() {
            return Ok(Outcome::None);
        }

        let mut pool = ThreadPool::new(self.pool_size, pool_initializer(&self.initializer))?;
        let handles = self
            .units
            .iter()
            .map(|unit| {
                let unit = unit.clone();
                let call_args = args.to_vec();
                pool.submit(move || unit.call(&call_args))
            })
            .collect();
        let (outcomes, first_error) = await_in_order(handles, self.timeout);
        // Unconditional teardown: the queue closes and every worker is
        // joined before either arm below returns.
        pool.join();

        match first_error {
            Some((index, error)) => Err(Error::Fork {
                index,
                unit: self.units.at(index).map(UnitObj::name).unwrap_or_default(),
                args: args.to_vec(),
                source: Box::new(error),
            }),
            None => Ok(Outcome::flatten(outcomes)),
        }
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<ThreadFork>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let header = format!(
            "ThreadFork(pool_size={}, timeout={:?})",
            self.pool_size, self.timeout
        );
        describe_tree(f, &header, indent, self.units.as_slice())
    }
}

impl fmt::Display for ThreadFork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

/// Fan-out over a per-call worker pool for CPU-bound units.
///
/// Identical contract to [`ThreadFork`], with a smaller default pool
/// and worker recycling: `recycle_after(n)` makes each worker re-run
/// its initializer and drop worker-local state after n units.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessFork {
    units: UnitSeq,
    pool_size: usize,
    timeout: Option<Duration>,
    initializer: Option<(UnitObj, Vec<Value>)>,
    max_tasks: Option<usize>,
}

impl ProcessFork {
    pub fn new(units: impl IntoIterator<Item = UnitObj>) -> Self {
        ProcessFork {
            units: UnitSeq::new(units),
            pool_size: crate::pool::default_worker_count(),
            timeout: None,
            initializer: None,
            max_tasks: None,
        }
    }

    /// Set the worker count. Zero is rejected here, at construction.
    pub fn pool_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::PoolSize { size });
        }
        self.pool_size = size;
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn initializer(mut self, unit: impl Into<UnitObj>, args: Vec<Value>) -> Self {
        self.initializer = Some((unit.into(), args));
        self
    }

    /// Recycle each worker after `tasks` units; zero disables recycling.
    pub fn recycle_after(mut self, tasks: usize) -> Self {
        self.max_tasks = if tasks == 0 { None } else { Some(tasks) };
        self
    }

    pub fn concat(&self, other: &ProcessFork) -> ProcessFork {
        ProcessFork {
            units: self.units.concat(&other.units),
            ..self.clone()
        }
    }

    pub fn concat_unit(&self, unit: UnitObj) -> ProcessFork {
        ProcessFork {
            units: self.units.with(unit),
            ..self.clone()
        }
    }

    pub fn try_concat(&self, other: &dyn Unit) -> Option<ProcessFork> {
        other
            .as_any()
            .downcast_ref::<ProcessFork>()
            .map(|o| self.concat(o))
    }

    pub fn at(&self, index: usize) -> Option<&UnitObj> {
        self.units.at(index)
    }

    pub fn slice(&self, range: Range<usize>) -> ProcessFork {
        ProcessFork {
            units: self.units.slice(range),
            ..self.clone()
        }
    }

    pub fn reversed(&self) -> ProcessFork {
        ProcessFork {
            units: self.units.reversed(),
            ..self.clone()
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

impl Unit for ProcessFork {
    fn name(&self) -> String {
        "ProcessFork".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        if self.units.is_empty() {
            return Ok(Outcome::None);
        }

        let mut pool = WorkerPool::new(
            self.pool_size,
            pool_initializer(&self.initializer),
            self.max_tasks,
        )?;
        let handles = self
            .units
            .iter()
            .map(|unit| {
                let unit = unit.clone();
                let call_args = args.to_vec();
                pool.submit(move || unit.call(&call_args))
            })
            .collect();
        let (outcomes, first_error) = await_in_order(handles, self.timeout);
        pool.join();

        match first_error {
            Some((index, error)) => Err(Error::Fork {
                index,
                unit: self.units.at(index).map(UnitObj::name).unwrap_or_default(),
                args: args.to_vec(),
                source: Box::new(error),
            }),
            None => Ok(Outcome::flatten(outcomes)),
        }
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<ProcessFork>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let header = format!(
            "ProcessFork(pool_size={}, timeout={:?}, recycle={:?})",
            self.pool_size, self.timeout, self.max_tasks
        );
        describe_tree(f, &header, indent, self.units.as_slice())
    }
}

impl fmt::Display for ProcessFork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn constant(name: &str, value: i64) -> UnitObj {
        UnitObj::function(name.to_string(), move |_| Ok(int(value)))
    }

    fn raiser() -> UnitObj {
        UnitObj::function("raiser", |_| Err(Error::runtime("boom")))
    }

    #[test]
    fn test_fork_runs_all_units_with_same_args() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mk = |seen: Arc<AtomicUsize>| {
            UnitObj::function("probe", move |args| {
                assert_eq!(args, &[int(7)]);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(int(args.len() as i64))
            })
        };
        let fork = Fork::new([mk(Arc::clone(&seen)), mk(Arc::clone(&seen))]);
        fork.call(&[int(7)]).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fork_flattens_results() {
        let pair = UnitObj::multi_function("pair", |_| Ok(Outcome::Many(vec![int(2), int(3)])));
        let fork = Fork::new([constant("one", 1), pair]);
        assert_eq!(
            fork.call(&[]).unwrap(),
            Outcome::Many(vec![int(1), int(2), int(3)])
        );
    }

    #[test]
    fn test_fork_error_names_position() {
        let fork = Fork::new([constant("one", 1), raiser()]);
        match fork.call(&[int(9)]).unwrap_err() {
            Error::Fork { index, unit, args, .. } => {
                assert_eq!(index, 1);
                assert_eq!(unit, "raiser");
                assert_eq!(args, vec![int(9)]);
            }
            other => panic!("expected Fork error, got {other:?}"),
        }
    }

    #[test]
    fn test_thread_fork_preserves_submission_order() {
        let slow = UnitObj::function("slow", |_| {
            thread::sleep(Duration::from_millis(50));
            Ok(int(1))
        });
        let fast = UnitObj::function("fast", |_| Ok(int(2)));
        let fork = ThreadFork::new([slow, fast]).pool_size(2).unwrap();
        // fast finishes first, but slow's result still comes first.
        assert_eq!(fork.call(&[]).unwrap(), Outcome::Many(vec![int(1), int(2)]));
    }

    #[test]
    fn test_thread_fork_rejects_zero_pool_size() {
        let err = ThreadFork::new([constant("one", 1)]).pool_size(0).unwrap_err();
        assert!(matches!(err, Error::PoolSize { size: 0 }));
    }

    #[test]
    fn test_thread_fork_timeout_is_a_fork_error() {
        let stall = UnitObj::function("stall", |_| {
            thread::sleep(Duration::from_millis(100));
            Ok(int(0))
        });
        let fork = ThreadFork::new([stall])
            .pool_size(1)
            .unwrap()
            .timeout(Duration::from_millis(5));
        let err = fork.call(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fork);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_thread_fork_tears_pool_down_on_error() {
        // The workers capture clones of this Arc through the submitted
        // units; once call() returns, teardown must have dropped them.
        let witness = Arc::new(());
        let held = Arc::clone(&witness);
        let slow_ok = UnitObj::function("slow_ok", move |_| {
            let _held = &held;
            thread::sleep(Duration::from_millis(20));
            Ok(int(1))
        });
        let fork = ThreadFork::new([slow_ok, raiser()]).pool_size(2).unwrap();

        assert!(fork.call(&[]).is_err());
        drop(fork);
        assert_eq!(Arc::strong_count(&witness), 1);
    }

    #[test]
    fn test_thread_fork_first_submission_order_error_wins() {
        let late_fail = UnitObj::function("late_fail", |_| {
            thread::sleep(Duration::from_millis(40));
            Err(Error::runtime("late"))
        });
        let early_fail = UnitObj::function("early_fail", |_| Err(Error::runtime("early")));
        let fork = ThreadFork::new([late_fail, early_fail]).pool_size(2).unwrap();
        match fork.call(&[]).unwrap_err() {
            Error::Fork { index, unit, .. } => {
                assert_eq!(index, 0);
                assert_eq!(unit, "late_fail");
            }
            other => panic!("expected Fork error, got {other:?}"),
        }
    }

    #[test]
    fn test_process_fork_runs_and_flattens() {
        let fork = ProcessFork::new([constant("a", 1), constant("b", 2)])
            .pool_size(2)
            .unwrap();
        assert_eq!(fork.call(&[]).unwrap(), Outcome::Many(vec![int(1), int(2)]));
    }

    #[test]
    fn test_process_fork_initializer_and_recycling() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let init = UnitObj::function("init", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Missing)
        });

        let fork = ProcessFork::new([constant("a", 1), constant("b", 2)])
            .pool_size(1)
            .unwrap()
            .initializer(init, vec![])
            .recycle_after(1);
        fork.call(&[]).unwrap();
        // One startup run plus one recycle per served unit.
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concat_keeps_left_configuration() {
        let a = ThreadFork::new([constant("a", 1)])
            .pool_size(3)
            .unwrap()
            .timeout(Duration::from_millis(500));
        let b = ThreadFork::new([constant("b", 2)]);
        let joined = a.concat(&b);
        assert_eq!(joined.len(), 2);
        assert_eq!(a.len(), 1);
        assert_ne!(joined, b);
    }

    #[test]
    fn test_empty_concurrent_fork_is_no_value() {
        let fork = ThreadFork::new([]);
        assert_eq!(fork.call(&[int(1)]).unwrap(), Outcome::None);
    }
}
