//! Map: element-wise transformation over list arguments.
//!
//! Every variant is called with one or more `Value::List` arguments and
//! applies its transform across corresponding elements, stopping at the
//! shortest input. Evaluation is eager; the optional wrapper sees the
//! complete result sequence or nothing at all.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::outcome::Outcome;
use crate::pool::{await_in_order, ThreadPool, WorkerPool, DEFAULT_THREAD_WORKERS};
use crate::unit::{Unit, UnitObj};
use crate::value::Value;

use super::pool_initializer;

/// Validate the list arguments and transpose them into per-element
/// rows, zipping to the shortest input.
fn rows(args: &[Value]) -> Result<Vec<Vec<Value>>> {
    if args.is_empty() {
        return Err(Error::arity(1, 0));
    }
    let mut lists = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Value::List(items) => lists.push(items),
            other => return Err(Error::type_error("List", other.type_name())),
        }
    }
    let shortest = lists.iter().map(|items| items.len()).min().unwrap_or(0);
    Ok((0..shortest)
        .map(|i| lists.iter().map(|items| items[i].clone()).collect())
        .collect())
}

/// The element a Map error reports: the bare value for a single input
/// list, the whole row otherwise.
fn element(row: &[Value]) -> Value {
    match row {
        [single] => single.clone(),
        many => Value::List(many.to_vec()),
    }
}

fn map_error(index: usize, row: &[Value], unit: &UnitObj, source: Error) -> Error {
    Error::Map {
        index,
        value: element(row),
        unit: unit.name(),
        source: Box::new(source),
    }
}

/// Run the wrapper over the settled results, or rebuild a list.
fn wrap(wrapper: &Option<UnitObj>, results: Vec<Value>) -> Result<Outcome> {
    match wrapper {
        None => Ok(Outcome::Single(Value::List(results))),
        Some(wrapper) => wrapper.call(&results).map_err(|error| Error::MapWrapper {
            unit: wrapper.name(),
            source: Box::new(error),
        }),
    }
}

/// Apply `transform` to one contiguous run of rows. `start` is the
/// global index of the first row, so errors report positions in the
/// original input.
fn transform_rows(
    transform: &UnitObj,
    start: usize,
    rows: &[Vec<Value>],
) -> Result<Outcome> {
    let mut values = Vec::with_capacity(rows.len());
    for (offset, row) in rows.iter().enumerate() {
        match transform.call(row) {
            Ok(outcome) => values.push(outcome.into_value()),
            Err(error) => return Err(map_error(start + offset, row, transform, error)),
        }
    }
    Ok(Outcome::Many(values))
}

/// Sequential element-wise map.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    transform: UnitObj,
    wrapper: Option<UnitObj>,
}

impl Map {
    pub fn new(transform: impl Into<UnitObj>) -> Self {
        Map {
            transform: transform.into(),
            wrapper: None,
        }
    }

    /// Replace the default list-rebuilding wrapper. The wrapper is
    /// called once, with every settled result as its arguments.
    pub fn wrapper(mut self, wrapper: impl Into<UnitObj>) -> Self {
        self.wrapper = Some(wrapper.into());
        self
    }

    pub fn transform(&self) -> &UnitObj {
        &self.transform
    }
}

impl Unit for Map {
    fn name(&self) -> String {
        "Map".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        let rows = rows(args)?;
        let mut results = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match self.transform.call(row) {
                Ok(outcome) => results.push(outcome.into_value()),
                Err(error) => return Err(map_error(index, row, &self.transform, error)),
            }
        }
        wrap(&self.wrapper, results)
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<Map>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "Map: ")?;
        self.transform.describe(f, indent + 2)
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

/// Element-wise map over a per-call thread pool.
///
/// Rows are submitted in chunks (`chunk_size`, default 1) and awaited
/// in submission order, so output order always matches input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadMap {
    transform: UnitObj,
    wrapper: Option<UnitObj>,
    pool_size: usize,
    chunk_size: usize,
    timeout: Option<Duration>,
    initializer: Option<(UnitObj, Vec<Value>)>,
}

impl ThreadMap {
    pub fn new(transform: impl Into<UnitObj>) -> Self {
        ThreadMap {
            transform: transform.into(),
            wrapper: None,
            pool_size: DEFAULT_THREAD_WORKERS,
            chunk_size: 1,
            timeout: None,
            initializer: None,
        }
    }

    pub fn wrapper(mut self, wrapper: impl Into<UnitObj>) -> Self {
        self.wrapper = Some(wrapper.into());
        self
    }

    /// Set the worker count. Zero is rejected here, at construction.
    pub fn pool_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::PoolSize { size });
        }
        self.pool_size = size;
        Ok(self)
    }

    /// Rows handed to one worker per submission. Larger chunks trade
    /// scheduling overhead for coarser parallelism.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn initializer(mut self, unit: impl Into<UnitObj>, args: Vec<Value>) -> Self {
        self.initializer = Some((unit.into(), args));
        self
    }

    pub fn transform(&self) -> &UnitObj {
        &self.transform
    }

    fn run_pooled(&self, pool: &PooledExecutor, args: &[Value]) -> Result<Outcome> {
        let rows = rows(args)?;
        if rows.is_empty() {
            return wrap(&self.wrapper, Vec::new());
        }

        let handles = rows
            .chunks(self.chunk_size)
            .enumerate()
            .map(|(chunk, chunk_rows)| {
                let transform = self.transform.clone();
                let start = chunk * self.chunk_size;
                let chunk_rows = chunk_rows.to_vec();
                pool.submit(move || transform_rows(&transform, start, &chunk_rows))
            })
            .collect();
        let (outcomes, first_error) = await_in_order(handles, self.timeout);

        if let Some((chunk, error)) = first_error {
            // Transform failures already carry their global index; only
            // pool-level failures (timeouts) still need attribution.
            return match error {
                raised @ (Error::Map { .. } | Error::MapWrapper { .. }) => Err(raised),
                other => {
                    let start = chunk * self.chunk_size;
                    Err(map_error(start, &rows[start], &self.transform, other))
                }
            };
        }

        let mut results = Vec::with_capacity(rows.len());
        for outcome in outcomes {
            match outcome {
                Outcome::Many(values) => results.extend(values),
                Outcome::Single(value) => results.push(value),
                Outcome::None => {}
            }
        }
        wrap(&self.wrapper, results)
    }
}

/// The two pool flavors behind one submission surface.
enum PooledExecutor {
    Thread(ThreadPool),
    Worker(WorkerPool),
}

impl PooledExecutor {
    fn submit<F>(&self, task: F) -> crate::pool::TaskHandle
    where
        F: FnOnce() -> Result<Outcome> + Send + 'static,
    {
        match self {
            PooledExecutor::Thread(pool) => pool.submit(task),
            PooledExecutor::Worker(pool) => pool.submit(task),
        }
    }

    fn join(&mut self) {
        match self {
            PooledExecutor::Thread(pool) => pool.join(),
            PooledExecutor::Worker(pool) => pool.join(),
        }
    }
}

impl Unit for ThreadMap {
    fn name(&self) -> String {
        "ThreadMap".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        let pool = ThreadPool::new(self.pool_size, pool_initializer(&self.initializer))?;
        let mut pool = PooledExecutor::Thread(pool);
        let result = self.run_pooled(&pool, args);
        pool.join();
        result
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<ThreadMap>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(
            f,
            "ThreadMap(pool_size={}, chunk_size={}): ",
            self.pool_size, self.chunk_size
        )?;
        self.transform.describe(f, indent + 2)
    }
}

impl fmt::Display for ThreadMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, 0)
    }
}

/// Element-wise map over a per-call worker pool for CPU-bound
/// transforms, with optional worker recycling.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessMap {
    transform: UnitObj,
    wrapper: Option<UnitObj>,
    pool_size: usize,
    chunk_size: usize,
    timeout: Option<Duration>,
    initializer: Option<(UnitObj, Vec<Value>)>,
    max_tasks: Option<usize>,
}

impl ProcessMap {
    pub fn new(transform: impl Into<UnitObj>) -> Self {
        ProcessMap {
            transform: transform.into(),
            wrapper: None,
            pool_size: crate::pool::default_worker_count(),
            chunk_size: 1,
            timeout: None,
            initializer: None,
            max_tasks: None,
        }
    }

    pub fn wrapper(mut self, wrapper: impl Into<UnitObj>) -> Self {
        self.wrapper = Some(wrapper.into());
        self
    }

    /// Set the worker count. Zero is rejected here, at construction.
    pub fn pool_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::PoolSize { size });
        }
        self.pool_size = size;
        Ok(self)
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn initializer(mut self, unit: impl Into<UnitObj>, args: Vec<Value>) -> Self {
        self.initializer = Some((unit.into(), args));
        self
    }

    /// Recycle each worker after `tasks` chunks; zero disables
    /// recycling.
    pub fn recycle_after(mut self, tasks: usize) -> Self {
        self.max_tasks = if tasks == 0 { None } else { Some(tasks) };
        self
    }

    pub fn transform(&self) -> &UnitObj {
        &self.transform
    }

    fn as_thread_map(&self) -> ThreadMap {
        ThreadMap {
            transform: self.transform.clone(),
            wrapper: self.wrapper.clone(),
            pool_size: self.pool_size,
            chunk_size: self.chunk_size,
            timeout: self.timeout,
            initializer: self.initializer.clone(),
        }
    }
}

impl Unit for ProcessMap {
    fn name(&self) -> String {
        "ProcessMap".to_string()
    }

    fn call(&self, args: &[Value]) -> Result<Outcome> {
        let pool = WorkerPool::new(
            self.pool_size,
            pool_initializer(&self.initializer),
            self.max_tasks,
        )?;
        let mut pool = PooledExecutor::Worker(pool);
        let result = self.as_thread_map().run_pooled(&pool, args);
        pool.join();
        result
    }

    fn eq_unit(&self, other: &dyn Unit) -> bool {
        other
            .as_any()
            .downcast_ref::<ProcessMap>()
            .is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(
            f,
            "ProcessMap(pool_size={}, chunk_size={}): ",
            self.pool_size, self.chunk_size
        )?;
        self.transform.describe(f, indent + 2)
    }
}

impl fmt::Display for ProcessMap {
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

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn ints(ns: &[i64]) -> Value {
        Value::List(ns.iter().copied().map(Value::Integer).collect())
    }

    fn double() -> UnitObj {
        UnitObj::function("double", |args| match args {
            [Value::Integer(n)] => Ok(Value::Integer(n * 2)),
            other => Err(Error::type_error("Integer", format!("{other:?}"))),
        })
    }

    #[test]
    fn test_map_rebuilds_a_list() {
        let map = Map::new(double());
        let out = map.call(&[ints(&[1, 2, 3])]).unwrap();
        assert_eq!(out, Outcome::Single(ints(&[2, 4, 6])));
    }

    #[test]
    fn test_map_zips_to_shortest_input() {
        let add = UnitObj::function("add", |args| match args {
            [Value::Integer(a), Value::Integer(b)] => Ok(Value::Integer(a + b)),
            other => Err(Error::type_error("two Integers", format!("{other:?}"))),
        });
        let map = Map::new(add);
        let out = map.call(&[ints(&[1, 2, 3]), ints(&[10, 20])]).unwrap();
        assert_eq!(out, Outcome::Single(ints(&[11, 22])));
    }

    #[test]
    fn test_map_rejects_non_list_argument() {
        let map = Map::new(double());
        let err = map.call(&[int(3)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_map_error_names_index_and_value() {
        let picky = UnitObj::function("picky", |args| match args {
            [Value::Integer(n)] if *n != 2 => Ok(Value::Integer(*n)),
            _ => Err(Error::runtime("two is right out")),
        });
        let map = Map::new(picky);
        match map.call(&[ints(&[1, 2, 3])]).unwrap_err() {
            Error::Map { index, value, unit, .. } => {
                assert_eq!(index, 1);
                assert_eq!(value, int(2));
                assert_eq!(unit, "picky");
            }
            other => panic!("expected Map error, got {other:?}"),
        }
    }

    #[test]
    fn test_map_error_reports_whole_row_for_multiple_inputs() {
        let never = UnitObj::function("never", |_| Err(Error::runtime("no")));
        let map = Map::new(never);
        match map.call(&[ints(&[1]), ints(&[10])]).unwrap_err() {
            Error::Map { value, .. } => assert_eq!(value, ints(&[1, 10])),
            other => panic!("expected Map error, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_wrapper_sees_all_results() {
        let sum = UnitObj::function("sum", |args| {
            let mut total = 0;
            for arg in args {
                match arg {
                    Value::Integer(n) => total += n,
                    other => return Err(Error::type_error("Integer", other.type_name())),
                }
            }
            Ok(Value::Integer(total))
        });
        let map = Map::new(double()).wrapper(sum);
        assert_eq!(
            map.call(&[ints(&[1, 2, 3])]).unwrap(),
            Outcome::Single(int(12))
        );
    }

    #[test]
    fn test_wrapper_failure_names_the_wrapper() {
        let bad_wrapper = UnitObj::function("bad_wrapper", |_| Err(Error::runtime("nope")));
        let map = Map::new(double()).wrapper(bad_wrapper);
        match map.call(&[ints(&[1])]).unwrap_err() {
            Error::MapWrapper { unit, .. } => assert_eq!(unit, "bad_wrapper"),
            other => panic!("expected MapWrapper error, got {other:?}"),
        }
    }

    #[test]
    fn test_map_of_empty_list_is_empty_list() {
        let map = Map::new(double());
        assert_eq!(
            map.call(&[ints(&[])]).unwrap(),
            Outcome::Single(Value::List(Vec::new()))
        );
    }

    #[test]
    fn test_thread_map_preserves_input_order() {
        let slow_double = UnitObj::function("slow_double", |args| match args {
            [Value::Integer(n)] => {
                // Later elements finish first.
                std::thread::sleep(Duration::from_millis((10 - n) as u64 * 5));
                Ok(Value::Integer(n * 2))
            }
            other => Err(Error::type_error("Integer", format!("{other:?}"))),
        });
        let map = ThreadMap::new(slow_double).pool_size(4).unwrap();
        let out = map.call(&[ints(&[1, 2, 3, 4])]).unwrap();
        assert_eq!(out, Outcome::Single(ints(&[2, 4, 6, 8])));
    }

    #[test]
    fn test_thread_map_error_carries_global_index() {
        let picky = UnitObj::function("picky", |args| match args {
            [Value::Integer(5)] => Err(Error::runtime("five")),
            [Value::Integer(n)] => Ok(Value::Integer(*n)),
            other => Err(Error::type_error("Integer", format!("{other:?}"))),
        });
        let map = ThreadMap::new(picky).chunk_size(2);
        match map.call(&[ints(&[1, 2, 3, 4, 5, 6])]).unwrap_err() {
            Error::Map { index, value, .. } => {
                assert_eq!(index, 4);
                assert_eq!(value, int(5));
            }
            other => panic!("expected Map error, got {other:?}"),
        }
    }

    #[test]
    fn test_thread_map_chunking_matches_sequential_result() {
        let map = ThreadMap::new(double()).chunk_size(3).pool_size(2).unwrap();
        let out = map.call(&[ints(&[1, 2, 3, 4, 5, 6, 7])]).unwrap();
        assert_eq!(out, Outcome::Single(ints(&[2, 4, 6, 8, 10, 12, 14])));
    }

    #[test]
    fn test_thread_map_zero_pool_size_rejected() {
        let err = ThreadMap::new(double()).pool_size(0).unwrap_err();
        assert!(matches!(err, Error::PoolSize { size: 0 }));
    }

    #[test]
    fn test_process_map_recycles_workers() {
        let init_runs = Arc::new(AtomicUsize::new(0));
        let counter = init_runs.clone();
        let init = UnitObj::function("init", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Missing)
        });
        let map = ProcessMap::new(double())
            .pool_size(1)
            .unwrap()
            .recycle_after(1)
            .initializer(init, Vec::new());
        let out = map.call(&[ints(&[1, 2])]).unwrap();
        assert_eq!(out, Outcome::Single(ints(&[2, 4])));
        // Startup plus one recycle per served chunk.
        assert!(init_runs.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_process_map_empty_input_skips_the_pool_work() {
        let map = ProcessMap::new(double());
        assert_eq!(
            map.call(&[ints(&[])]).unwrap(),
            Outcome::Single(Value::List(Vec::new()))
        );
    }
}
