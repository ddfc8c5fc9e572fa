//! Worker-pool primitives for the concurrent dispatch engine.
//!
//! Pools are private to one combinator invocation: created, used,
//! drained, and joined inside a single `call`. Nothing here is shared
//! across invocations, so concurrent calls of the same combinator
//! instance never contend on a pool.

pub mod thread_pool;
pub mod worker_pool;

pub use thread_pool::ThreadPool;
pub use worker_pool::WorkerPool;

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::error::{Error, Result};
use crate::outcome::Outcome;

/// Default worker count for thread pools (I/O-bound units).
pub const DEFAULT_THREAD_WORKERS: usize = 16;

/// Default worker count for worker pools (CPU-bound units): no more
/// workers than cores, capped at 4.
pub fn default_worker_count() -> usize {
    num_cpus::get().clamp(1, 4)
}

/// A queued piece of work.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Hook run once per worker at startup (and again on recycle).
pub type Initializer = Arc<dyn Fn() + Send + Sync>;

/// Handle to one submitted task's eventual result.
pub struct TaskHandle {
    results: Receiver<Result<Outcome>>,
}

impl TaskHandle {
    pub(crate) fn dispatch<F>(jobs: Option<&Sender<Job>>, task: F) -> TaskHandle
    where
        F: FnOnce() -> Result<Outcome> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        if let Some(jobs) = jobs {
            let job: Job = Box::new(move || {
                // The handle may already have been abandoned; a failed
                // send only means nobody is waiting.
                let _ = tx.send(task());
            });
            let _ = jobs.send(job);
        }
        TaskHandle { results: rx }
    }

    /// Block until the task's result arrives, or until `timeout`
    /// elapses. A timeout surfaces as a runtime error, the same as any
    /// other failing unit.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Outcome> {
        match timeout {
            Some(limit) => match self.results.recv_timeout(limit) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => Err(Error::timeout(limit)),
                Err(RecvTimeoutError::Disconnected) => {
                    Err(Error::runtime("worker exited before producing a result"))
                }
            },
            None => match self.results.recv() {
                Ok(result) => result,
                Err(_) => Err(Error::runtime("worker exited before producing a result")),
            },
        }
    }
}

/// Await every handle in submission order.
///
/// Returns the ordered outcomes and, if any task failed, the
/// submission index and error of the first failure. Later handles are
/// still drained (without timeouts) so the caller can tear the pool
/// down before surfacing the error.
pub(crate) fn await_in_order(
    handles: Vec<TaskHandle>,
    timeout: Option<Duration>,
) -> (Vec<Outcome>, Option<(usize, Error)>) {
    let mut outcomes = Vec::with_capacity(handles.len());
    let mut first_error: Option<(usize, Error)> = None;
    for (index, handle) in handles.into_iter().enumerate() {
        let effective = if first_error.is_some() { None } else { timeout };
        match handle.wait(effective) {
            Ok(outcome) => outcomes.push(outcome),
            Err(error) => {
                if first_error.is_none() {
                    first_error = Some((index, error));
                }
            }
        }
    }
    (outcomes, first_error)
}
