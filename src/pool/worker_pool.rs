//! Worker pool for CPU-bound units.
//!
//! Same submit/await surface as [`super::ThreadPool`], plus the two
//! knobs process pools traditionally carry: a per-worker initializer
//! hook and task-count recycling. A recycled worker re-runs its
//! initializer and drops worker-local state after serving a fixed
//! number of tasks.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};

use crate::error::{Error, Result};
use crate::outcome::Outcome;

use super::{Initializer, Job, TaskHandle};

/// A bounded set of recyclable workers serving one combinator
/// invocation. Defaults to [`super::default_worker_count`] workers.
#[derive(Debug)]
pub struct WorkerPool {
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers. A size of zero is rejected at construction.
    /// `max_tasks` of `Some(n)` recycles each worker after n tasks;
    /// `None` never recycles.
    pub fn new(
        size: usize,
        initializer: Option<Initializer>,
        max_tasks: Option<usize>,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::PoolSize { size });
        }

        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let jobs = rx.clone();
            let init = initializer.clone();
            let handle = thread::Builder::new()
                .name(format!("plumb-worker-{id}"))
                .spawn(move || {
                    if let Some(init) = &init {
                        init();
                    }
                    let mut served = 0usize;
                    while let Ok(job) = jobs.recv() {
                        job();
                        served += 1;
                        if max_tasks.is_some_and(|limit| served >= limit) {
                            log::debug!("recycling worker {id} after {served} tasks");
                            if let Some(init) = &init {
                                init();
                            }
                            served = 0;
                        }
                    }
                    log::trace!("worker {id} exiting");
                })?;
            workers.push(handle);
        }
        log::debug!(
            "worker pool started with {size} workers (max_tasks={max_tasks:?})"
        );

        Ok(WorkerPool {
            jobs: Some(tx),
            workers,
        })
    }

    /// Queue a task and return a handle to its eventual result.
    pub fn submit<F>(&self, task: F) -> TaskHandle
    where
        F: FnOnce() -> Result<Outcome> + Send + 'static,
    {
        TaskHandle::dispatch(self.jobs.as_ref(), task)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Close the job queue and join every worker. Idempotent; also run
    /// on drop.
    pub fn join(&mut self) {
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::debug!("worker panicked during teardown");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.join();
    }
}
