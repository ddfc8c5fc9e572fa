//! Bounded worker-thread pool.
//!
//! Workers pull jobs off a shared crossbeam channel until the queue is
//! closed. Teardown is unconditional: dropping the pool closes the
//! queue and joins every worker, so no invocation can leak threads.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};

use crate::error::{Error, Result};
use crate::outcome::Outcome;

use super::{Initializer, Job, TaskHandle};

/// A bounded set of worker threads serving one combinator invocation.
#[derive(Debug)]
pub struct ThreadPool {
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `size` workers. A size of zero is rejected at construction.
    /// `initializer` runs once per worker before it serves any job.
    pub fn new(size: usize, initializer: Option<Initializer>) -> Result<Self> {
        if size == 0 {
            return Err(Error::PoolSize { size });
        }

        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let jobs = rx.clone();
            let init = initializer.clone();
            let handle = thread::Builder::new()
                .name(format!("plumb-thread-{id}"))
                .spawn(move || {
                    if let Some(init) = &init {
                        init();
                    }
                    while let Ok(job) = jobs.recv() {
                        job();
                    }
                    log::trace!("thread pool worker {id} exiting");
                })?;
            workers.push(handle);
        }
        log::debug!("thread pool started with {size} workers");

        Ok(ThreadPool {
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

    /// Close the job queue and wait for every worker to finish its
    /// current job and exit. Idempotent; also run on drop.
    pub fn join(&mut self) {
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::debug!("thread pool worker panicked during teardown");
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.join();
    }
}
