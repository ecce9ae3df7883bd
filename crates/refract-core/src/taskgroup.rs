//! Fixed-size worker pool for CPU-bound batch work.
//!
//! Document generation is batch: partial output is valuable, so a failing
//! task never cancels its siblings. Tasks publish failures into a shared
//! buffer and the caller collects them all at once after the drain.

use std::sync::{Arc, Condvar, Mutex};

use crate::error::Error;

/// A pool of threads for executing work concurrently.
pub struct ThreadPool {
    pool: rayon::ThreadPool,
    concurrency: usize,
}

impl ThreadPool {
    /// Build a pool with the given thread count; 0 selects the hardware
    /// parallelism.
    pub fn new(concurrency: usize) -> Result<Self, Error> {
        let concurrency = if concurrency == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            concurrency
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|index| format!("refract-worker-{index}"))
            .build()
            .map_err(|err| Error::new(format!("could not start the worker pool: {err}")))?;
        Ok(Self { pool, concurrency })
    }

    /// The number of threads in the pool.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Invoke `f` for each element of `items` on the pool, returning the
    /// errors the invocations produced. Blocks until all work finishes.
    pub fn for_each<T, F>(&self, items: &[T], f: F) -> Vec<Error>
    where
        T: Sync,
        F: Fn(&T) -> Result<(), Error> + Sync,
    {
        let errors = Mutex::new(Vec::new());
        self.pool.in_place_scope(|scope| {
            for item in items {
                let errors = &errors;
                let f = &f;
                scope.spawn(move |_| {
                    if let Err(err) = f(item) {
                        if let Ok(mut buffer) = errors.lock() {
                            buffer.push(err);
                        }
                    }
                });
            }
        });
        errors.into_inner().unwrap_or_default()
    }
}

/// A subset of possible work in a thread pool.
///
/// Submission order is FIFO; completion order is unspecified. The group
/// never cancels queued work: every submitted task runs to completion and
/// failures accumulate in the error buffer until [`TaskGroup::wait`].
pub struct TaskGroup<'p> {
    pool: &'p ThreadPool,
    state: Arc<GroupState>,
}

struct GroupState {
    pending: Mutex<usize>,
    drained: Condvar,
    errors: Mutex<Vec<Error>>,
}

impl<'p> TaskGroup<'p> {
    pub fn new(pool: &'p ThreadPool) -> Self {
        Self {
            pool,
            state: Arc::new(GroupState {
                pending: Mutex::new(0),
                drained: Condvar::new(),
                errors: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Submit a unit of work. A returned error is published into the
    /// group's error buffer; it does not affect sibling tasks.
    pub fn spawn<F>(&self, task: F)
    where
        F: FnOnce() -> Result<(), Error> + Send + 'static,
    {
        if let Ok(mut pending) = self.state.pending.lock() {
            *pending += 1;
        }
        let state = Arc::clone(&self.state);
        self.pool.pool.spawn(move || {
            if let Err(err) = task() {
                if let Ok(mut errors) = state.errors.lock() {
                    errors.push(err);
                }
            }
            if let Ok(mut pending) = state.pending.lock() {
                *pending -= 1;
                if *pending == 0 {
                    state.drained.notify_all();
                }
            }
        });
    }

    /// Block until all submitted tasks complete, then return the collected
    /// errors and reset the buffer.
    pub fn wait(&self) -> Vec<Error> {
        if let Ok(mut pending) = self.state.pending.lock() {
            while *pending > 0 {
                match self.state.drained.wait(pending) {
                    Ok(guard) => pending = guard,
                    Err(_) => break,
                }
            }
        }
        self.state
            .errors
            .lock()
            .map(|mut errors| std::mem::take(&mut *errors))
            .unwrap_or_default()
    }
}
