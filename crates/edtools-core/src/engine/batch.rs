//! Bounded worker pool for independent per-dataset jobs.

use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use rayon::prelude::*;
use std::fmt::{Debug, Display};
use std::sync::Mutex;
use tracing::warn;

pub const DEFAULT_WORKERS: usize = 4;

/// Serializes console output of concurrently running jobs.
#[derive(Default)]
pub struct ConsoleLock {
    inner: Mutex<()>,
}

impl ConsoleLock {
    /// Runs `f` while holding the lock.
    pub fn serialized<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }
}

/// A fixed-size pool; each submitted batch is joined before `run` returns.
pub struct BatchPool {
    pool: rayon::ThreadPool,
    console: ConsoleLock,
    workers: usize,
}

impl BatchPool {
    pub fn new(workers: usize) -> Result<Self, EngineError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("edtools-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            console: ConsoleLock::default(),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn console(&self) -> &ConsoleLock {
        &self.console
    }

    /// Runs `task` on every item and returns the outcomes in input order.
    ///
    /// A failing item is logged and reported in its slot; the other items
    /// are unaffected.
    pub fn run<T, R, E, F>(
        &self,
        items: &[T],
        reporter: &ProgressReporter,
        task: F,
    ) -> Vec<Result<R, E>>
    where
        T: Sync + Debug,
        R: Send,
        E: Send + Display,
        F: Fn(&T, &ConsoleLock) -> Result<R, E> + Sync,
    {
        reporter.report(Progress::TaskStart {
            total_steps: items.len() as u64,
        });
        let console = &self.console;
        let results = self.pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let outcome = task(item, console);
                    if let Err(e) = &outcome {
                        warn!("Job for {:?} failed: {}", item, e);
                    }
                    reporter.report(Progress::TaskIncrement);
                    outcome
                })
                .collect()
        });
        reporter.report(Progress::TaskFinish);
        results
    }
}
