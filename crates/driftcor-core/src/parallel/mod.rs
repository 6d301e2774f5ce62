//! Scatter/gather execution of coarse-grained jobs.
//!
//! Every job carries a tag naming the output slot it fills. Results arrive in
//! completion order and are placed by tag, so the controlling thread stays the
//! only writer of the gathered output.

use std::sync::mpsc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::consts::PROGRESS_LOG_STEPS;
use crate::error::{DriftError, Result};

/// One unit of work destined for output slot `tag`.
#[derive(Clone, Debug)]
pub struct Task<P> {
    pub tag: usize,
    pub payload: P,
}

/// The value a job produced for slot `tag`.
#[derive(Clone, Debug)]
pub struct TaskResult<R> {
    pub tag: usize,
    pub value: R,
}

/// Worker count used when the pool is enabled: one core is left to the controller.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Fixed-size pool of worker threads.
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new() -> Result<Self> {
        Self::with_workers(default_worker_count())
    }

    pub fn with_workers(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("driftcor-worker-{i}"))
            .build()
            .map_err(|e| DriftError::Pool(e.to_string()))?;
        debug!(workers, "Worker pool started");
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn scatter_gather<P, R, F, G>(
        &self,
        tasks: Vec<Task<P>>,
        job: &F,
        slots: &mut [Option<Result<R>>],
        mut on_done: G,
    ) where
        P: Send,
        R: Send,
        F: Fn(P) -> Result<R> + Sync,
        G: FnMut(usize),
    {
        let (tx, rx) = mpsc::channel::<TaskResult<Result<R>>>();
        // The closure runs on the calling thread, so draining the channel here
        // never occupies a pool worker.
        self.pool.in_place_scope(|scope| {
            for Task { tag, payload } in tasks {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let value = job(payload);
                    let _ = tx.send(TaskResult { tag, value });
                });
            }
            drop(tx);

            for (done, result) in rx.iter().enumerate() {
                slots[result.tag] = Some(result.value);
                on_done(done + 1);
            }
        });
    }
}

/// Runs jobs either inline on the calling thread or on a [`WorkerPool`].
pub enum Executor {
    Serial,
    Pool(WorkerPool),
}

impl Executor {
    /// Build the executor for a run; `parallel` enables the worker pool.
    pub fn new(parallel: bool) -> Result<Self> {
        if parallel {
            Ok(Executor::Pool(WorkerPool::new()?))
        } else {
            Ok(Executor::Serial)
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            Executor::Serial => 1,
            Executor::Pool(pool) => pool.workers(),
        }
    }

    /// Run every task and return the results ordered by tag.
    ///
    /// Tags must be exactly `0..tasks.len()`, each used once. `on_done` is
    /// called on the controlling thread with the number of finished jobs.
    pub fn run<P, R, F, G>(&self, tasks: Vec<Task<P>>, job: F, on_done: G) -> Result<Vec<R>>
    where
        P: Send,
        R: Send,
        F: Fn(P) -> Result<R> + Sync,
        G: FnMut(usize),
    {
        let total = tasks.len();
        let mut claimed = vec![false; total];
        for task in &tasks {
            match claimed.get_mut(task.tag) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(DriftError::Pool(format!(
                        "two jobs target slot {}",
                        task.tag
                    )))
                }
                None => {
                    return Err(DriftError::Pool(format!(
                        "job tag {} outside {} slots",
                        task.tag, total
                    )))
                }
            }
        }

        let mut slots: Vec<Option<Result<R>>> = (0..total).map(|_| None).collect();
        match self {
            Executor::Serial => {
                let mut on_done = on_done;
                for (done, Task { tag, payload }) in tasks.into_iter().enumerate() {
                    slots[tag] = Some(job(payload));
                    on_done(done + 1);
                }
            }
            Executor::Pool(pool) => pool.scatter_gather(tasks, &job, &mut slots, on_done),
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(tag, slot)| {
                slot.unwrap_or_else(|| {
                    Err(DriftError::Pool(format!("no result for slot {tag}")))
                })
            })
            .collect()
    }
}

/// Log a stage's progress roughly every `1 / PROGRESS_LOG_STEPS` of its items.
pub fn log_progress(stage: &str, done: usize, total: usize) {
    let step = (total / PROGRESS_LOG_STEPS).max(1);
    if done % step == 0 || done == total {
        info!(stage, done, total, "Progress");
    }
}
