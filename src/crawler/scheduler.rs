//! Bounded worker pool
//!
//! A fixed number of workers pull tasks from a shared queue until it is
//! drained. At most `concurrency` tasks run at any instant, which bounds
//! the load placed on the catalog server. Each worker writes results
//! tagged with the task's submission index, so outcomes come back in
//! submission order no matter when they finish.

use futures::future::join_all;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

/// Fixed-size pool of cooperating workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    /// Creates a pool; a limit of 0 is treated as 1
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs every task through `work` and returns the outcomes
    ///
    /// The returned vector has one entry per submitted task, at the task's
    /// submission index. A failing task never stops the pool; failure is
    /// just another outcome value.
    ///
    /// # Arguments
    ///
    /// * `tasks` - Task inputs, consumed in queue order
    /// * `work` - Turns one task into a future producing its outcome
    pub async fn run_many<T, R, F, Fut>(&self, tasks: Vec<T>, work: F) -> Vec<R>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let task_count = tasks.len();
        if task_count == 0 {
            return Vec::new();
        }

        let queue: Mutex<VecDeque<(usize, T)>> =
            Mutex::new(tasks.into_iter().enumerate().collect());
        let worker_count = self.concurrency.min(task_count);

        tracing::debug!(
            "Dispatching {} tasks across {} workers",
            task_count,
            worker_count
        );

        let queue = &queue;
        let work = &work;
        let workers = (0..worker_count).map(move |_| async move {
            let mut finished = Vec::new();
            while let Some((index, task)) = next_task(queue) {
                finished.push((index, work(task).await));
            }
            finished
        });

        let mut slots: Vec<Option<R>> = (0..task_count).map(|_| None).collect();
        for (index, outcome) in join_all(workers).await.into_iter().flatten() {
            slots[index] = Some(outcome);
        }

        // Workers only stop once the queue is empty, so every slot is filled.
        slots.into_iter().flatten().collect()
    }
}

fn next_task<T>(queue: &Mutex<VecDeque<(usize, T)>>) -> Option<(usize, T)> {
    match queue.lock() {
        Ok(mut guard) => guard.pop_front(),
        Err(poisoned) => poisoned.into_inner().pop_front(),
    }
}
