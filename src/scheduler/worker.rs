use super::work::{WorkerPool, WorkerTask};
use crate::util::options::Options;

/// A [`WorkerPool`] that runs each task on freshly spawned scoped threads, one per active
/// worker, and joins all of them before returning.
///
/// Like a GC work gang, the pool has a fixed number of workers of which only the first
/// `active_workers` take part in a task.
pub struct ThreadPool {
    total_workers: usize,
    active_workers: usize,
}

impl ThreadPool {
    pub fn new(total_workers: usize) -> Self {
        assert!(total_workers > 0, "a thread pool needs at least one worker");
        ThreadPool {
            total_workers,
            active_workers: total_workers,
        }
    }

    /// A pool with `options.threads` workers.
    pub fn from_options(options: &Options) -> Self {
        Self::new(options.threads)
    }

    pub fn total_workers(&self) -> usize {
        self.total_workers
    }

    /// Change the number of workers used by subsequent tasks. Returns the new value.
    pub fn set_active_workers(&mut self, active_workers: usize) -> usize {
        assert!(
            active_workers > 0 && active_workers <= self.total_workers,
            "active workers ({}) must be in 1..={}",
            active_workers,
            self.total_workers
        );
        self.active_workers = active_workers;
        active_workers
    }
}

impl WorkerPool for ThreadPool {
    fn active_workers(&self) -> usize {
        self.active_workers
    }

    fn run_task(&self, task: &dyn WorkerTask) {
        debug!(
            "Running task \"{}\" with {} workers",
            task.name(),
            self.active_workers
        );
        let result = crossbeam::thread::scope(|s| {
            for worker_id in 0..self.active_workers {
                s.builder()
                    .name(format!("preserved-marks-worker-{}", worker_id))
                    .spawn(move |_| task.work(worker_id))
                    .unwrap_or_else(|e| panic!("Failed to spawn worker {}: {}", worker_id, e));
            }
        });
        // The scope joins every worker. If any of them panicked, re-raise it on this thread.
        if let Err(panic) = result {
            std::panic::resume_unwind(panic);
        }
        trace!("Task \"{}\" finished", task.name());
    }
}
