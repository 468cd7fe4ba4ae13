use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out the task indices `0..num_tasks` to concurrently running workers, each index to
/// exactly one worker. Claiming is a single atomic increment on a shared cursor, so no lock is
/// held while the claimed task runs.
///
/// Each of the `num_threads` workers is expected to loop on [`SequentialSubTasks::try_claim_task`]
/// until it fails, then call [`SequentialSubTasks::all_tasks_completed`] once.
pub struct SequentialSubTasks {
    num_tasks: usize,
    num_threads: usize,
    /// The next unclaimed index. May overshoot `num_tasks` by up to one per worker.
    num_claimed: AtomicUsize,
    threads_completed: AtomicUsize,
}

impl SequentialSubTasks {
    pub fn new(num_threads: usize, num_tasks: usize) -> Self {
        assert!(num_threads > 0, "at least one worker is needed to run the sub-tasks");
        SequentialSubTasks {
            num_tasks,
            num_threads,
            num_claimed: AtomicUsize::new(0),
            threads_completed: AtomicUsize::new(0),
        }
    }

    /// Claim the next unclaimed task. Returns `None` once every task has been claimed.
    pub fn try_claim_task(&self) -> Option<usize> {
        // Avoid bumping the cursor any further once it is exhausted.
        if self.num_claimed.load(Ordering::Relaxed) >= self.num_tasks {
            return None;
        }
        let task_id = self.num_claimed.fetch_add(1, Ordering::SeqCst);
        if task_id < self.num_tasks {
            Some(task_id)
        } else {
            None
        }
    }

    /// Called by each worker once it failed to claim a task. Returns `true` for the last worker
    /// to finish.
    pub fn all_tasks_completed(&self) -> bool {
        let completed = self.threads_completed.fetch_add(1, Ordering::SeqCst) + 1;
        debug_assert!(
            completed <= self.num_threads,
            "{} workers completed, but only {} were expected",
            completed,
            self.num_threads
        );
        debug_assert!(
            self.num_claimed.load(Ordering::SeqCst) >= self.num_tasks,
            "a worker completed while tasks were still unclaimed"
        );
        completed == self.num_threads
    }

    /// Have all workers reported completion?
    pub fn is_completed(&self) -> bool {
        self.threads_completed.load(Ordering::SeqCst) == self.num_threads
    }
}
