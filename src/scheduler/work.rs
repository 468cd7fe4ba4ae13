/// A unit of parallel work. The pool calls [`WorkerTask::work`] once on each active worker,
/// concurrently. The task itself decides how the work is split, usually by claiming sub-tasks
/// from a [`super::SequentialSubTasks`].
pub trait WorkerTask: Sync {
    /// A human readable name, for logging.
    fn name(&self) -> &str;

    /// Do this worker's share of the task.
    ///
    /// Arguments:
    /// * `worker_id`: The ordinal of the calling worker, in `0..active_workers`.
    fn work(&self, worker_id: usize);
}

/// Something that runs a [`WorkerTask`] on up to `active_workers()` executors in parallel.
///
/// `run_task` is a barrier: it must not return before every worker has returned from
/// [`WorkerTask::work`]. A panic on any worker must be propagated to the caller of `run_task`.
pub trait WorkerPool {
    /// The number of workers `run_task` will use. Must be positive.
    fn active_workers(&self) -> usize;

    /// Run `task` on every active worker and wait for all of them to finish.
    fn run_task(&self, task: &dyn WorkerTask);
}
