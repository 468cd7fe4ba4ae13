use super::{PreservedMarks, PreservedMarksSet};
use crate::scheduler::{SequentialSubTasks, WorkerTask};

/// Applies `op` to every stack of a set, in parallel. Each stack index is claimed by exactly
/// one worker, so `op` has exclusive access to the stack it is given.
pub(super) struct PerStackTask<'a, F>
where
    F: Fn(&mut PreservedMarks) + Sync,
{
    name: &'static str,
    set: &'a PreservedMarksSet,
    sub_tasks: SequentialSubTasks,
    op: F,
}

impl<'a, F> PerStackTask<'a, F>
where
    F: Fn(&mut PreservedMarks) + Sync,
{
    pub fn new(name: &'static str, worker_num: usize, set: &'a PreservedMarksSet, op: F) -> Self {
        PerStackTask {
            name,
            set,
            sub_tasks: SequentialSubTasks::new(worker_num, set.num()),
            op,
        }
    }
}

impl<F> WorkerTask for PerStackTask<'_, F>
where
    F: Fn(&mut PreservedMarks) + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    fn work(&self, worker_id: usize) {
        while let Some(task_id) = self.sub_tasks.try_claim_task() {
            trace!("{}: worker {} claimed stack {}", self.name, worker_id, task_id);
            (self.op)(&mut *self.set.get(task_id));
        }
        self.sub_tasks.all_tasks_completed();
    }
}
