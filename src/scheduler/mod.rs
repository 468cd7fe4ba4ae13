//! Parallel phase execution.
//!
//! The engine does not own GC threads. A collector hands it a [`WorkerPool`], and the engine
//! submits one [`WorkerTask`] per parallel phase. Work inside a task is distributed with
//! [`SequentialSubTasks`], a claim-based dispatcher. [`ThreadPool`] is a ready-made pool that
//! runs each task on scoped threads.

mod sub_tasks;
pub use sub_tasks::SequentialSubTasks;

mod work;
pub use work::{WorkerPool, WorkerTask};

mod worker;
pub use worker::ThreadPool;
