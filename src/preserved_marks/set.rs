use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use atomic_refcell::{AtomicRefCell, AtomicRefMut};
use crossbeam::utils::CachePadded;

use super::task::PerStackTask;
use super::PreservedMarks;
use crate::scheduler::WorkerPool;
use crate::util::options::Options;
use crate::util::segmented_stack::{DEFAULT_MAX_CACHE_SIZE, DEFAULT_SEGMENT_SIZE};
use crate::vm::VMBinding;
use crate::CHECKED;

/// Each stack sits on its own cache line(s), so workers recording into adjacent slots do not
/// false-share. The `AtomicRefCell` catches two workers using the same slot at once.
type PaddedPreservedMarks = CachePadded<AtomicRefCell<PreservedMarks>>;
type SharedStacks = Arc<[PaddedPreservedMarks]>;
type Allocations = Arc<Mutex<Vec<SharedStacks>>>;

const_assert!(std::mem::align_of::<PaddedPreservedMarks>() >= 16);

fn lock_allocations(allocations: &Allocations) -> MutexGuard<'_, Vec<SharedStacks>> {
    allocations
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A phase-bound arena for transient allocations.
///
/// Stacks that a transient [`PreservedMarksSet`] allocates are kept here until the scope is
/// dropped, independent of when the set is reclaimed. Create the scope at the start of the
/// collection phase that uses the set, and let it go out of scope at the end.
#[derive(Default)]
pub struct ResourceScope {
    allocations: Allocations,
}

impl ResourceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stack arrays held by this scope.
    pub fn live_allocations(&self) -> usize {
        lock_allocations(&self.allocations).len()
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        let released = lock_allocations(&self.allocations).drain(..).count();
        if released > 0 {
            debug!("Released {} transient preserved marks allocations", released);
        }
    }
}

/// Where a [`PreservedMarksSet`] allocates its stacks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocationMode {
    /// The stacks are owned by the set and freed by [`PreservedMarksSet::reclaim`].
    Durable,
    /// The stacks are owned by a [`ResourceScope`] and freed when the scope ends.
    Transient,
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AllocationMode::Durable => write!(f, "durable"),
            AllocationMode::Transient => write!(f, "transient"),
        }
    }
}

enum Storage {
    Durable(Box<[PaddedPreservedMarks]>),
    Transient(SharedStacks),
}

impl Storage {
    fn as_slice(&self) -> &[PaddedPreservedMarks] {
        match self {
            Storage::Durable(stacks) => &stacks[..],
            Storage::Transient(stacks) => &stacks[..],
        }
    }
}

/// One [`PreservedMarks`] stack per GC worker.
///
/// The lifecycle in each collection is [`init`](PreservedMarksSet::init), recording into
/// [`get(worker)`](PreservedMarksSet::get) from each worker, optionally
/// [`adjust_during_full_gc`](PreservedMarksSet::adjust_during_full_gc),
/// [`restore`](PreservedMarksSet::restore), and [`reclaim`](PreservedMarksSet::reclaim).
/// After `reclaim` the set can be initialized again.
pub struct PreservedMarksSet {
    mode: AllocationMode,
    /// Set for transient sets only.
    scope: Option<Allocations>,
    stacks: Option<Storage>,
}

impl PreservedMarksSet {
    /// A set whose stacks are owned by the set itself.
    pub fn new_durable() -> Self {
        PreservedMarksSet {
            mode: AllocationMode::Durable,
            scope: None,
            stacks: None,
        }
    }

    /// A set whose stacks are allocated in `scope`.
    pub fn new_transient(scope: &ResourceScope) -> Self {
        PreservedMarksSet {
            mode: AllocationMode::Transient,
            scope: Some(scope.allocations.clone()),
            stacks: None,
        }
    }

    /// A transient set in `scope` if `options.transient_storage` is set, otherwise a durable one.
    pub fn from_options(options: &Options, scope: &ResourceScope) -> Self {
        if options.transient_storage {
            Self::new_transient(scope)
        } else {
            Self::new_durable()
        }
    }

    pub fn mode(&self) -> AllocationMode {
        self.mode
    }

    pub fn is_initialized(&self) -> bool {
        self.stacks.is_some()
    }

    /// The number of stacks, or zero if the set is not initialized.
    pub fn num(&self) -> usize {
        self.stacks().len()
    }

    fn stacks(&self) -> &[PaddedPreservedMarks] {
        match &self.stacks {
            Some(storage) => storage.as_slice(),
            None => &[],
        }
    }

    /// Allocate `num` empty stacks with the default geometry.
    ///
    /// Panics if the set is already initialized or `num` is zero.
    pub fn init(&mut self, num: usize) {
        self.init_with_geometry(num, DEFAULT_SEGMENT_SIZE, DEFAULT_MAX_CACHE_SIZE);
    }

    /// Allocate `num` empty stacks with the segment geometry from `options`.
    pub fn init_with_options(&mut self, num: usize, options: &Options) {
        self.init_with_geometry(num, options.segment_size, options.max_cache_size);
    }

    pub fn init_with_geometry(&mut self, num: usize, segment_size: usize, max_cache_size: usize) {
        assert!(self.stacks.is_none(), "do not re-initialize");
        assert!(num > 0, "the number of preserved marks stacks must be positive");

        let stacks = (0..num).map(|_| {
            CachePadded::new(AtomicRefCell::new(PreservedMarks::with_geometry(
                segment_size,
                max_cache_size,
            )))
        });
        self.stacks = Some(match &self.scope {
            None => Storage::Durable(stacks.collect()),
            Some(scope) => {
                let stacks: SharedStacks = stacks.collect();
                lock_allocations(scope).push(stacks.clone());
                Storage::Transient(stacks)
            }
        });
        debug!("Initialized {} {} preserved marks stacks", num, self.mode);

        if CHECKED {
            self.assert_empty();
        }
    }

    /// Borrow the stack of worker slot `i`.
    ///
    /// Panics if `i` is out of range, or if the stack is already borrowed, i.e. two workers share
    /// a slot.
    pub fn get(&self, i: usize) -> AtomicRefMut<'_, PreservedMarks> {
        self.stacks()[i].borrow_mut()
    }

    /// The number of entries across all stacks.
    pub fn total_size(&self) -> usize {
        self.stacks().iter().map(|stack| stack.borrow().size()).sum()
    }

    /// Write back every preserved mark and return how many were restored.
    ///
    /// Without `workers`, the stacks are restored one after another on the calling thread.
    /// Otherwise each of the pool's active workers claims whole stacks until none are left.
    /// Both ways leave the heap and the set in the same state.
    pub fn restore<VM: VMBinding>(&mut self, workers: Option<&dyn WorkerPool>) -> usize {
        // This is to make sure the total_size we'll calculate below is correct.
        let total_size_before = if CHECKED { self.total_size() } else { 0 };

        let total_size = match workers {
            None => {
                let mut total_size = 0;
                for stack in self.stacks() {
                    let mut stack = stack.borrow_mut();
                    total_size += stack.size();
                    stack.restore::<VM>();
                }
                total_size
            }
            Some(workers) => {
                let total_size = AtomicUsize::new(0);
                let task = PerStackTask::new(
                    "Parallel Preserved Mark Restoration",
                    workers.active_workers(),
                    self,
                    |stack: &mut PreservedMarks| stack.restore_and_increment::<VM>(&total_size),
                );
                workers.run_task(&task);
                drop(task);
                total_size.into_inner()
            }
        };

        if CHECKED {
            self.assert_empty();
            assert_eq!(
                total_size, total_size_before,
                "total_size = {} before = {}",
                total_size, total_size_before
            );
        }

        trace!("Restored {} marks", total_size);
        total_size
    }

    /// Like [`PreservedMarksSet::restore`], but ignore `workers` unless `options.parallel_restore`.
    pub fn restore_with_options<VM: VMBinding>(
        &mut self,
        workers: Option<&dyn WorkerPool>,
        options: &Options,
    ) -> usize {
        let workers = if options.parallel_restore {
            workers
        } else {
            None
        };
        self.restore::<VM>(workers)
    }

    /// Re-target entries whose objects were forwarded by a second relocation round. Stacks are
    /// independent, so with `workers` they are adjusted in parallel. Returns the number of
    /// entries changed.
    pub fn adjust_during_full_gc<VM: VMBinding>(
        &mut self,
        workers: Option<&dyn WorkerPool>,
    ) -> usize {
        let adjusted = match workers {
            None => self
                .stacks()
                .iter()
                .map(|stack| stack.borrow_mut().adjust_during_full_gc::<VM>())
                .sum(),
            Some(workers) => {
                let adjusted = AtomicUsize::new(0);
                let task = PerStackTask::new(
                    "Parallel Preserved Mark Adjustment",
                    workers.active_workers(),
                    self,
                    |stack: &mut PreservedMarks| {
                        let n = stack.adjust_during_full_gc::<VM>();
                        if n > 0 {
                            adjusted.fetch_add(n, Ordering::SeqCst);
                        }
                    },
                );
                workers.run_task(&task);
                drop(task);
                adjusted.into_inner()
            }
        };
        trace!("Adjusted {} preserved marks", adjusted);
        adjusted
    }

    /// Release the stacks. Every stack must be empty. Durable stacks are freed here; transient
    /// ones are emptied and left to their resource scope.
    pub fn reclaim(&mut self) {
        if CHECKED {
            self.assert_empty();
        }
        match self.stacks.take() {
            Some(Storage::Durable(stacks)) => drop(stacks),
            Some(Storage::Transient(stacks)) => {
                for stack in stacks.iter() {
                    stack.borrow_mut().reset();
                }
            }
            None => panic!("reclaim of an uninitialized preserved marks set"),
        }
        debug!("Reclaimed {} preserved marks stacks", self.mode);
    }

    /// Assert that the set is initialized and every stack is empty with no cached segments.
    pub fn assert_empty(&self) {
        assert!(self.is_initialized(), "should have been initialized");
        for stack in self.stacks() {
            stack.borrow().assert_empty();
        }
    }
}
