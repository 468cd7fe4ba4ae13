//! Preserved marks for relocating garbage collectors.
//!
//! A relocating collector overwrites the header word (the *mark word*) of each object it moves
//! with a forwarding marker. Some mark words carry information that cannot be recomputed, such as
//! an identity hash or lock state, so the collector has to save them before the overwrite and
//! write them back once relocation is finished. This crate is that ledger:
//!
//! * [`PreservedMarks`] is a single-owner segmented stack of `(object, mark word)` pairs.
//!   Each GC worker records into its own stack.
//! * [`PreservedMarksSet`] holds one cache-line padded stack per worker slot, and restores all
//!   of them either serially or in parallel through a [`scheduler::WorkerPool`].
//! * [`PreservedMarksSet::adjust_during_full_gc`] re-targets entries whose objects were forwarded
//!   again after they were recorded.
//!
//! The crate knows nothing about object layout. A binding describes its objects through
//! [`vm::VMBinding`] and [`vm::ObjectModel`].
//!
//! Internal consistency checks run in debug builds, or in any build with the `checked` feature.
//! A failed check panics: it always indicates a bug in the collector, never a runtime condition.

#[macro_use]
extern crate log;
#[macro_use]
extern crate static_assertions;

pub mod preserved_marks;
pub mod scheduler;
pub mod util;
pub mod vm;

pub use crate::preserved_marks::{
    AllocationMode, ObjectAndMarkWord, PreservedMarks, PreservedMarksSet, RemoveForwardedPointers,
    ResourceScope,
};
pub use crate::util::{Address, MarkWord, ObjectReference};

/// Whether the preserved-marks consistency checks are compiled in.
pub(crate) const CHECKED: bool = cfg!(any(debug_assertions, feature = "checked"));
