//! Benchmarks for recording marks and restoring them, serially and in parallel.

use criterion::{BatchSize, Criterion};
use preserved_marks::scheduler::ThreadPool;
use preserved_marks::util::test_util::mock_vm::{hashed_mark, MockHeap, MockVM, PROTOTYPE};
use preserved_marks::{ObjectReference, PreservedMarks, PreservedMarksSet};
use std::hint::black_box;

const NUM_OBJECTS: usize = 64 * 1024;
const NUM_STACKS: usize = 8;

fn prepare_set(heap: &MockHeap, objects: &[ObjectReference]) -> PreservedMarksSet {
    let mut set = PreservedMarksSet::new_durable();
    set.init(NUM_STACKS);
    for (i, object) in objects.iter().enumerate() {
        set.get(i % NUM_STACKS).push_always(*object, heap.mark(*object));
        MockHeap::set_mark(*object, PROTOTYPE);
    }
    set
}

pub fn bench(c: &mut Criterion) {
    let mut heap = MockHeap::new();
    let objects = heap.alloc_many(NUM_OBJECTS, |i| hashed_mark(i + 1));

    c.bench_function("preserved_marks_record", |b| {
        b.iter(|| {
            let mut stack = PreservedMarks::new();
            for object in &objects {
                stack.record_if_not_preserved::<MockVM>(*object);
            }
            black_box(stack.size());
            stack.reset();
        });
    });

    c.bench_function("preserved_marks_restore_serial", |b| {
        b.iter_batched(
            || prepare_set(&heap, &objects),
            |mut set| {
                black_box(set.restore::<MockVM>(None));
                set.reclaim();
            },
            BatchSize::LargeInput,
        );
    });

    let pool = ThreadPool::new(NUM_STACKS.min(num_cpus::get()).max(1));
    c.bench_function("preserved_marks_restore_parallel", |b| {
        b.iter_batched(
            || prepare_set(&heap, &objects),
            |mut set| {
                black_box(set.restore::<MockVM>(Some(&pool)));
                set.reclaim();
            },
            BatchSize::LargeInput,
        );
    });
}
