//! Recording mark words before the collector overwrites them, and writing them back afterwards.

mod set;
mod task;

pub use set::{AllocationMode, PreservedMarksSet, ResourceScope};

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::util::segmented_stack::{SegmentedStack, DEFAULT_MAX_CACHE_SIZE, DEFAULT_SEGMENT_SIZE};
use crate::util::{MarkWord, ObjectReference};
use crate::vm::{ObjectModel, VMBinding};
use crate::CHECKED;

/// An object and the mark word it had before the collector overwrote it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ObjectAndMarkWord {
    object: ObjectReference,
    mark: MarkWord,
}

impl ObjectAndMarkWord {
    pub fn new(object: ObjectReference, mark: MarkWord) -> Self {
        ObjectAndMarkWord { object, mark }
    }

    pub fn object(&self) -> ObjectReference {
        self.object
    }

    pub fn mark(&self) -> MarkWord {
        self.mark
    }

    /// Point this entry at the object's new location. The saved mark is kept.
    pub fn set_object(&mut self, object: ObjectReference) {
        self.object = object;
    }

    /// Write the saved mark word back into the object.
    pub fn set_mark<VM: VMBinding>(&self) {
        VM::VMObjectModel::write_mark_word(self.object, self.mark);
    }
}

/// The preserved marks recorded by one GC worker.
///
/// Only its owner pushes to it, so there is no internal synchronization. Entries are restored in
/// LIFO order: if an object is preserved more than once in a cycle, the mark recorded first is
/// written last and is the one the object ends up with.
pub struct PreservedMarks {
    stack: SegmentedStack<ObjectAndMarkWord>,
}

impl Default for PreservedMarks {
    fn default() -> Self {
        Self::new()
    }
}

impl PreservedMarks {
    pub fn new() -> Self {
        Self::with_geometry(DEFAULT_SEGMENT_SIZE, DEFAULT_MAX_CACHE_SIZE)
    }

    /// A stack with `segment_size` entries per segment that caches up to `max_cache_size` empty
    /// segments while it shrinks.
    pub fn with_geometry(segment_size: usize, max_cache_size: usize) -> Self {
        PreservedMarks {
            stack: SegmentedStack::new(segment_size, max_cache_size),
        }
    }

    pub fn size(&self) -> usize {
        self.stack.size()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// The number of empty segments held for reuse.
    pub fn cache_size(&self) -> usize {
        self.stack.cache_size()
    }

    /// Record `mark` for `object` unconditionally.
    pub fn push_always(&mut self, object: ObjectReference, mark: MarkWord) {
        self.stack.push(ObjectAndMarkWord::new(object, mark));
    }

    /// Record `mark` for `object` if the binding says the mark carries information that must
    /// survive the overwrite. Returns whether it was recorded.
    pub fn push_if_necessary<VM: VMBinding>(
        &mut self,
        object: ObjectReference,
        mark: MarkWord,
    ) -> bool {
        if VM::VMObjectModel::mark_must_be_preserved(object, mark) {
            self.push_always(object, mark);
            true
        } else {
            false
        }
    }

    /// Called right before the collector overwrites the header of `object` with a forwarding
    /// marker. If the header is already a forwarding marker, the object was overwritten earlier in
    /// this cycle and its original mark was dealt with then, so nothing is recorded. Otherwise the
    /// still intact mark word is read and recorded if necessary.
    ///
    /// An object whose header was made intact again (e.g. by an earlier restoration, or because it
    /// is the copy of a forwarded object) is recorded again. That is harmless: restoration is LIFO,
    /// so the mark recorded first is the one that survives.
    pub fn record_if_not_preserved<VM: VMBinding>(&mut self, object: ObjectReference) -> bool {
        if object.is_forwarded::<VM>() {
            return false;
        }
        let mark = VM::VMObjectModel::read_mark_word(object);
        self.push_if_necessary::<VM>(object, mark)
    }

    /// Remove and return the most recently recorded entry.
    ///
    /// Panics if the stack is empty.
    pub fn pop(&mut self) -> ObjectAndMarkWord {
        match self.stack.pop() {
            Some(elem) => elem,
            None => panic!("pop from an empty preserved marks stack"),
        }
    }

    /// Visit the entries in recording order, allowing them to be re-targeted.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ObjectAndMarkWord> + '_ {
        self.stack.iter_mut()
    }

    /// Write every recorded mark back, most recent first, leaving the stack empty with no cached
    /// segments.
    pub fn restore<VM: VMBinding>(&mut self) {
        while let Some(elem) = self.stack.pop() {
            elem.set_mark::<VM>();
        }
        self.reset();
        if CHECKED {
            self.assert_empty();
        }
    }

    /// Like [`PreservedMarks::restore`], and add the number of restored entries to `total_size`.
    pub fn restore_and_increment<VM: VMBinding>(&mut self, total_size: &AtomicUsize) {
        let stack_size = self.size();
        self.restore::<VM>();
        // Only do the atomic add if the size is > 0.
        if stack_size > 0 {
            total_size.fetch_add(stack_size, Ordering::SeqCst);
        }
    }

    /// After objects have been forwarded again, point each entry whose object was forwarded at
    /// the forwardee. Only one hop is followed. Returns the number of entries changed.
    pub fn adjust_during_full_gc<VM: VMBinding>(&mut self) -> usize {
        let mut adjusted = 0;
        for elem in self.iter_mut() {
            if let Some(new_object) = elem.object().get_forwarded_object::<VM>() {
                elem.set_object(new_object);
                adjusted += 1;
            }
        }
        adjusted
    }

    /// Drop all entries and release every segment, so no memory is carried into the next cycle.
    pub fn reset(&mut self) {
        self.stack.clear();
    }

    /// Assert that the stack has no entries and no cached segments.
    pub fn assert_empty(&self) {
        assert!(
            self.stack.is_empty(),
            "stack expected to be empty, size = {}",
            self.stack.size()
        );
        assert_eq!(
            self.stack.cache_size(),
            0,
            "stack expected to have no cached segments, cache size = {}",
            self.stack.cache_size()
        );
    }

    /// Reset the header of a forwarded object to the binding's initial mark word, removing the
    /// forwarding marker. Used for objects whose original mark did not need preserving.
    pub fn init_forwarded_mark<VM: VMBinding>(object: ObjectReference) {
        debug_assert!(object.is_forwarded::<VM>());
        VM::VMObjectModel::write_mark_word(object, VM::VMObjectModel::initial_mark_word(object));
    }
}

/// An object visitor that removes the forwarding marker from every forwarded object it visits.
pub struct RemoveForwardedPointers<VM: VMBinding> {
    cleared: usize,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> Default for RemoveForwardedPointers<VM> {
    fn default() -> Self {
        Self::new()
    }
}

impl<VM: VMBinding> RemoveForwardedPointers<VM> {
    pub fn new() -> Self {
        RemoveForwardedPointers {
            cleared: 0,
            phantom: PhantomData,
        }
    }

    pub fn do_object(&mut self, object: ObjectReference) {
        if object.is_forwarded::<VM>() {
            PreservedMarks::init_forwarded_mark::<VM>(object);
            self.cleared += 1;
        }
    }

    /// The number of forwarded objects visited so far.
    pub fn cleared(&self) -> usize {
        self.cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_util::mock_vm::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn restore_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut heap = MockHeap::new();
        let originals: Vec<MarkWord> = (0..5000)
            .map(|_| hashed_mark(rng.random_range(1..1 << 20)))
            .collect();
        let objects: Vec<ObjectReference> = originals.iter().map(|m| heap.alloc(*m)).collect();

        let mut marks = PreservedMarks::with_geometry(64, 0);
        for (object, mark) in objects.iter().zip(&originals) {
            marks.push_always(*object, *mark);
            // The collector now clobbers the header.
            MockHeap::set_mark(*object, locked_mark(0xdead));
        }
        assert_eq!(marks.size(), objects.len());

        marks.restore::<MockVM>();
        for (object, mark) in objects.iter().zip(&originals) {
            assert_eq!(heap.mark(*object), *mark);
        }
        assert!(marks.is_empty());
        assert_eq!(marks.cache_size(), 0);
    }

    #[test]
    fn earliest_preserved_mark_wins() {
        let mut heap = MockHeap::new();
        let w1 = hashed_mark(1);
        let w2 = locked_mark(2);
        let x = heap.alloc(w1);

        let mut marks = PreservedMarks::new();
        marks.push_always(x, w1);
        MockHeap::set_mark(x, w2);
        marks.push_always(x, w2);
        MockHeap::set_mark(x, PROTOTYPE);

        marks.restore::<MockVM>();
        assert_eq!(heap.mark(x), w1);
    }

    #[test]
    fn pop_is_lifo() {
        let mut heap = MockHeap::new();
        let objects = heap.alloc_many(3, hashed_mark);
        let mut marks = PreservedMarks::with_geometry(2, 0);
        for (i, object) in objects.iter().enumerate() {
            marks.push_always(*object, hashed_mark(i));
        }
        for (i, object) in objects.iter().enumerate().rev() {
            assert_eq!(
                marks.pop(),
                ObjectAndMarkWord::new(*object, hashed_mark(i))
            );
        }
    }

    #[test]
    #[should_panic(expected = "pop from an empty preserved marks stack")]
    fn pop_empty() {
        PreservedMarks::new().pop();
    }

    #[test]
    fn push_if_necessary_skips_prototype() {
        let mut heap = MockHeap::new();
        let plain = heap.alloc(PROTOTYPE);
        let hashed = heap.alloc(hashed_mark(3));
        let mut marks = PreservedMarks::new();
        assert!(!marks.push_if_necessary::<MockVM>(plain, PROTOTYPE));
        assert!(marks.push_if_necessary::<MockVM>(hashed, hashed_mark(3)));
        assert_eq!(marks.size(), 1);
        marks.restore::<MockVM>();
    }

    #[test]
    fn record_if_not_preserved_skips_forwarded() {
        let mut heap = MockHeap::new();
        let a = heap.alloc(hashed_mark(5));
        let mut marks = PreservedMarks::new();

        // First overwrite: the intact mark is recorded.
        assert!(marks.record_if_not_preserved::<MockVM>(a));
        let copy = heap.forward(a);
        // The header is now a forwarding marker: nothing more to record.
        assert!(!marks.record_if_not_preserved::<MockVM>(a));
        // The copy has the prototype header, which needs no preservation.
        assert!(!marks.record_if_not_preserved::<MockVM>(copy));
        assert_eq!(marks.size(), 1);

        marks.restore::<MockVM>();
        assert_eq!(heap.mark(a), hashed_mark(5));
    }

    #[test]
    fn repeated_record_keeps_earliest_mark() {
        let mut heap = MockHeap::new();
        let x = heap.alloc(hashed_mark(10));
        let mut marks = PreservedMarks::new();

        assert!(marks.record_if_not_preserved::<MockVM>(x));
        // The header was made intact again but different, e.g. by a binding that re-installed a
        // lock word. A second record is taken.
        MockHeap::set_mark(x, locked_mark(11));
        assert!(marks.record_if_not_preserved::<MockVM>(x));
        assert_eq!(marks.size(), 2);

        MockHeap::set_mark(x, PROTOTYPE);
        marks.restore::<MockVM>();
        assert_eq!(heap.mark(x), hashed_mark(10));
    }

    #[test]
    fn adjust_follows_one_hop() {
        let mut heap = MockHeap::new();
        let a = heap.alloc(hashed_mark(1));
        let c = heap.alloc(hashed_mark(2));
        let mut marks = PreservedMarks::with_geometry(1, 0);
        marks.push_always(a, hashed_mark(1));
        marks.push_always(c, hashed_mark(2));

        // Second relocation round: `a` moves to `b`, `c` stays.
        let b = heap.forward(a);
        assert_eq!(marks.adjust_during_full_gc::<MockVM>(), 1);

        let entries: Vec<ObjectAndMarkWord> = marks.iter_mut().map(|e| *e).collect();
        assert_eq!(
            entries,
            vec![
                ObjectAndMarkWord::new(b, hashed_mark(1)),
                ObjectAndMarkWord::new(c, hashed_mark(2)),
            ]
        );

        marks.restore::<MockVM>();
        assert_eq!(heap.mark(b), hashed_mark(1));
        assert_eq!(heap.mark(c), hashed_mark(2));
    }

    #[test]
    fn restore_and_increment_counts() {
        let mut heap = MockHeap::new();
        let objects = heap.alloc_many(7, hashed_mark);
        let total = AtomicUsize::new(3);
        let mut marks = PreservedMarks::new();
        marks.restore_and_increment::<MockVM>(&total);
        assert_eq!(total.load(Ordering::SeqCst), 3);
        for object in &objects {
            marks.push_always(*object, heap.mark(*object));
        }
        marks.restore_and_increment::<MockVM>(&total);
        assert_eq!(total.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn restore_releases_cached_segments() {
        let mut heap = MockHeap::new();
        let objects = heap.alloc_many(100, hashed_mark);
        let mut marks = PreservedMarks::with_geometry(8, 4);
        for object in &objects {
            marks.push_always(*object, heap.mark(*object));
        }
        // Shrinking caches segments...
        for _ in 0..50 {
            marks.pop().set_mark::<MockVM>();
        }
        assert!(marks.cache_size() > 0);
        // ...but a full restoration leaves nothing behind.
        marks.restore::<MockVM>();
        marks.assert_empty();
    }

    #[test]
    fn remove_forwarded_pointers() {
        let mut heap = MockHeap::new();
        let a = heap.alloc(PROTOTYPE);
        let b = heap.alloc(PROTOTYPE);
        heap.forward(a);

        let mut closure = RemoveForwardedPointers::<MockVM>::new();
        closure.do_object(a);
        closure.do_object(b);
        assert_eq!(closure.cleared(), 1);
        assert!(!a.is_forwarded::<MockVM>());
        assert_eq!(heap.mark(a), PROTOTYPE);
    }
}
