// Each test binary uses a different subset of this module.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use preserved_marks::vm::{ObjectModel, VMBinding};
use preserved_marks::{Address, MarkWord, ObjectReference};

/// A header word whose lowest bit is set holds a forwarding pointer in the other bits.
const FORWARDED_BIT: usize = 0b1;
/// A header that carries nothing worth preserving.
pub const NEUTRAL: MarkWord = MarkWord::from_usize(0b10);

#[derive(Default)]
pub struct TestVM;

impl VMBinding for TestVM {
    type VMObjectModel = TestObjectModel;
}

pub struct TestObjectModel;

fn header(object: ObjectReference) -> &'static AtomicUsize {
    // Objects are slots of a `Heap`, which outlives every test that uses its references.
    unsafe { &*object.to_raw_address().to_ptr::<AtomicUsize>() }
}

impl ObjectModel<TestVM> for TestObjectModel {
    fn read_mark_word(object: ObjectReference) -> MarkWord {
        MarkWord::from_usize(header(object).load(Ordering::SeqCst))
    }

    fn write_mark_word(object: ObjectReference, mark: MarkWord) {
        header(object).store(mark.as_usize(), Ordering::SeqCst)
    }

    fn is_forwarded(object: ObjectReference) -> bool {
        header(object).load(Ordering::SeqCst) & FORWARDED_BIT != 0
    }

    fn get_forwardee(object: ObjectReference) -> ObjectReference {
        let raw = header(object).load(Ordering::SeqCst) & !FORWARDED_BIT;
        ObjectReference::from_raw_address(unsafe { Address::from_usize(raw) }).unwrap()
    }

    fn initial_mark_word(_object: ObjectReference) -> MarkWord {
        NEUTRAL
    }

    fn mark_must_be_preserved(_object: ObjectReference, mark: MarkWord) -> bool {
        mark != NEUTRAL
    }
}

/// A fixed-capacity arena of object headers. Slots never move.
pub struct Heap {
    headers: Vec<AtomicUsize>,
    used: usize,
}

impl Heap {
    pub fn with_capacity(capacity: usize) -> Self {
        Heap {
            headers: (0..capacity).map(|_| AtomicUsize::new(NEUTRAL.as_usize())).collect(),
            used: 0,
        }
    }

    pub fn alloc(&mut self, mark: MarkWord) -> ObjectReference {
        assert!(self.used < self.headers.len(), "test heap is full");
        let slot = &self.headers[self.used];
        self.used += 1;
        slot.store(mark.as_usize(), Ordering::SeqCst);
        ObjectReference::from_raw_address(Address::from_ref(slot)).unwrap()
    }

    /// Move `object`: allocate its new copy and leave a forwarding pointer behind.
    pub fn forward(&mut self, object: ObjectReference) -> ObjectReference {
        let copy = self.alloc(NEUTRAL);
        header(object).store(
            copy.to_raw_address().as_usize() | FORWARDED_BIT,
            Ordering::SeqCst,
        );
        copy
    }

    /// Overwrite the header the way a collector does with a temporary marker.
    pub fn clobber(&self, object: ObjectReference) {
        header(object).store(0xdead_0000, Ordering::SeqCst);
    }

    pub fn set_mark(&self, object: ObjectReference, mark: MarkWord) {
        header(object).store(mark.as_usize(), Ordering::SeqCst);
    }

    pub fn mark(&self, object: ObjectReference) -> MarkWord {
        TestObjectModel::read_mark_word(object)
    }
}

/// A mark word that must be preserved, distinct for each `i`.
pub fn interesting_mark(i: usize) -> MarkWord {
    MarkWord::from_usize((i + 1) << 4)
}
