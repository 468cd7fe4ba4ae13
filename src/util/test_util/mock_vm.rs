//! A mock binding whose objects are real heap cells with an atomic header word.
//!
//! Header layout, in the spirit of a typical JVM mark word:
//!
//! * low two bits `0b01`: unlocked. `0b00`: locked. `0b11`: forwarded, and the remaining bits are
//!   the address of the forwardee (objects are 16-byte aligned, so the low bits are free).
//! * bits 8 and up (when not forwarded): identity hash. Zero means "no hash yet".
//!
//! The prototype header is `0b01`. Only marks that differ from it must be preserved.

use atomic::Atomic;

use std::sync::atomic::Ordering;

use crate::util::{Address, MarkWord, ObjectReference};
use crate::vm::{ObjectModel, VMBinding};

pub const LOCK_MASK: usize = 0b11;
pub const UNLOCKED: usize = 0b01;
pub const LOCKED: usize = 0b00;
pub const FORWARDED: usize = 0b11;
pub const HASH_SHIFT: usize = 8;

/// The mark word of a new object.
pub const PROTOTYPE: MarkWord = MarkWord::from_usize(UNLOCKED);

/// An unlocked header carrying an identity hash.
pub fn hashed_mark(hash: usize) -> MarkWord {
    MarkWord::from_usize((hash << HASH_SHIFT) | UNLOCKED)
}

/// A locked header carrying an identity hash.
pub fn locked_mark(hash: usize) -> MarkWord {
    MarkWord::from_usize((hash << HASH_SHIFT) | LOCKED)
}

/// The header written over an object moved to `to`.
pub fn forwarding_mark(to: ObjectReference) -> MarkWord {
    let raw = to.to_raw_address().as_usize();
    debug_assert_eq!(raw & LOCK_MASK, 0);
    MarkWord::from_usize(raw | FORWARDED)
}

#[repr(C, align(16))]
pub struct MockObject {
    header: Atomic<MarkWord>,
    /// Some payload, so objects are not just a header.
    pub payload: usize,
}

#[derive(Default)]
pub struct MockVM;

impl VMBinding for MockVM {
    type VMObjectModel = MockObjectModel;
}

pub struct MockObjectModel;

impl MockObjectModel {
    fn header(object: ObjectReference) -> &'static Atomic<MarkWord> {
        // Mock objects are only created by `MockHeap`, which keeps them alive (and at a stable
        // address) for as long as the test uses their references.
        unsafe { &(*object.to_raw_address().to_ptr::<MockObject>()).header }
    }
}

impl ObjectModel<MockVM> for MockObjectModel {
    fn read_mark_word(object: ObjectReference) -> MarkWord {
        Self::header(object).load(Ordering::SeqCst)
    }

    fn write_mark_word(object: ObjectReference, mark: MarkWord) {
        Self::header(object).store(mark, Ordering::SeqCst)
    }

    fn is_forwarded(object: ObjectReference) -> bool {
        Self::read_mark_word(object).as_usize() & LOCK_MASK == FORWARDED
    }

    fn get_forwardee(object: ObjectReference) -> ObjectReference {
        debug_assert!(Self::is_forwarded(object));
        let raw = Self::read_mark_word(object).as_usize() & !LOCK_MASK;
        unsafe { ObjectReference::from_raw_address_unchecked(Address::from_usize(raw)) }
    }

    fn initial_mark_word(_object: ObjectReference) -> MarkWord {
        PROTOTYPE
    }

    fn mark_must_be_preserved(_object: ObjectReference, mark: MarkWord) -> bool {
        mark != PROTOTYPE
    }
}

/// Owns mock objects. References handed out stay valid until the heap is dropped.
#[derive(Default)]
pub struct MockHeap {
    objects: Vec<Box<MockObject>>,
}

impl MockHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an object with the given mark word.
    pub fn alloc(&mut self, mark: MarkWord) -> ObjectReference {
        let object = Box::new(MockObject {
            header: Atomic::new(mark),
            payload: self.objects.len(),
        });
        let addr = Address::from_ref::<MockObject>(&object);
        self.objects.push(object);
        ObjectReference::from_raw_address(addr).unwrap()
    }

    /// Allocate `n` objects, object `i` getting `mark(i)`.
    pub fn alloc_many(
        &mut self,
        n: usize,
        mark: impl Fn(usize) -> MarkWord,
    ) -> Vec<ObjectReference> {
        (0..n).map(|i| self.alloc(mark(i))).collect()
    }

    /// Copy `from` to a fresh object and install a forwarding marker in `from`, the way a
    /// relocating collector does. The copy gets the prototype header. Returns the copy.
    pub fn forward(&mut self, from: ObjectReference) -> ObjectReference {
        let to = self.alloc(PROTOTYPE);
        Self::set_mark(from, forwarding_mark(to));
        to
    }

    pub fn mark(&self, object: ObjectReference) -> MarkWord {
        MockObjectModel::read_mark_word(object)
    }

    pub fn set_mark(object: ObjectReference, mark: MarkWord) {
        MockObjectModel::write_mark_word(object, mark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarding_round_trip() {
        let mut heap = MockHeap::new();
        let a = heap.alloc(hashed_mark(7));
        assert!(!a.is_forwarded::<MockVM>());
        assert_eq!(a.get_forwarded_object::<MockVM>(), None);

        let b = heap.forward(a);
        assert!(a.is_forwarded::<MockVM>());
        assert_eq!(a.get_forwarded_object::<MockVM>(), Some(b));
        assert_eq!(heap.mark(b), PROTOTYPE);
    }

    #[test]
    fn prototype_needs_no_preservation() {
        let mut heap = MockHeap::new();
        let a = heap.alloc(PROTOTYPE);
        assert!(!MockObjectModel::mark_must_be_preserved(a, PROTOTYPE));
        assert!(MockObjectModel::mark_must_be_preserved(a, hashed_mark(1)));
        assert!(MockObjectModel::mark_must_be_preserved(a, locked_mark(0)));
    }
}
