use std::fmt;
use std::num::NonZeroUsize;

use crate::vm::{ObjectModel, VMBinding};

/// Address represents an arbitrary address. Bindings use it to convert between their own
/// pointers and [`ObjectReference`]. This type is zero overhead (memory wise and time wise).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq)]
pub struct Address(usize);

impl Address {
    /// The lowest possible address.
    pub const ZERO: Self = Address(0);

    /// creates Address from a Rust reference
    pub fn from_ref<T>(r: &T) -> Address {
        Address(r as *const T as usize)
    }

    /// creates an arbitrary Address
    /// # Safety
    /// It is unsafe and the user needs to be aware that they may create an invalid address.
    /// This should only be used for hard-coded addresses and for decoding addresses that a
    /// binding packed into a header word.
    pub const unsafe fn from_usize(raw: usize) -> Address {
        Address(raw)
    }

    /// is this address zero?
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// converts the Address to a pointer
    pub fn to_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    /// converts the Address into a usize
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

/// allows Display format the Address (as hex value with 0x prefix)
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// allows Debug format the Address (as hex value with 0x prefix)
impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// ObjectReference represents the current address of an object. Compared with Address,
/// operations allowed on ObjectReference are very limited. No address arithmetics
/// are allowed for ObjectReference.
///
/// An `ObjectReference` is never null. It is a snapshot of where an object lives: once the
/// collector moves the object again, an old reference becomes stale. Whether that happened can
/// be asked with [`ObjectReference::is_forwarded`], and the new location obtained with
/// [`ObjectReference::get_forwarded_object`].
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq)]
pub struct ObjectReference(NonZeroUsize);

impl ObjectReference {
    /// Cast the object reference to its raw address.
    pub fn to_raw_address(self) -> Address {
        Address(self.0.get())
    }

    /// Cast a raw address to an object reference. Returns `None` for the zero address.
    ///
    /// This is how a binding creates `ObjectReference` instances.
    pub fn from_raw_address(addr: Address) -> Option<ObjectReference> {
        NonZeroUsize::new(addr.0).map(ObjectReference)
    }

    /// Like `from_raw_address`, but assume `addr` is not zero.
    ///
    /// # Safety
    /// `addr` must not be zero.
    pub unsafe fn from_raw_address_unchecked(addr: Address) -> ObjectReference {
        debug_assert!(!addr.is_zero());
        ObjectReference(NonZeroUsize::new_unchecked(addr.0))
    }

    /// Does the header of this object currently hold a forwarding marker?
    pub fn is_forwarded<VM: VMBinding>(self) -> bool {
        VM::VMObjectModel::is_forwarded(self)
    }

    /// Get the new location of this object if it is forwarded, or `None` if it is not.
    /// Only one hop of forwarding is followed.
    pub fn get_forwarded_object<VM: VMBinding>(self) -> Option<Self> {
        if self.is_forwarded::<VM>() {
            Some(VM::VMObjectModel::get_forwardee(self))
        } else {
            None
        }
    }
}

/// allows Display format the ObjectReference (as hex value with 0x prefix)
impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

/// allows Debug format the ObjectReference (as hex value with 0x prefix)
impl fmt::Debug for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}
