use bytemuck::NoUninit;

use std::fmt;

/// The header word of an object that the collector may overwrite, e.g. with a forwarding
/// pointer. It may hold an identity hash, lock state or age bits. This crate never interprets
/// the bits; only the binding's [`crate::vm::ObjectModel`] does.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialEq, NoUninit)]
pub struct MarkWord(usize);

impl MarkWord {
    /// Wrap a raw header word.
    pub const fn from_usize(raw: usize) -> MarkWord {
        MarkWord(raw)
    }

    /// The raw header word.
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for MarkWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for MarkWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MarkWord({:#x})", self.0)
    }
}
