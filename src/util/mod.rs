//! Utilities used by the preserved marks engine and by bindings.

/// Address and object reference types.
pub mod address;
/// Logger initialization
pub mod logger;
/// The mark word type.
pub mod mark_word;
/// Options for the engine.
pub mod options;
/// A growable stack made of fixed-size segments.
pub mod segmented_stack;

/// Test utilities, including a mock binding. Exposed to benchmarks via `test_private`.
#[cfg(any(test, feature = "test_private"))]
pub mod test_util;

pub use self::address::Address;
pub use self::address::ObjectReference;
pub use self::mark_word::MarkWord;
