use crate::util::{MarkWord, ObjectReference};
use crate::vm::VMBinding;

/// Header access for a binding's objects.
///
/// The collector overwrites an object's mark word with a forwarding marker when it moves the
/// object. The engine relies on the binding to tell a forwarded header apart from an ordinary
/// one, and to decode the forwarding target.
///
/// Calls during restoration and adjustment may happen on any GC worker thread, but never for the
/// same object from two threads at once.
pub trait ObjectModel<VM: VMBinding> {
    /// Read the current mark word of an object.
    ///
    /// Arguments:
    /// * `object`: The object.
    fn read_mark_word(object: ObjectReference) -> MarkWord;

    /// Overwrite the mark word of an object.
    ///
    /// Arguments:
    /// * `object`: The object.
    /// * `mark`: The new mark word.
    fn write_mark_word(object: ObjectReference, mark: MarkWord);

    /// Does the object's header currently hold a forwarding marker?
    fn is_forwarded(object: ObjectReference) -> bool;

    /// The new location of a forwarded object. Only called if `is_forwarded(object)` is true.
    fn get_forwardee(object: ObjectReference) -> ObjectReference;

    /// The mark word a freshly allocated object of this kind would have, e.g. a prototype header
    /// with no hash and no lock state. Used to clean up forwarded objects whose original mark
    /// word was not preserved.
    fn initial_mark_word(object: ObjectReference) -> MarkWord;

    /// Does `mark` carry information that would be lost if the header were overwritten and then
    /// reset to [`ObjectModel::initial_mark_word`]? Only such marks are preserved by
    /// [`crate::PreservedMarks::push_if_necessary`].
    ///
    /// The default preserves everything.
    fn mark_must_be_preserved(object: ObjectReference, mark: MarkWord) -> bool {
        let _ = (object, mark);
        true
    }
}
