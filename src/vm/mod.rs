//! The binding interface: how the preserved marks engine reads and writes object headers.
//!
//! A runtime implements [`VMBinding`] on a zero-sized type and supplies an [`ObjectModel`]
//! describing its header layout. All methods are static; the engine is generic over the binding
//! so the calls are resolved at compile time.

mod object_model;
pub use self::object_model::ObjectModel;

/// The `VMBinding` trait associates the engine with a runtime's object model.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync + Default,
{
    /// The binding's object model.
    type VMObjectModel: ObjectModel<Self>;
}
