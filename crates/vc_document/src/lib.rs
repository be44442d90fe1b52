//! The intermediate form shared by the serializer, the deserializer and the
//! migration engine.
//!
//! ## Menu
//!
//! - [`DocumentValue`]: a tagged-union value tree.
//! - [`Document`]: an insertion-ordered field map.
//! - [`TypeDescriptor`]: a (possibly generic) type name, with a textual
//!   form (`Ns.List<Ns.Item>`) and a tagged document form
//!   (`{"_t": "TypeDescriptor", "Name", "GenericArguments"}`).
//! - [`MethodRef`]: a persisted reference to a method signature.
//!
//! Binary framing is out of scope. [`DocumentValue`] implements the `serde`
//! traits so any serde format can carry it.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod descriptor;
mod document;
mod error;
mod method;
mod serde_impl;
mod value;

// -----------------------------------------------------------------------------
// Exports

pub use descriptor::{ARITY_MARKER, MAX_DESCRIPTOR_DEPTH, TypeDescriptor, split_arity};
pub use document::Document;
pub use error::DescriptorError;
pub use method::{CONSTRUCTOR_NAME, MethodRef};
pub use value::{DocumentValue, ValueKind};

/// Field holding the discriminator of a wrapped polymorphic value.
pub const TYPE_FIELD: &str = "_t";

/// Field holding the member document of a wrapped polymorphic value.
pub const VALUE_FIELD: &str = "_v";

/// Field holding the producer schema version of a root document.
pub const VERSION_FIELD: &str = "_version";

/// `_t` of a persisted [`TypeDescriptor`].
///
/// Only documents carrying this tag are treated as type references by the
/// migration engine; a plain `{"Name": ..}` object is ordinary data.
pub const TYPE_REFERENCE_TAG: &str = "TypeDescriptor";

/// `_t` of a persisted [`MethodRef`].
pub const METHOD_REFERENCE_TAG: &str = "MethodRef";
