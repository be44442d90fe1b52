//! The type catalog used to resolve discriminators and cache schemas.
//!
//! ## Menu
//!
//! - [`TypeMeta`]: one registered type, its descriptor key, its decode entry
//!   point, its lazily derived schema and a [`TypeTrait`] table.
//! - [`TypeRegistry`]: the catalog; [`TypeRegistryArc`] shares it.
//! - [`TypeList`]: tuples of types for [`TypeRegistry::register_types`].
//! - [`Upcast`]: the type trait that fills `Box<dyn Trait>` slots.
//!
//! ## auto_register
//!
//! See [`TypeRegistry::auto_register`]. Static registration relies on the
//! [`inventory`](https://docs.rs/inventory) crate; on platforms it does not
//! support, `auto_register` registers nothing and reports `0`.

// -----------------------------------------------------------------------------
// Modules

mod type_list;
mod type_meta;
mod type_registry;
mod type_trait;

// -----------------------------------------------------------------------------
// Exports

pub use type_list::TypeList;
pub use type_meta::TypeMeta;
pub use type_registry::{TypeRegistry, TypeRegistryArc};
pub use type_trait::{FromType, TypeTrait, Upcast};
