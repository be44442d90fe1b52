//! Per-class introspection and the schema derived from it.
//!
//! A class type describes itself once, at compile time, with a
//! [`ClassShape`]: its readable properties (each with an optional setter),
//! its constructors and an optional parameterless factory. The registry
//! turns the shape into a [`ClassSchema`] on first use:
//!
//! - **Mutable**: created by a parameterless factory or constructor, then
//!   populated through setters.
//! - **Immutable**: no parameterless creation and no setter; built by the
//!   constructor of highest arity whose parameters each match exactly one
//!   property name, ignoring ASCII case. Among equal arities the first
//!   declared wins.
//!
//! A shape that fits neither is unsupported.

// -----------------------------------------------------------------------------
// Modules

mod class_schema;
mod shape;

// -----------------------------------------------------------------------------
// Exports

pub use class_schema::{ClassSchema, MemberAccess, MemberBinding, SchemaKind};
pub use shape::{ClassShape, Constructor, ConstructorArgs, Property};
