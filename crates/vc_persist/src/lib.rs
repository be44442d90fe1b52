//! Polymorphic object-graph persistence over [`DocumentValue`] trees.
//!
//! ## Menu
//!
//! - [`Typed`] / [`Persist`]: the static and object-safe faces of a
//!   persistable type. Implement through [`derive::Persist`].
//! - [`schema`]: the per-class introspection record ([`ClassShape`]) and the
//!   derived [`ClassSchema`] (mutable or constructor-only).
//! - [`registry`]: [`TypeRegistry`] maps discriminators to types and caches
//!   schemas; [`TypeRegistryArc`] shares one across threads.
//! - [`ser`] / [`de`]: the drivers turning values into documents and back,
//!   with the version gate that runs stale documents through
//!   [`vc_migrate::upgrade`].
//!
//! ## Wire contract
//!
//! A value whose runtime type differs from the declared slot type (a
//! `Box<dyn Trait>` slot) is wrapped as `{"_t": <descriptor>, "_v": <value>}`.
//! Monomorphic slots carry no discriminator.
//!
//! # Examples
//!
//! ```
//! use vc_persist::{PersistConfig, derive::Persist, registry::TypeRegistryArc};
//!
//! #[derive(Persist, Debug, PartialEq)]
//! #[persist(type_path = "Geo.Point")]
//! struct Point {
//!     #[persist(rename = "X")]
//!     x: i32,
//!     #[persist(rename = "Y")]
//!     y: i32,
//! }
//!
//! let registry = TypeRegistryArc::default();
//! let config = PersistConfig::default();
//!
//! let doc = registry.serialize(&Point { x: 1, y: 2 }, &config).unwrap();
//! assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"X":1,"Y":2}"#);
//!
//! let back: Point = registry.deserialize(&doc, &config).unwrap();
//! assert_eq!(back, Point { x: 1, y: 2 });
//! ```
//!
//! [`DocumentValue`]: vc_document::DocumentValue
//! [`ClassShape`]: schema::ClassShape
//! [`ClassSchema`]: schema::ClassSchema
//! [`TypeRegistry`]: registry::TypeRegistry
//! [`TypeRegistryArc`]: registry::TypeRegistryArc
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// Derive output names `::vc_persist`, which must also work inside this crate.
extern crate self as vc_persist;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod config;
mod error;
mod typed;

pub mod de;
pub mod impls;
pub mod registry;
pub mod schema;
pub mod ser;

// -----------------------------------------------------------------------------
// Top-Level exports

#[doc(hidden)]
pub mod __macro_exports;

pub use config::PersistConfig;
pub use error::PersistError;
pub use typed::{Persist, Typed};
pub use vc_persist_derive as derive;
