//! Structural migration of persisted documents.
//!
//! A [`Converter`] is an immutable rule set describing how old type names,
//! member names and method signatures map onto the current model, which
//! definitions were deleted, and which types need a custom field-map
//! transformation. [`upgrade`] walks a [`DocumentValue`] tree bottom-up and
//! applies those rules without ever consulting live type definitions.
//!
//! ```
//! use vc_document::{Document, DocumentValue};
//! use vc_migrate::{ConverterBuilder, upgrade};
//!
//! let converter = ConverterBuilder::new()
//!     .rename_type("Old.Beam", "New.Girder")
//!     .rename_member("Old.Beam.Len", "Length")
//!     .build()
//!     .unwrap();
//!
//! let mut doc = Document::new();
//! doc.insert("_t", DocumentValue::from("Old.Beam"));
//! doc.insert("Len", DocumentValue::Int(3));
//!
//! let value = DocumentValue::Document(doc);
//! let upgraded = upgrade(&value, &converter).unwrap();
//! assert_eq!(upgraded.get("_t").and_then(|v| v.as_str()), Some("New.Girder"));
//! assert_eq!(upgraded.get("Length").and_then(|v| v.as_i64()), Some(3));
//! ```
//!
//! [`DocumentValue`]: vc_document::DocumentValue
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod converter;
mod error;
mod upgrade;

// -----------------------------------------------------------------------------
// Exports

pub use converter::{Converter, ConverterBuilder, DEFAULT_IDENTITY_FIELDS, ObjectMigrator};
pub use error::{ConverterError, UpgradeError};
pub use upgrade::upgrade;
