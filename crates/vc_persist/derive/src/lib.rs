//! See [`Persist`].
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static PERSIST_ATTRIBUTE_NAME: &str = "persist";

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod impls;
mod path;

// -----------------------------------------------------------------------------
// Macros

/// # Persistence Derivation
///
/// `#[derive(Persist)]` implements `Typed` (and through it `Persist`) for:
///
/// - structs with named fields: class types, encoded as one document field
///   per struct field, in declaration order;
/// - unit structs: class types without members, encoded as `{}`;
/// - enums whose variants are all units: encoded as the variant name.
///
/// Tuple structs, data-carrying enums and unions are rejected.
///
/// ## Construction
///
/// By default a class is **immutable**: every field is a read-only
/// property, and decoding calls one constructor taking every field.
///
/// With `default` the class is **mutable**: decoding starts from
/// `Default::default()` and assigns every field the document carries,
/// so fields missing from old documents keep their defaults.
///
/// ```rust, ignore
/// #[derive(Persist, Default)]
/// #[persist(default)]
/// struct Settings { /* ... */ }
/// ```
///
/// ## Type Path
///
/// The discriminator is the module path plus the type name, with `::`
/// replaced by `.`. Override it to keep documents stable across moves:
///
/// ```rust, ignore
/// #[derive(Persist)]
/// #[persist(type_path = "Geo.Point")]
/// struct Point { /* ... */ }
/// ```
///
/// Generic parameters are appended (`Geo.Pair<i32,String>`) and must
/// themselves be `Typed`.
///
/// ## Names
///
/// Field and variant names are used as they are written, unless renamed:
///
/// - `#[persist(rename_all = "..")]` on the type: one of `PascalCase`,
///   `camelCase`, `snake_case`, `SCREAMING_SNAKE_CASE`, `lowercase`,
///   `UPPERCASE`.
/// - `#[persist(rename = "..")]` on a field or variant, which wins.
///
/// ## Interfaces
///
/// `#[persist(implements(Shape, ..))]` registers the casts that let the type
/// be read back into `Box<dyn Shape>` slots. Each trait needs
/// `impl_persist_interface!`.
///
/// ## Static Registration
///
/// `#[persist(auto_register)]` submits the type for
/// `TypeRegistry::auto_register`. Requires the `auto_register` feature and
/// a non-generic type; without the feature the flag does nothing.
#[proc_macro_derive(Persist, attributes(persist))]
pub fn derive_persist(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match impls::impl_persist(&ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}
