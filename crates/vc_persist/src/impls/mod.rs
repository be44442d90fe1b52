//! [`Typed`](crate::Typed) implementations for leaves and containers.
//!
//! ## Implemented Menu
//!
//! - leaves:
//!     - `bool`, `char`, `String`, `()` (`Unit`, encoded as null)
//!     - `i8`-`i128`, `u8`-`u128`, `isize`, `usize`: document integers are
//!       `i64`, wider values fail to encode
//!     - `f32`, `f64`: integers widen on decode
//!     - `DocumentValue` (pass-through), `TypeDescriptor`, `MethodRef`
//!       (their document forms)
//!     - `Uuid` ("uuid" feature), `DateTime<Utc>` ("chrono" feature)
//! - containers:
//!     - `Vec<T>`, `VecDeque<T>`, `Option<T>` (`None` is null)
//!     - `HashSet<T>`, `BTreeSet<T>`
//!     - `HashMap<K, V>`, `BTreeMap<K, V>`: a `String` key gives a document,
//!       any other key an array of `{"Key": k, "Value": v}` entries
//!     - `(P0,)` .. `(P0, .., P5)` as `Tuple<..>`, `[T; N]` as `ArrayN<T>`
//!     - hash-ordered containers are written in
//!       [`canonical_cmp`](vc_document::DocumentValue::canonical_cmp) order
//! - slots:
//!     - `Box<dyn Persist>` (`Object`), and `Box<dyn Trait>` through
//!       [`impl_persist_interface!`](crate::impl_persist_interface)

// -----------------------------------------------------------------------------
// Modules

mod map;
mod object;
mod primitive;
mod sequence;
mod tuple;

#[cfg(feature = "chrono")]
mod chrono;
#[cfg(feature = "uuid")]
mod uuid;
