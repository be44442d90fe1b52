use alloc::string::String;

use thiserror::Error;

use crate::ValueKind;

// -----------------------------------------------------------------------------
// DescriptorError

/// Failure to read a [`TypeDescriptor`](crate::TypeDescriptor) or a
/// [`MethodRef`](crate::MethodRef) from its textual or document form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DescriptorError {
    #[error("empty type name in `{input}`")]
    EmptyName { input: String },

    #[error("unexpected `{found}` at offset {offset} in `{input}`")]
    Unexpected {
        input: String,
        offset: usize,
        found: char,
    },

    #[error("unterminated generic argument list in `{input}`")]
    Unterminated { input: String },

    #[error("generic nesting deeper than {limit} in `{input}`")]
    TooDeep { input: String, limit: usize },

    #[error("expected field `{field}` of kind {expected}, found {found}")]
    Field {
        field: &'static str,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("type `{name}` declares arity {declared} but carries {actual} generic arguments")]
    ArityMismatch {
        name: String,
        declared: usize,
        actual: usize,
    },

    #[error("expected a `{expected}` reference, found one tagged `{found}`")]
    Tag { expected: &'static str, found: String },

    #[error("malformed method signature `{input}`")]
    Signature { input: String },
}
