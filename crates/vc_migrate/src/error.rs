use alloc::string::String;

use thiserror::Error;
use vc_document::DescriptorError;

// -----------------------------------------------------------------------------
// UpgradeError

/// Failure of a whole [`upgrade`](crate::upgrade) call.
///
/// No partially migrated document is ever returned alongside an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpgradeError {
    /// The document references an identifier listed as deleted.
    ///
    /// The message is the stored explanation, verbatim.
    #[error("{explanation}")]
    DeletedDefinition { identifier: String, explanation: String },

    /// A `_t` discriminator could not be parsed.
    #[error("malformed discriminator `{text}`: {error}")]
    Discriminator { text: String, error: DescriptorError },
}

// -----------------------------------------------------------------------------
// ConverterError

/// A rule set that cannot be migrated to a fixed point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConverterError {
    #[error("type renames form a cycle through `{name}`")]
    TypeCycle { name: String },

    #[error("rename target `{target}` of `{name}` would be renamed again to `{again}`")]
    TypeRematch {
        name: String,
        target: String,
        again: String,
    },

    #[error("`{name}` is renamed to `{target}`, which is deleted")]
    RenamedToDeleted { name: String, target: String },

    #[error("member rename key `{key}` is not of the form `Type.Member`")]
    MemberKey { key: String },

    #[error("member renames of `{type_name}` form a cycle through `{member}`")]
    MemberCycle { type_name: String, member: String },

    #[error("replacement of method `{signature}` is itself replaced")]
    MethodRematch { signature: String },

    #[error("malformed method signature: {0}")]
    Signature(#[from] DescriptorError),

    #[error("table `{table}`: {message}")]
    Table { table: &'static str, message: String },
}
