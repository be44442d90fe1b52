use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;

use thiserror::Error;
use vc_document::{DescriptorError, DocumentValue};
use vc_migrate::UpgradeError;

// -----------------------------------------------------------------------------
// PersistError

/// Failure to serialize or deserialize a value.
///
/// Nothing here is retried: every operation is deterministic.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistError {
    /// The type has no schema the engine can drive.
    #[error("type `{type_name}` is not supported: {reason}")]
    UnsupportedType { type_name: String, reason: String },

    /// A discriminator names no registered type, or more than one.
    #[error("cannot resolve type `{descriptor}`: {reason}")]
    TypeResolution { descriptor: String, reason: String },

    /// A constructor-only type is missing a required field.
    #[error("`{type_name}` cannot be constructed: the document has no value for `{parameter}`")]
    ConstructorArgumentMismatch { type_name: String, parameter: String },

    /// The document had to be migrated and the migration failed.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),

    /// The content does not match the expected shape.
    #[error("expected {expected}, found {found}")]
    Decode { expected: String, found: String },

    /// A unit enum received a name it does not declare.
    #[error("`{value}` is not a variant of `{type_name}`")]
    UnknownVariant { type_name: String, value: String },

    /// The value cannot be represented in a document.
    #[error("cannot encode value: {0}")]
    Encode(String),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// A nested failure, tagged with the member or element it happened in.
    #[error("in `{member}`: {source}")]
    Member {
        member: String,
        source: Box<PersistError>,
    },
}

impl PersistError {
    /// A shape mismatch against `found`.
    pub fn decode(expected: impl Into<String>, found: &DocumentValue) -> Self {
        Self::Decode {
            expected: expected.into(),
            found: String::from(found.kind().name()),
        }
    }

    /// Tags `self` with the member path segment it occurred in.
    #[inline]
    pub fn in_member(self, member: impl Into<String>) -> Self {
        Self::Member {
            member: member.into(),
            source: Box::new(self),
        }
    }

    /// Tags `self` with the position of a sequence element.
    #[inline]
    pub fn in_element(self, index: usize) -> Self {
        self.in_member(format!("[{index}]"))
    }

    /// The innermost error with every [`PersistError::Member`] wrapper removed.
    pub fn root_cause(&self) -> &PersistError {
        let mut error = self;
        while let Self::Member { source, .. } = error {
            error = &**source;
        }
        error
    }

    /// The member path of a nested error, outermost first, e.g. `Shapes.[2].Radius`.
    pub fn member_path(&self) -> String {
        let mut path = String::new();
        let mut error = self;
        while let Self::Member { member, source } = error {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(member);
            error = &**source;
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::PersistError;
    use vc_document::DocumentValue;

    #[test]
    fn member_path_and_root_cause() {
        let error = PersistError::decode("integer", &DocumentValue::from("x"))
            .in_member("Radius")
            .in_member("[2]")
            .in_member("Shapes");
        assert_eq!(error.member_path(), "Shapes.[2].Radius");
        assert!(matches!(error.root_cause(), PersistError::Decode { .. }));
        assert_eq!(
            error.to_string(),
            "in `Shapes`: in `[2]`: in `Radius`: expected integer, found string"
        );
    }
}
