use alloc::format;

use uuid::Uuid;
use vc_document::{DocumentValue, TypeDescriptor};

use crate::de::DeserializeDriver;
use crate::ser::SerializeDriver;
use crate::{PersistError, Typed};

/// Hyphenated lower-case text.
impl Typed for Uuid {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("Uuid")
    }

    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::String(self.hyphenated().to_string()))
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        let text = value.as_str().ok_or_else(|| PersistError::decode("a uuid string", value))?;
        Uuid::parse_str(text).map_err(|error| PersistError::Decode {
            expected: format!("a uuid ({error})"),
            found: format!("{text:?}"),
        })
    }
}
