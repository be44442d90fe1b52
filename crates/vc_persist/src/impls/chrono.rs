use alloc::format;

use chrono::{DateTime, SecondsFormat, Utc};
use vc_document::{DocumentValue, TypeDescriptor};

use crate::de::DeserializeDriver;
use crate::ser::SerializeDriver;
use crate::{PersistError, Typed};

/// RFC 3339 text in UTC, with as many fractional digits as needed.
impl Typed for DateTime<Utc> {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("DateTime")
    }

    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::String(self.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        let text = value.as_str().ok_or_else(|| PersistError::decode("an RFC 3339 timestamp", value))?;
        DateTime::parse_from_rfc3339(text)
            .map(|time| time.with_timezone(&Utc))
            .map_err(|error| PersistError::Decode {
                expected: format!("an RFC 3339 timestamp ({error})"),
                found: format!("{text:?}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use vc_document::DocumentValue;

    use crate::PersistConfig;
    use crate::registry::TypeRegistryArc;

    #[test]
    fn timestamp_is_rfc3339() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let Some(time) = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single() else {
            panic!("valid timestamp");
        };
        let doc = registry.serialize(&time, &config).unwrap();
        assert_eq!(doc, DocumentValue::from("2024-05-01T12:30:00Z"));
        assert_eq!(registry.deserialize::<DateTime<Utc>>(&doc, &config).unwrap(), time);

        let offset = DocumentValue::from("2024-05-01T14:30:00+02:00");
        assert_eq!(registry.deserialize::<DateTime<Utc>>(&offset, &config).unwrap(), time);
    }
}
