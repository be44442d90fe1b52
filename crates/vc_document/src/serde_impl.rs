use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Formatter};

use serde_core::de::{Error, MapAccess, SeqAccess, Visitor};
use serde_core::ser::{SerializeMap, SerializeSeq};
use serde_core::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Document, DocumentValue};

// -----------------------------------------------------------------------------
// Serialize

impl Serialize for DocumentValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DocumentValue::Null => serializer.serialize_unit(),
            DocumentValue::Bool(v) => serializer.serialize_bool(*v),
            DocumentValue::Int(v) => serializer.serialize_i64(*v),
            DocumentValue::Float(v) => serializer.serialize_f64(*v),
            DocumentValue::String(v) => serializer.serialize_str(v),
            DocumentValue::Array(items) => {
                let mut state = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    state.serialize_element(item)?;
                }
                state.end()
            }
            DocumentValue::Document(doc) => doc.serialize(serializer),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            state.serialize_entry(name, value)?;
        }
        state.end()
    }
}

// -----------------------------------------------------------------------------
// Deserialize

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = DocumentValue;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("a document value")
    }

    fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
        Ok(DocumentValue::Null)
    }

    fn visit_none<E: Error>(self) -> Result<Self::Value, E> {
        Ok(DocumentValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        DocumentValue::deserialize(deserializer)
    }

    fn visit_bool<E: Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(DocumentValue::Bool(v))
    }

    fn visit_i64<E: Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(DocumentValue::Int(v))
    }

    fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(DocumentValue::Int)
            .map_err(|_| E::custom("integer exceeds the signed 64-bit range"))
    }

    fn visit_f64<E: Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(DocumentValue::Float(v))
    }

    fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(DocumentValue::String(v.to_string()))
    }

    fn visit_string<E: Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(DocumentValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or_default().min(4096));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(DocumentValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        DocumentVisitor.visit_map(map).map(DocumentValue::Document)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("a document")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut doc = Document::with_capacity(map.size_hint().unwrap_or_default().min(4096));
        while let Some((name, value)) = map.next_entry::<String, DocumentValue>()? {
            doc.insert(name, value);
        }
        Ok(doc)
    }
}

impl<'de> Deserialize<'de> for DocumentValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DocumentVisitor)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Document, DocumentValue};
    use alloc::vec;

    #[test]
    fn json_keeps_field_order() {
        let mut doc = Document::new();
        doc.insert("Zeta", DocumentValue::Int(1));
        doc.insert("Alpha", DocumentValue::Array(vec![DocumentValue::Null, DocumentValue::Bool(true)]));
        doc.insert("Mid", DocumentValue::from("x"));
        let value = DocumentValue::Document(doc);

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"Zeta":1,"Alpha":[null,true],"Mid":"x"}"#);

        let back: DocumentValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn oversized_unsigned_is_rejected() {
        assert!(serde_json::from_str::<DocumentValue>("18446744073709551615").is_err());
        assert_eq!(
            serde_json::from_str::<DocumentValue>("9223372036854775807").unwrap(),
            DocumentValue::Int(i64::MAX)
        );
    }
}
