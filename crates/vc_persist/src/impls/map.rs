use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};
use std::collections::HashMap;

use vc_document::{Document, DocumentValue, TypeDescriptor};

use crate::de::DeserializeDriver;
use crate::registry::TypeRegistry;
use crate::ser::SerializeDriver;
use crate::{PersistError, Typed};

const KEY_FIELD: &str = "Key";
const ENTRY_VALUE_FIELD: &str = "Value";

fn has_string_keys<K: Typed>() -> bool {
    K::type_descriptor() == String::type_descriptor()
}

/// `_t`, `_v` and `_version` belong to the wire format; a document keyed by
/// user strings must not contain them.
fn is_reserved_key(key: &DocumentValue) -> bool {
    matches!(key, DocumentValue::String(name) if name.starts_with('_'))
}

/// Encodes map entries.
///
/// String keys give a document keyed by those strings, other keys an array
/// of `{"Key": k, "Value": v}` entries. A string map holding a key with a
/// leading `_` uses the entry array as well. With `sort`, entries are
/// written in canonical key order.
fn encode_entries<'m, K: Typed + 'm, V: Typed + 'm>(
    entries: impl Iterator<Item = (&'m K, &'m V)>,
    driver: &SerializeDriver<'_>,
    sort: bool,
) -> Result<DocumentValue, PersistError> {
    let mut encoded: Vec<(DocumentValue, DocumentValue)> = Vec::new();
    for (index, (key, value)) in entries.enumerate() {
        let key = key.encode(driver).map_err(|error| error.in_element(index))?;
        let value = match &key {
            DocumentValue::String(name) => value.encode(driver).map_err(|error| error.in_member(name.as_str())),
            _ => value.encode(driver).map_err(|error| error.in_element(index)),
        }?;
        encoded.push((key, value));
    }
    if sort {
        encoded.sort_by(|(a, _), (b, _)| a.canonical_cmp(b));
    }

    if has_string_keys::<K>() && !encoded.iter().any(|(key, _)| is_reserved_key(key)) {
        let mut doc = Document::with_capacity(encoded.len());
        for (key, value) in encoded {
            if let DocumentValue::String(key) = key {
                doc.insert(key, value);
            }
        }
        return Ok(DocumentValue::Document(doc));
    }

    let items = encoded
        .into_iter()
        .map(|(key, value)| {
            let mut entry = Document::with_capacity(2);
            entry.insert(KEY_FIELD, key);
            entry.insert(ENTRY_VALUE_FIELD, value);
            DocumentValue::Document(entry)
        })
        .collect();
    Ok(DocumentValue::Array(items))
}

/// Decodes map entries from either encoding.
fn decode_entries<K: Typed, V: Typed>(
    value: &DocumentValue,
    driver: &DeserializeDriver<'_>,
) -> Result<Vec<(K, V)>, PersistError> {
    match value {
        DocumentValue::Document(doc) => doc
            .iter()
            .map(|(name, item)| {
                let key = K::decode(&DocumentValue::from(name), driver);
                let value = V::decode(item, driver);
                key.and_then(|key| Ok((key, value?))).map_err(|error| error.in_member(name))
            })
            .collect(),
        DocumentValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let decode_entry = || -> Result<(K, V), PersistError> {
                    let entry = item
                        .as_document()
                        .ok_or_else(|| PersistError::decode("a map entry document", item))?;
                    let field = |name: &str| {
                        entry.get(name).ok_or_else(|| PersistError::Decode {
                            expected: format!("a map entry with `{name}`"),
                            found: String::from("a document without it"),
                        })
                    };
                    Ok((K::decode(field(KEY_FIELD)?, driver)?, V::decode(field(ENTRY_VALUE_FIELD)?, driver)?))
                };
                decode_entry().map_err(|error| error.in_element(index))
            })
            .collect(),
        other => Err(PersistError::decode("a map document or entry array", other)),
    }
}

impl<K, V, S> Typed for HashMap<K, V, S>
where
    K: Typed + Eq + Hash,
    V: Typed,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::generic("HashMap", [K::type_descriptor(), V::type_descriptor()])
    }

    fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        encode_entries(self.iter(), driver, true)
    }

    fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        decode_entries(value, driver).map(|entries| entries.into_iter().collect())
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<K>();
        registry.register::<V>();
    }
}

impl<K: Typed + Ord, V: Typed> Typed for BTreeMap<K, V> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::generic("BTreeMap", [K::type_descriptor(), V::type_descriptor()])
    }

    fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        encode_entries(self.iter(), driver, false)
    }

    fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        decode_entries(value, driver).map(|entries| entries.into_iter().collect())
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<K>();
        registry.register::<V>();
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use std::collections::HashMap;

    use vc_document::DocumentValue;
    use vc_migrate::{ConverterBuilder, upgrade};

    use crate::PersistConfig;
    use crate::registry::TypeRegistryArc;

    #[test]
    fn string_keys_make_a_document() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let mut map = HashMap::new();
        map.insert(String::from("b"), 2_i32);
        map.insert(String::from("a"), 1_i32);

        let doc = registry.serialize(&map, &config).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"a":1,"b":2}"#);

        let back: HashMap<String, i32> = registry.deserialize(&doc, &config).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn reserved_string_keys_make_entries() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default().with_stamp_version(true);

        let map = BTreeMap::from([(String::from("_version"), 7_i32), (String::from("a"), 1_i32)]);
        let doc = registry.serialize(&map, &config).unwrap();
        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"[{"Key":"_version","Value":7},{"Key":"a","Value":1}]"#
        );
        let back: BTreeMap<String, i32> = registry.deserialize(&doc, &config).unwrap();
        assert_eq!(back, map);

        // A `_t` key is data, so upgrading leaves the map alone.
        let mut tagged = HashMap::new();
        tagged.insert(String::from("_t"), String::from("Old.Beam"));
        tagged.insert(String::from("Len"), String::from("3"));
        let doc = registry.serialize(&tagged, &config).unwrap();
        assert!(matches!(doc, DocumentValue::Array(_)));

        let converter = ConverterBuilder::new()
            .rename_type("Old.Beam", "New.Girder")
            .rename_member("Old.Beam.Len", "Length")
            .build()
            .unwrap();
        assert_eq!(*upgrade(&doc, &converter).unwrap(), doc);

        let config = config.with_schema_version(1).with_converter(converter);
        let back: HashMap<String, String> = registry.deserialize(&doc, &config).unwrap();
        assert_eq!(back, tagged);
    }

    #[test]
    fn other_keys_make_entries() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let map = BTreeMap::from([(2_i32, true), (1_i32, false)]);
        let doc = registry.serialize(&map, &config).unwrap();
        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"[{"Key":1,"Value":false},{"Key":2,"Value":true}]"#
        );

        let back: BTreeMap<i32, bool> = registry.deserialize(&doc, &config).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn malformed_entry_reports_position() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let doc = serde_json::from_str(r#"[{"Key":1,"Value":2},{"Key":3}]"#).unwrap();
        let error = registry.deserialize::<BTreeMap<i32, i32>>(&doc, &config).unwrap_err();
        assert_eq!(error.member_path(), "[1]");
    }
}
