use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};
use std::collections::HashSet;

use vc_document::{Document, DocumentValue, TypeDescriptor, VALUE_FIELD};

use crate::de::DeserializeDriver;
use crate::registry::TypeRegistry;
use crate::ser::SerializeDriver;
use crate::{PersistError, Typed};

/// Encodes every item, tagging failures with their position.
pub(super) fn encode_items<'t, T: Typed>(
    items: impl Iterator<Item = &'t T>,
    driver: &SerializeDriver<'_>,
) -> Result<Vec<DocumentValue>, PersistError> {
    items
        .enumerate()
        .map(|(index, item)| item.encode(driver).map_err(|error| error.in_element(index)))
        .collect()
}

/// Decodes every element of an array.
pub(super) fn decode_items<'v, T: Typed>(
    value: &'v DocumentValue,
    driver: &'v DeserializeDriver<'_>,
) -> Result<impl Iterator<Item = Result<T, PersistError>> + 'v, PersistError> {
    let items = value
        .as_array()
        .ok_or_else(|| PersistError::decode("an array", value))?;
    Ok(items
        .iter()
        .enumerate()
        .map(move |(index, item)| T::decode(item, driver).map_err(|error| error.in_element(index))))
}

macro_rules! impl_sequence {
    ($name:literal, $ty:ident) => {
        impl<T: Typed> Typed for $ty<T> {
            fn type_descriptor() -> TypeDescriptor {
                TypeDescriptor::generic($name, [T::type_descriptor()])
            }

            fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
                encode_items(self.iter(), driver).map(DocumentValue::Array)
            }

            fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
                decode_items(value, driver)?.collect()
            }

            fn register_dependencies(registry: &mut TypeRegistry) {
                registry.register::<T>();
            }
        }
    };
}

impl_sequence!("Vec", Vec);
impl_sequence!("VecDeque", VecDeque);

// -----------------------------------------------------------------------------
// Sets

impl<T: Typed + Ord> Typed for BTreeSet<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::generic("BTreeSet", [T::type_descriptor()])
    }

    fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        encode_items(self.iter(), driver).map(DocumentValue::Array)
    }

    fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        decode_items(value, driver)?.collect()
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}

impl<T, S> Typed for HashSet<T, S>
where
    T: Typed + Eq + Hash,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::generic("HashSet", [T::type_descriptor()])
    }

    fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        let mut items = encode_items(self.iter(), driver)?;
        items.sort_by(DocumentValue::canonical_cmp);
        Ok(DocumentValue::Array(items))
    }

    fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        decode_items(value, driver)?.collect()
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}

// -----------------------------------------------------------------------------
// Option

/// `None` is `Null` and `Some(v)` is `v`, except that a `Some` whose
/// content itself encodes as `Null` (`Some(None)`, `Some(())`) is written as
/// `{"_v": null}` to stay distinct from `None`.
impl<T: Typed> Typed for Option<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::generic("Option", [T::type_descriptor()])
    }

    fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        match self {
            Some(value) => match value.encode(driver)? {
                DocumentValue::Null => {
                    let mut some = Document::with_capacity(1);
                    some.insert(VALUE_FIELD, DocumentValue::Null);
                    Ok(DocumentValue::Document(some))
                }
                encoded => Ok(encoded),
            },
            None => Ok(DocumentValue::Null),
        }
    }

    fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        match value {
            DocumentValue::Null => Ok(None),
            DocumentValue::Document(doc) if doc.len() == 1 && doc.get(VALUE_FIELD) == Some(&DocumentValue::Null) => {
                T::decode(&DocumentValue::Null, driver).map(Some)
            }
            value => T::decode(value, driver).map(Some),
        }
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::VecDeque;
    use alloc::vec;
    use alloc::vec::Vec;
    use std::collections::HashSet;

    use vc_document::DocumentValue;

    use crate::registry::TypeRegistryArc;
    use crate::{PersistConfig, PersistError};

    #[test]
    fn list_round_trip_keeps_order() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let doc = registry.serialize(&vec![1_i32, 2, 3], &config).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), "[1,2,3]");

        let back: Vec<i32> = registry.deserialize(&doc, &config).unwrap();
        assert_eq!(back, [1, 2, 3]);

        let deque: VecDeque<i32> = registry.deserialize(&doc, &config).unwrap();
        assert_eq!(deque, [1, 2, 3]);
    }

    #[test]
    fn hash_set_output_is_sorted() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let set: HashSet<i32> = [30, 1, 20, 4].into_iter().collect();
        let doc = registry.serialize(&set, &config).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), "[1,4,20,30]");
    }

    #[test]
    fn element_errors_carry_position() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let doc = DocumentValue::Array(vec![DocumentValue::Int(1), DocumentValue::from("two")]);
        let error = registry.deserialize::<Vec<i32>>(&doc, &config).unwrap_err();
        assert_eq!(error.member_path(), "[1]");
        assert!(matches!(error.root_cause(), PersistError::Decode { .. }));
    }

    #[test]
    fn option_is_null_or_value() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        assert_eq!(registry.serialize(&None::<i32>, &config).unwrap(), DocumentValue::Null);
        let some: Option<i32> = registry.deserialize(&DocumentValue::Int(4), &config).unwrap();
        assert_eq!(some, Some(4));
    }

    #[test]
    fn nested_option_keeps_some_none() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        for value in [None, Some(None), Some(Some(3_i32))] {
            let doc = registry.serialize(&value, &config).unwrap();
            let back: Option<Option<i32>> = registry.deserialize(&doc, &config).unwrap();
            assert_eq!(back, value);
        }

        let doc = registry.serialize(&Some(None::<i32>), &config).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"_v":null}"#);
        let unit = registry.serialize(&Some(()), &config).unwrap();
        assert_eq!(registry.deserialize::<Option<()>>(&unit, &config).unwrap(), Some(()));
    }
}
