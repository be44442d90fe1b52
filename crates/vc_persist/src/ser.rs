//! Values to documents.
//!
//! [`SerializeDriver`] borrows a [`TypeRegistry`] and a [`PersistConfig`]
//! for the duration of one call. Leaf and container [`Typed::encode`]
//! implementations recurse through it; class types use
//! [`SerializeDriver::encode_object`] and polymorphic slots use
//! [`SerializeDriver::encode_dyn_slot`].

use alloc::vec::Vec;

use vc_document::{Document, DocumentValue, TYPE_FIELD, TypeDescriptor, VALUE_FIELD, VERSION_FIELD};

use crate::registry::TypeRegistry;
use crate::{Persist, PersistConfig, PersistError, Typed};

// -----------------------------------------------------------------------------
// SerializeDriver

/// Serialization context of one call.
///
/// The registry is only read: runtime types that reach a polymorphic slot
/// should be registered beforehand, or documents holding them will not
/// decode.
#[derive(Clone, Copy, Debug)]
pub struct SerializeDriver<'a> {
    registry: &'a TypeRegistry,
    config: &'a PersistConfig,
}

impl<'a> SerializeDriver<'a> {
    #[inline]
    pub fn new(registry: &'a TypeRegistry, config: &'a PersistConfig) -> Self {
        Self { registry, config }
    }

    #[inline]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    #[inline]
    pub fn config(&self) -> &'a PersistConfig {
        self.config
    }

    /// Serializes `value` at its own type: the root never carries a
    /// discriminator.
    #[inline]
    pub fn serialize<T: Typed>(&self, value: &T) -> Result<DocumentValue, PersistError> {
        value.encode(self)
    }

    /// Serializes `value` into a slot declared as `declared`.
    pub fn serialize_as(&self, value: &dyn Persist, declared: &TypeDescriptor) -> Result<DocumentValue, PersistError> {
        self.encode_dyn_slot(value, declared)
    }

    /// Serializes `value` and stamps the configured schema version on it.
    ///
    /// Only document roots can carry the stamp; other roots are returned
    /// unstamped and read back as version 0.
    pub fn serialize_versioned<T: Typed>(&self, value: &T) -> Result<DocumentValue, PersistError> {
        let mut encoded = value.encode(self)?;
        match &mut encoded {
            DocumentValue::Document(doc) => {
                doc.insert(VERSION_FIELD, DocumentValue::Int(i64::from(self.config.schema_version)));
            }
            other => {
                log::trace!("`{}` root is not a document; version not stamped", other.kind());
            }
        }
        Ok(encoded)
    }

    /// Serializes independent values, one result per input in input order.
    ///
    /// Batches shorter than [`PersistConfig::batch_threshold`] run on the
    /// calling thread; longer ones fan out with the `rayon` feature.
    pub fn serialize_batch<T: Typed>(&self, values: &[T]) -> Vec<Result<DocumentValue, PersistError>> {
        let driver = *self;
        vc_utils::batch::map_batch(values, self.config.batch_threshold, move |value| {
            if driver.config.stamp_version {
                driver.serialize_versioned(value)
            } else {
                driver.serialize(value)
            }
        })
    }

    /// Encodes a class value, one field per schema member in declaration
    /// order.
    ///
    /// Failures are tagged with the member they occurred in.
    pub fn encode_object<C: Typed>(&self, value: &C) -> Result<DocumentValue, PersistError> {
        let schema = self.registry.schema_of::<C>()?;
        let properties = schema.shape().properties();

        let mut doc = Document::with_capacity(schema.members().len());
        for member in schema.members() {
            let encoded = properties[member.property]
                .encode(value, self)
                .map_err(|error| error.in_member(member.name))?;
            doc.insert(member.name, encoded);
        }
        Ok(DocumentValue::Document(doc))
    }

    /// Encodes a value held in a polymorphic slot declared as `declared`.
    ///
    /// A runtime type equal to the declared type is encoded bare. Any other
    /// runtime type is wrapped as `{"_t": <descriptor>, "_v": <value>}`.
    pub fn encode_dyn_slot(&self, value: &dyn Persist, declared: &TypeDescriptor) -> Result<DocumentValue, PersistError> {
        let runtime = value.persist_descriptor();
        let encoded = value.encode_dyn(self)?;
        if &runtime == declared {
            return Ok(encoded);
        }

        let key = runtime.encode();
        if self.registry.get_with_key(&key).is_none() {
            log::warn!("`{key}` is serialized through `{declared}` but is not registered; it will not decode");
        }

        let mut wrapper = Document::with_capacity(2);
        wrapper.insert(TYPE_FIELD, DocumentValue::String(key));
        wrapper.insert(VALUE_FIELD, encoded);
        Ok(DocumentValue::Document(wrapper))
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::vec;

    use vc_document::{DocumentValue, TypeDescriptor};

    use crate::registry::TypeRegistry;
    use crate::{Persist, PersistConfig};

    use super::SerializeDriver;

    #[test]
    fn versioned_root_carries_stamp() {
        let registry = TypeRegistry::new();
        let config = PersistConfig::default().with_schema_version(7);
        let driver = SerializeDriver::new(&registry, &config);

        let mut map = alloc::collections::BTreeMap::new();
        map.insert(String::from("a"), 1_i32);
        let doc = driver.serialize_versioned(&map).unwrap();
        assert_eq!(doc.get("_version"), Some(&DocumentValue::Int(7)));

        // Non-document roots stay as they are.
        let list = driver.serialize_versioned(&vec![1_i32]).unwrap();
        assert_eq!(list, DocumentValue::Array(vec![DocumentValue::Int(1)]));
    }

    #[test]
    fn slot_wraps_only_foreign_runtime_types() {
        let registry = TypeRegistry::new();
        let config = PersistConfig::default();
        let driver = SerializeDriver::new(&registry, &config);

        let value: Box<dyn Persist> = Box::new(5_i32);
        let same = driver.encode_dyn_slot(&*value, &TypeDescriptor::new("i32")).unwrap();
        assert_eq!(same, DocumentValue::Int(5));

        let wrapped = driver.encode_dyn_slot(&*value, &TypeDescriptor::new("Object")).unwrap();
        assert_eq!(wrapped.get("_t"), Some(&DocumentValue::from("i32")));
        assert_eq!(wrapped.get("_v"), Some(&DocumentValue::Int(5)));
    }

    #[test]
    fn batch_keeps_input_order() {
        let registry = TypeRegistry::new();
        let config = PersistConfig::default().with_batch_threshold(2);
        let driver = SerializeDriver::new(&registry, &config);

        let results = driver.serialize_batch(&[1_i64, 2, 3]);
        let values: Vec<_> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, [DocumentValue::Int(1), DocumentValue::Int(2), DocumentValue::Int(3)]);
    }
}
