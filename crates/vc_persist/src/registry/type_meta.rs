use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::{TypeId, type_name};
use core::fmt;
use std::sync::OnceLock;

use vc_document::{DocumentValue, TypeDescriptor};
use vc_utils::TypeIdMap;

use crate::de::DeserializeDriver;
use crate::registry::TypeTrait;
use crate::schema::{ClassSchema, ClassShape};
use crate::{Persist, PersistError, Typed};

type DecodeFn = fn(&DocumentValue, &DeserializeDriver<'_>) -> Result<Box<dyn Persist>, PersistError>;

fn decode_dyn<T: Typed>(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Box<dyn Persist>, PersistError> {
    T::decode(value, driver).map(|v| Box::new(v) as Box<dyn Persist>)
}

// -----------------------------------------------------------------------------
// TypeMeta

/// Everything the registry knows about one type.
///
/// The [`ClassSchema`] is derived on first request and then shared; every
/// caller observes the same `Arc`.
pub struct TypeMeta {
    type_id: TypeId,
    type_name: &'static str,
    descriptor: TypeDescriptor,
    key: Box<str>,
    is_interface: bool,
    decode: DecodeFn,
    shape: fn() -> Option<ClassShape>,
    schema: OnceLock<Option<Arc<ClassSchema>>>,
    trait_table: TypeIdMap<Box<dyn TypeTrait>>,
}

impl TypeMeta {
    /// An empty meta for `T`, without type traits.
    pub fn of<T: Typed>() -> Self {
        let descriptor = T::type_descriptor();
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            key: descriptor.encode().into_boxed_str(),
            descriptor,
            is_interface: T::is_interface(),
            decode: decode_dyn::<T>,
            shape: T::class_shape,
            schema: OnceLock::new(),
            trait_table: TypeIdMap::new(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The Rust type name, for diagnostics.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// The encoded descriptor the type is registered under.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    /// Decodes a value of this type behind the object-safe face.
    #[inline]
    pub fn decode(&self, value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Box<dyn Persist>, PersistError> {
        (self.decode)(value, driver)
    }

    /// The type's class schema, derived once.
    ///
    /// Types without a [`ClassShape`] and shapes without a viable schema are
    /// reported as [`PersistError::UnsupportedType`] on every call.
    pub fn schema(&self) -> Result<Arc<ClassSchema>, PersistError> {
        let schema = self.schema.get_or_init(|| {
            let shape = (self.shape)()?;
            match ClassSchema::derive(shape, &self.key) {
                Ok(schema) => {
                    log::debug!("derived schema of `{}`: {}", self.key, schema.describe());
                    Some(Arc::new(schema))
                }
                Err(error) => {
                    log::warn!("{error}");
                    None
                }
            }
        });
        match schema {
            Some(schema) => Ok(Arc::clone(schema)),
            None => Err(self.unsupported()),
        }
    }

    fn unsupported(&self) -> PersistError {
        let reason = match (self.shape)() {
            None => String::from("not a class type"),
            Some(shape) => match ClassSchema::derive(shape, &self.key) {
                Err(PersistError::UnsupportedType { reason, .. }) => reason,
                _ => String::from("no usable schema"),
            },
        };
        PersistError::UnsupportedType {
            type_name: String::from(&*self.key),
            reason,
        }
    }

    /// Inserts or replaces a type trait.
    #[inline]
    pub fn insert_trait<T: TypeTrait>(&mut self, data: T) {
        self.trait_table.insert(TypeId::of::<T>(), Box::new(data));
    }

    #[inline]
    pub fn get_trait<T: TypeTrait>(&self) -> Option<&T> {
        self.trait_table
            .get(&TypeId::of::<T>())
            .and_then(|t| <dyn TypeTrait>::downcast_ref(&**t))
    }

    #[inline]
    pub fn has_trait<T: TypeTrait>(&self) -> bool {
        self.trait_table.contains(&TypeId::of::<T>())
    }

    #[inline]
    pub fn trait_len(&self) -> usize {
        self.trait_table.len()
    }
}

impl fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMeta")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .field("is_interface", &self.is_interface)
            .field("traits", &self.trait_table.len())
            .finish_non_exhaustive()
    }
}
