use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use vc_document::{DocumentValue, TypeDescriptor};
use vc_utils::TypeIdMap;
use vc_utils::hash::{HashMap, HashSet};

use crate::de::DeserializeDriver;
use crate::registry::{FromType, TypeList, TypeMeta, TypeTrait};
use crate::schema::ClassSchema;
use crate::ser::SerializeDriver;
use crate::{Persist, PersistConfig, PersistError, Typed};

// -----------------------------------------------------------------------------
// TypeRegistry

/// The catalog of persistable types.
///
/// Each registered type gets one [`TypeMeta`], keyed by [`TypeId`] and by
/// its encoded descriptor. Discriminators found in documents resolve through
/// the descriptor key. Two distinct types sharing a descriptor make that
/// descriptor ambiguous, and it stops resolving.
///
/// # Examples
///
/// ```
/// use vc_document::TypeDescriptor;
/// use vc_persist::registry::TypeRegistry;
///
/// let mut registry = TypeRegistry::new();
/// registry.register::<Vec<i32>>();
///
/// let list = TypeDescriptor::decode("Vec<i32>").unwrap();
/// let meta = registry.resolve(&list).unwrap();
/// assert_eq!(meta.type_id(), core::any::TypeId::of::<Vec<i32>>());
///
/// let missing = TypeDescriptor::decode("Vec<Zoo.Animal>").unwrap();
/// assert!(registry.resolve(&missing).is_err());
/// ```
pub struct TypeRegistry {
    metas: TypeIdMap<TypeMeta>,
    key_to_id: HashMap<Box<str>, TypeId>,
    ambiguous_keys: HashSet<Box<str>>,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`].
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            metas: TypeIdMap::new(),
            key_to_id: HashMap::default(),
            ambiguous_keys: HashSet::default(),
        }
    }

    /// A registry with the built-in leaf types registered:
    ///
    /// - `()` `bool` `char` `String`
    /// - `i8 - i128` `isize` `u8 - u128` `usize` `f32` `f64`
    /// - `Box<dyn Persist>` (`Object`)
    /// - `DocumentValue` `TypeDescriptor` `MethodRef`
    /// - `Uuid` and `DateTime<Utc>` with the matching features
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_types::<(
            (),
            bool,
            char,
            String,
            f32,
            f64,
            Box<dyn Persist>,
            DocumentValue,
            TypeDescriptor,
            vc_document::MethodRef,
        )>();
        registry.register_types::<(i8, i16, i32, i64, i128, isize)>();
        registry.register_types::<(u8, u16, u32, u64, u128, usize)>();
        #[cfg(feature = "uuid")]
        registry.register::<uuid::Uuid>();
        #[cfg(feature = "chrono")]
        registry.register::<chrono::DateTime<chrono::Utc>>();
        registry
    }

    fn add_key(&mut self, meta: &TypeMeta) {
        let key = meta.key();
        if self.ambiguous_keys.contains(key) {
            return;
        }
        match self.key_to_id.get(key) {
            Some(&existing) if existing != meta.type_id() => {
                log::warn!(
                    "descriptor `{key}` is claimed by more than one type (latest: `{}`); it will not resolve",
                    meta.type_name(),
                );
                self.key_to_id.remove(key);
                self.ambiguous_keys.insert(Box::from(key));
            }
            Some(_) => {}
            None => {
                self.key_to_id.insert(Box::from(key), meta.type_id());
            }
        }
    }

    /// Registers `T` and, the first time, everything reachable from it:
    /// the declared types of its properties and its
    /// [`register_dependencies`](Typed::register_dependencies).
    ///
    /// Returns `false` if `T` was already registered, in which case nothing
    /// changes.
    pub fn register<T: Typed>(&mut self) -> bool {
        let type_id = TypeId::of::<T>();
        if self.metas.contains(&type_id) {
            return false;
        }

        let meta = T::get_type_meta();
        self.add_key(&meta);
        log::debug!("registered `{}` as `{}`", meta.type_name(), meta.key());
        self.metas.insert(type_id, meta);

        if let Some(shape) = T::class_shape() {
            for property in shape.properties() {
                property.register_declared(self);
            }
        }
        T::register_dependencies(self);
        true
    }

    /// Registers every type of the tuple `L`.
    #[inline]
    pub fn register_types<L: TypeList>(&mut self) {
        L::register_all(self);
    }

    /// Registers every type declared with `#[persist(auto_register)]`.
    ///
    /// Returns how many registration functions ran. Without the
    /// `auto_register` feature, or on platforms the `inventory` crate does
    /// not support, nothing runs and `0` is returned.
    pub fn auto_register(&mut self) -> usize {
        #[cfg(feature = "auto_register")]
        {
            crate::__macro_exports::auto_register::__register_types(self)
        }
        #[cfg(not(feature = "auto_register"))]
        {
            0
        }
    }

    /// Attaches the type trait `D` to the registered type `T`.
    ///
    /// Returns `false` if `T` is not registered.
    pub fn register_type_trait<T: Typed, D: TypeTrait + FromType<T>>(&mut self) -> bool {
        match self.metas.get_mut(&TypeId::of::<T>()) {
            Some(meta) => {
                meta.insert_trait(D::from_type());
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.metas.contains(&type_id)
    }

    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&TypeMeta> {
        self.metas.get(&type_id)
    }

    #[inline]
    pub fn get_mut(&mut self, type_id: TypeId) -> Option<&mut TypeMeta> {
        self.metas.get_mut(&type_id)
    }

    /// Looks up an encoded descriptor. Ambiguous keys return `None`.
    pub fn get_with_key(&self, key: &str) -> Option<&TypeMeta> {
        self.key_to_id.get(key).and_then(|id| self.get(*id))
    }

    #[inline]
    pub fn is_ambiguous(&self, key: &str) -> bool {
        self.ambiguous_keys.contains(key)
    }

    pub fn get_type_trait<D: TypeTrait>(&self, type_id: TypeId) -> Option<&D> {
        self.get(type_id).and_then(TypeMeta::get_trait::<D>)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TypeMeta> {
        self.metas.values()
    }

    /// Resolves a discriminator.
    ///
    /// Generic arguments are resolved first, each the same way, so an
    /// unknown argument is reported by name. The closed instantiation itself
    /// must then be registered: generic definitions only exist
    /// monomorphised.
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> Result<&TypeMeta, PersistError> {
        for arg in descriptor.generic_args() {
            self.resolve(arg)?;
        }

        let key = descriptor.encode();
        if let Some(meta) = self.get_with_key(&key) {
            log::trace!("resolved `{key}` to `{}`", meta.type_name());
            return Ok(meta);
        }

        let reason = if self.is_ambiguous(&key) {
            "more than one registered type uses this descriptor"
        } else if descriptor.is_generic() {
            "this instantiation is not registered"
        } else {
            "no registered type uses this descriptor"
        };
        Err(PersistError::TypeResolution {
            descriptor: key,
            reason: String::from(reason),
        })
    }

    /// The schema of `T`, cached when `T` is registered.
    ///
    /// Unregistered types get a freshly derived schema on every call.
    pub fn schema_of<T: Typed>(&self) -> Result<Arc<ClassSchema>, PersistError> {
        if let Some(meta) = self.get(TypeId::of::<T>()) {
            return meta.schema();
        }
        let name = T::type_descriptor().encode();
        let Some(shape) = T::class_shape() else {
            return Err(PersistError::UnsupportedType {
                type_name: name,
                reason: String::from("not a class type"),
            });
        };
        ClassSchema::derive(shape, &name).map(Arc::new)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.key_to_id.keys().map(|k| &**k).collect();
        keys.sort_unstable();
        f.debug_set().entries(keys).finish()
    }
}

// -----------------------------------------------------------------------------
// TypeRegistryArc

/// A [`TypeRegistry`] shared between threads.
///
/// Registration checks under the read lock first and inserts under the write
/// lock, so concurrent first registrations of a type produce a single entry.
/// Schemas are derived lazily behind a once-cell inside each entry.
///
/// The convenience methods register the root type, take the read lock for
/// the duration of one call and run the matching driver.
#[derive(Clone, Default)]
pub struct TypeRegistryArc {
    /// The wrapped [`TypeRegistry`].
    pub internal: Arc<RwLock<TypeRegistry>>,
}

impl TypeRegistryArc {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            internal: Arc::new(RwLock::new(registry)),
        }
    }

    /// Takes a read lock on the underlying [`TypeRegistry`].
    pub fn read(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.internal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the underlying [`TypeRegistry`].
    pub fn write(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.internal.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`TypeRegistry::register`].
    pub fn register<T: Typed>(&self) -> bool {
        if self.read().contains(TypeId::of::<T>()) {
            return false;
        }
        self.write().register::<T>()
    }

    /// See [`TypeRegistry::register_types`].
    pub fn register_types<L: TypeList>(&self) {
        self.write().register_types::<L>();
    }

    /// See [`TypeRegistry::auto_register`].
    pub fn auto_register(&self) -> usize {
        self.write().auto_register()
    }

    /// Registers `T` and returns its cached schema.
    pub fn schema_of<T: Typed>(&self) -> Result<Arc<ClassSchema>, PersistError> {
        self.register::<T>();
        self.read().schema_of::<T>()
    }

    /// Serializes `value` at its own type, stamping `_version` when
    /// [`PersistConfig::stamp_version`] is set.
    pub fn serialize<T: Typed>(&self, value: &T, config: &PersistConfig) -> Result<DocumentValue, PersistError> {
        self.register::<T>();
        let registry = self.read();
        let driver = SerializeDriver::new(&registry, config);
        if config.stamp_version {
            driver.serialize_versioned(value)
        } else {
            driver.serialize(value)
        }
    }

    /// Serializes `value` into a slot declared as `declared`; a differing
    /// runtime type is wrapped with its discriminator.
    pub fn serialize_as(
        &self,
        value: &dyn Persist,
        declared: &TypeDescriptor,
        config: &PersistConfig,
    ) -> Result<DocumentValue, PersistError> {
        value.register_dyn(&mut self.write());
        let registry = self.read();
        SerializeDriver::new(&registry, config).serialize_as(value, declared)
    }

    /// Serializes independent values, in parallel above
    /// [`PersistConfig::batch_threshold`] when the `rayon` feature is enabled.
    pub fn serialize_batch<T: Typed>(&self, values: &[T], config: &PersistConfig) -> Vec<Result<DocumentValue, PersistError>> {
        self.register::<T>();
        let registry = self.read();
        SerializeDriver::new(&registry, config).serialize_batch(values)
    }

    /// Deserializes a root document, upgrading it first when it is stale.
    pub fn deserialize<T: Typed>(&self, doc: &DocumentValue, config: &PersistConfig) -> Result<T, PersistError> {
        self.register::<T>();
        let registry = self.read();
        DeserializeDriver::new(&registry, config).deserialize(doc)
    }
}

impl fmt::Debug for TypeRegistryArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.read(), f)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use core::any::TypeId;

    use vc_document::{DocumentValue, TypeDescriptor};

    use crate::de::DeserializeDriver;
    use crate::derive::Persist;
    use crate::registry::{TypeRegistry, TypeRegistryArc};
    use crate::schema::{ClassShape, Property};
    use crate::ser::SerializeDriver;
    use crate::{PersistConfig, PersistError, Typed};

    #[derive(Persist, Debug, PartialEq)]
    #[persist(type_path = "Test.Sample")]
    struct Sample {
        name: String,
    }

    #[derive(Persist, Debug, PartialEq)]
    #[persist(type_path = "Geo.Pair")]
    struct Pair<A, B> {
        first: A,
        second: B,
    }

    mod one {
        use crate::derive::Persist;

        #[derive(Persist)]
        #[persist(type_path = "Test.Twin")]
        pub struct Twin;
    }

    mod two {
        use crate::derive::Persist;

        #[derive(Persist)]
        #[persist(type_path = "Test.Twin")]
        pub struct Twin;
    }

    /// Settable but without a way to create it.
    struct Broken {
        value: i32,
    }

    impl Typed for Broken {
        fn type_descriptor() -> TypeDescriptor {
            TypeDescriptor::new("Test.Broken")
        }

        fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
            driver.encode_object(self)
        }

        fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
            driver.decode_object(value)
        }

        fn class_shape() -> Option<ClassShape> {
            Some(ClassShape::new().property(Property::settable::<Self, i32>(
                "Value",
                |b| &b.value,
                |b, v| b.value = v,
            )))
        }
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = TypeRegistry::empty();
        assert!(registry.register::<Sample>());
        let len = registry.len();
        assert!(!registry.register::<Sample>());
        assert!(!registry.register::<Sample>());
        assert_eq!(registry.len(), len);

        // Member types come along.
        assert!(registry.contains(TypeId::of::<String>()));
        assert!(registry.get_with_key("Test.Sample").is_some());
    }

    #[test]
    fn concurrent_first_use_shares_one_schema() {
        let registry = TypeRegistryArc::new(TypeRegistry::empty());
        let schemas: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.schema_of::<Sample>().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(schemas.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.read().iter().filter(|m| m.key() == "Test.Sample").count(), 1);
    }

    #[test]
    fn shared_descriptor_becomes_ambiguous() {
        let mut registry = TypeRegistry::new();
        registry.register::<one::Twin>();
        registry.register::<two::Twin>();

        assert!(registry.is_ambiguous("Test.Twin"));
        let error = registry.resolve(&TypeDescriptor::new("Test.Twin")).unwrap_err();
        assert!(matches!(error, PersistError::TypeResolution { .. }));
    }

    #[test]
    fn generic_instantiations_resolve_when_registered() {
        let mut registry = TypeRegistry::new();
        registry.register::<Pair<i32, String>>();

        let descriptor = Pair::<i32, String>::type_descriptor();
        assert_eq!(descriptor.encode(), "Geo.Pair<i32,String>");
        let meta = registry.resolve(&descriptor).unwrap();
        assert_eq!(meta.type_id(), TypeId::of::<Pair<i32, String>>());

        let other = TypeDescriptor::decode("Geo.Pair<i32,bool>").unwrap();
        assert!(registry.resolve(&other).is_err());

        let unknown_arg = TypeDescriptor::decode("Geo.Pair<i32,Zoo.Animal>").unwrap();
        match registry.resolve(&unknown_arg) {
            Err(PersistError::TypeResolution { descriptor, .. }) => assert_eq!(descriptor, "Zoo.Animal"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn generic_round_trip() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let pair = Pair {
            first: 1_i32,
            second: String::from("one"),
        };
        let doc = registry.serialize(&pair, &config).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"first":1,"second":"one"}"#);
        assert_eq!(registry.deserialize::<Pair<i32, String>>(&doc, &config).unwrap(), pair);
    }

    #[test]
    fn unsupported_schema_fails_every_time() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        for _ in 0..2 {
            let error = registry.serialize(&Broken { value: 1 }, &config).unwrap_err();
            assert!(matches!(error, PersistError::UnsupportedType { .. }));
        }
        assert!(registry.schema_of::<Broken>().is_err());
        assert!(registry.schema_of::<i32>().is_err());
    }

    #[cfg(feature = "auto_register")]
    mod auto {
        use crate::derive::Persist;
        use crate::registry::TypeRegistry;

        #[derive(Persist)]
        #[persist(type_path = "Test.Auto", auto_register)]
        struct Auto;

        #[test]
        fn auto_register_collects_flagged_types() {
            let mut registry = TypeRegistry::empty();
            assert!(registry.auto_register() >= 1);
            assert!(registry.contains(core::any::TypeId::of::<Auto>()));
        }
    }
}
