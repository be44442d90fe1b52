use alloc::boxed::Box;
use core::any::Any;

use vc_document::{DocumentValue, TypeDescriptor};

use crate::PersistError;
use crate::de::DeserializeDriver;
use crate::registry::{TypeMeta, TypeRegistry};
use crate::schema::ClassShape;
use crate::ser::SerializeDriver;

// -----------------------------------------------------------------------------
// Typed

/// A type the engine can persist.
///
/// Usually implemented with [`#[derive(Persist)]`](crate::derive::Persist).
/// Leaf types and containers are implemented by this crate.
///
/// - [`type_descriptor`](Typed::type_descriptor) is the discriminator the
///   type is registered and resolved under.
/// - [`encode`](Typed::encode) and [`decode`](Typed::decode) are
///   shape-directed; objects delegate to
///   [`SerializeDriver::encode_object`] and [`DeserializeDriver::decode_object`],
///   which drive the type's [`ClassShape`].
/// - [`register_dependencies`](Typed::register_dependencies) registers the
///   types reachable from this one, so their descriptors resolve too.
pub trait Typed: Any + Send + Sync + Sized {
    fn type_descriptor() -> TypeDescriptor;

    fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError>;

    fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError>;

    /// The introspection record of a class type. Leaves and containers
    /// have none.
    fn class_shape() -> Option<ClassShape> {
        None
    }

    /// Whether this is an interface slot type, such as `Box<dyn Trait>`.
    fn is_interface() -> bool {
        false
    }

    fn get_type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }

    fn register_dependencies(_registry: &mut TypeRegistry) {}
}

// -----------------------------------------------------------------------------
// Persist

/// The object-safe face of [`Typed`], implemented for every typed value.
///
/// `Box<dyn Persist>` is the catch-all polymorphic slot; interfaces declared
/// with [`impl_persist_interface!`](crate::impl_persist_interface) require
/// `Persist` as a supertrait.
pub trait Persist: Any + Send + Sync {
    /// The runtime type's descriptor.
    fn persist_descriptor(&self) -> TypeDescriptor;

    /// Encodes with the runtime type's [`Typed::encode`].
    fn encode_dyn(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError>;

    /// Registers the runtime type.
    fn register_dyn(&self, registry: &mut TypeRegistry);

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Typed> Persist for T {
    #[inline]
    fn persist_descriptor(&self) -> TypeDescriptor {
        T::type_descriptor()
    }

    #[inline]
    fn encode_dyn(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        self.encode(driver)
    }

    #[inline]
    fn register_dyn(&self, registry: &mut TypeRegistry) {
        registry.register::<T>();
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl core::fmt::Debug for dyn Persist {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "dyn Persist({})", self.persist_descriptor())
    }
}
