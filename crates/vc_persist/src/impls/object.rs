use alloc::boxed::Box;

use vc_document::{DocumentValue, TypeDescriptor};

use crate::de::DeserializeDriver;
use crate::ser::SerializeDriver;
use crate::{Persist, PersistError, Typed};

// -----------------------------------------------------------------------------
// Object

/// The catch-all polymorphic slot. Every value in it is written with its
/// discriminator, and any registered type can be read back into it.
impl Typed for Box<dyn Persist> {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("Object")
    }

    fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        driver.encode_dyn_slot(&**self, &Self::type_descriptor())
    }

    fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        driver.decode_dyn(value)
    }

    #[inline]
    fn is_interface() -> bool {
        true
    }
}

// -----------------------------------------------------------------------------
// Interfaces

/// Makes `Box<dyn Trait>` a polymorphic slot registered under `name`.
///
/// `Trait` must have [`Persist`](crate::Persist) as a supertrait. Types
/// stored in the slot declare it with `#[persist(implements(Trait))]`, which
/// registers the cast the deserializer needs.
///
/// # Examples
///
/// ```
/// use vc_persist::{Persist, PersistConfig, derive::Persist, impl_persist_interface};
/// use vc_persist::registry::TypeRegistryArc;
///
/// trait Shape: Persist {
///     fn area(&self) -> f64;
/// }
/// impl_persist_interface!(Shape, "Shapes.IShape");
///
/// #[derive(Persist)]
/// #[persist(type_path = "Shapes.Square", implements(Shape))]
/// struct Square {
///     #[persist(rename = "Side")]
///     side: f64,
/// }
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.side * self.side
///     }
/// }
///
/// let registry = TypeRegistryArc::default();
/// registry.register::<Square>();
/// let config = PersistConfig::default();
///
/// let shapes: Vec<Box<dyn Shape>> = vec![Box::new(Square { side: 2.0 })];
/// let doc = registry.serialize(&shapes, &config).unwrap();
/// assert_eq!(
///     serde_json::to_string(&doc).unwrap(),
///     r#"[{"_t":"Shapes.Square","_v":{"Side":2.0}}]"#,
/// );
///
/// let back: Vec<Box<dyn Shape>> = registry.deserialize(&doc, &config).unwrap();
/// assert_eq!(back[0].area(), 4.0);
/// ```
#[macro_export]
macro_rules! impl_persist_interface {
    ($interface:path, $name:literal) => {
        impl $crate::Typed for $crate::__macro_exports::Box<dyn $interface> {
            #[inline]
            fn type_descriptor() -> $crate::__macro_exports::TypeDescriptor {
                $crate::__macro_exports::TypeDescriptor::new($name)
            }

            fn encode(
                &self,
                driver: &$crate::ser::SerializeDriver<'_>,
            ) -> $crate::__macro_exports::Result<$crate::__macro_exports::DocumentValue, $crate::PersistError> {
                let value: &dyn $crate::Persist = &**self;
                driver.encode_dyn_slot(value, &<Self as $crate::Typed>::type_descriptor())
            }

            fn decode(
                value: &$crate::__macro_exports::DocumentValue,
                driver: &$crate::de::DeserializeDriver<'_>,
            ) -> $crate::__macro_exports::Result<Self, $crate::PersistError> {
                driver.decode_interface::<dyn $interface>(value)
            }

            #[inline]
            fn is_interface() -> bool {
                true
            }
        }
    };
}
