use alloc::boxed::Box;
use core::any::Any;
use core::fmt;

use crate::Typed;

// -----------------------------------------------------------------------------
// TypeTrait

/// A capability attached to a registered type, stored in its
/// [`TypeMeta`](crate::registry::TypeMeta) and looked up by its own type.
pub trait TypeTrait: Any + Send + Sync {
    fn clone_type_trait(&self) -> Box<dyn TypeTrait>;
}

impl<T: Clone + Any + Send + Sync> TypeTrait for T {
    #[inline]
    fn clone_type_trait(&self) -> Box<dyn TypeTrait> {
        Box::new(self.clone())
    }
}

impl dyn TypeTrait {
    #[inline]
    pub fn downcast_ref<T: TypeTrait>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }

    #[inline]
    pub fn downcast_mut<T: TypeTrait>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut()
    }
}

impl fmt::Debug for dyn TypeTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn TypeTrait")
    }
}

/// Builds a [`TypeTrait`] for a concrete type.
pub trait FromType<T: Typed> {
    fn from_type() -> Self;
}

// -----------------------------------------------------------------------------
// Upcast

/// Casts a decoded concrete value to the interface `I`.
///
/// Registered by `#[persist(implements(Trait))]`; the deserializer uses it to
/// fill `Box<dyn Trait>` slots.
///
/// ```
/// use core::any::Any;
/// use vc_persist::registry::Upcast;
///
/// trait Named { fn name(&self) -> &str; }
/// struct Cat;
/// impl Named for Cat { fn name(&self) -> &str { "cat" } }
///
/// let upcast = Upcast::<dyn Named>::new(|any| any.downcast::<Cat>().map(|c| c as Box<dyn Named>));
/// let named = upcast.cast(Box::new(Cat) as Box<dyn Any>).ok().unwrap();
/// assert_eq!(named.name(), "cat");
/// ```
pub struct Upcast<I: ?Sized + 'static> {
    func: fn(Box<dyn Any>) -> Result<Box<I>, Box<dyn Any>>,
}

impl<I: ?Sized + 'static> Upcast<I> {
    #[inline]
    pub const fn new(func: fn(Box<dyn Any>) -> Result<Box<I>, Box<dyn Any>>) -> Self {
        Self { func }
    }

    /// Returns the value back if it is not of the type this cast was built for.
    #[inline]
    pub fn cast(&self, value: Box<dyn Any>) -> Result<Box<I>, Box<dyn Any>> {
        (self.func)(value)
    }
}

impl<I: ?Sized + 'static> Clone for Upcast<I> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: ?Sized + 'static> Copy for Upcast<I> {}
