use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, type_name};
use core::fmt;

use vc_document::{DocumentValue, TypeDescriptor};

use crate::de::DeserializeDriver;
use crate::registry::TypeRegistry;
use crate::ser::SerializeDriver;
use crate::{PersistError, Typed};

type EncodeFn = dyn Fn(&dyn Any, &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> + Send + Sync;
type SetFn = dyn Fn(&mut dyn Any, Box<dyn Any>) -> Result<(), PersistError> + Send + Sync;
type DecodeFn = fn(&DocumentValue, &DeserializeDriver<'_>) -> Result<Box<dyn Any>, PersistError>;
type InvokeFn = dyn Fn(&mut ConstructorArgs) -> Result<Box<dyn Any>, PersistError> + Send + Sync;

fn wrong_owner<C>() -> PersistError {
    PersistError::UnsupportedType {
        type_name: String::from(type_name::<C>()),
        reason: String::from("accessor called on a value of another type"),
    }
}

fn decode_boxed<F: Typed>(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Box<dyn Any>, PersistError> {
    F::decode(value, driver).map(|v| Box::new(v) as Box<dyn Any>)
}

fn register_field<F: Typed>(registry: &mut TypeRegistry) {
    registry.register::<F>();
}

// -----------------------------------------------------------------------------
// Property

/// A readable member of a class, with an optional setter.
///
/// The declared type `F` drives both directions: the getter's value is
/// encoded with `F::encode`, and document content is decoded with
/// `F::decode`, so a `Box<dyn Trait>` property gets a polymorphic slot.
#[derive(Clone)]
pub struct Property {
    name: &'static str,
    declared: fn() -> TypeDescriptor,
    encode: Arc<EncodeFn>,
    decode: DecodeFn,
    set: Option<Arc<SetFn>>,
    register: fn(&mut TypeRegistry),
}

impl Property {
    /// A property without a setter.
    pub fn readonly<C: Typed, F: Typed>(name: &'static str, get: fn(&C) -> &F) -> Self {
        Self {
            name,
            declared: F::type_descriptor,
            encode: Arc::new(move |owner: &dyn Any, driver: &SerializeDriver<'_>| {
                let owner = owner.downcast_ref::<C>().ok_or_else(wrong_owner::<C>)?;
                Typed::encode(get(owner), driver)
            }),
            decode: decode_boxed::<F>,
            set: None,
            register: register_field::<F>,
        }
    }

    /// A property with a setter.
    pub fn settable<C: Typed, F: Typed>(name: &'static str, get: fn(&C) -> &F, set: fn(&mut C, F)) -> Self {
        let mut property = Self::readonly(name, get);
        property.set = Some(Arc::new(move |owner: &mut dyn Any, value: Box<dyn Any>| {
            let owner = owner.downcast_mut::<C>().ok_or_else(wrong_owner::<C>)?;
            let value = value.downcast::<F>().map_err(|_| wrong_owner::<F>())?;
            set(owner, *value);
            Ok(())
        }));
        property
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn declared_type(&self) -> TypeDescriptor {
        (self.declared)()
    }

    #[inline]
    pub fn is_settable(&self) -> bool {
        self.set.is_some()
    }

    /// Reads the property of `owner` and encodes it.
    #[inline]
    pub fn encode(&self, owner: &dyn Any, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        (self.encode)(owner, driver)
    }

    /// Decodes a value of the declared type.
    #[inline]
    pub fn decode(&self, value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Box<dyn Any>, PersistError> {
        (self.decode)(value, driver)
    }

    /// Assigns a value produced by [`Property::decode`].
    pub fn set(&self, owner: &mut dyn Any, value: Box<dyn Any>) -> Result<(), PersistError> {
        match &self.set {
            Some(set) => set(owner, value),
            None => Err(PersistError::UnsupportedType {
                type_name: String::from(self.name),
                reason: String::from("property has no setter"),
            }),
        }
    }

    #[inline]
    pub(crate) fn register_declared(&self, registry: &mut TypeRegistry) {
        (self.register)(registry);
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("declared", &self.declared_type())
            .field("settable", &self.is_settable())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Constructor

/// A constructor taking named parameters positionally.
#[derive(Clone)]
pub struct Constructor {
    params: &'static [&'static str],
    invoke: Arc<InvokeFn>,
}

impl Constructor {
    /// `invoke` pulls its arguments out with [`ConstructorArgs::take`].
    ///
    /// ```
    /// use vc_persist::schema::Constructor;
    ///
    /// struct Point { x: i32, y: i32 }
    /// # impl vc_persist::Typed for Point {
    /// #     fn type_descriptor() -> vc_document::TypeDescriptor { vc_document::TypeDescriptor::new("Point") }
    /// #     fn encode(&self, d: &vc_persist::ser::SerializeDriver<'_>) -> Result<vc_document::DocumentValue, vc_persist::PersistError> { d.encode_object(self) }
    /// #     fn decode(v: &vc_document::DocumentValue, d: &vc_persist::de::DeserializeDriver<'_>) -> Result<Self, vc_persist::PersistError> { d.decode_object(v) }
    /// # }
    ///
    /// let ctor = Constructor::new::<Point>(&["x", "y"], |args| {
    ///     Ok(Point { x: args.take(0)?, y: args.take(1)? })
    /// });
    /// assert_eq!(ctor.params(), ["x", "y"]);
    /// ```
    pub fn new<C: Typed>(
        params: &'static [&'static str],
        invoke: fn(&mut ConstructorArgs) -> Result<C, PersistError>,
    ) -> Self {
        Self {
            params,
            invoke: Arc::new(move |args: &mut ConstructorArgs| invoke(args).map(|c| Box::new(c) as Box<dyn Any>)),
        }
    }

    #[inline]
    pub fn params(&self) -> &'static [&'static str] {
        self.params
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn invoke(&self, mut args: ConstructorArgs) -> Result<Box<dyn Any>, PersistError> {
        (self.invoke)(&mut args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Constructor").field(&self.params).finish()
    }
}

/// Decoded constructor arguments, in parameter order.
pub struct ConstructorArgs {
    type_name: String,
    params: &'static [&'static str],
    values: Vec<Option<Box<dyn Any>>>,
}

impl ConstructorArgs {
    pub(crate) fn new(type_name: &str, params: &'static [&'static str], values: Vec<Option<Box<dyn Any>>>) -> Self {
        Self {
            type_name: String::from(type_name),
            params,
            values,
        }
    }

    /// Moves argument `index` out as a `T`.
    ///
    /// A missing argument, or one of another type, is a
    /// [`PersistError::ConstructorArgumentMismatch`].
    pub fn take<T: Any>(&mut self, index: usize) -> Result<T, PersistError> {
        let (type_name, params) = (&self.type_name, self.params);
        let mismatch = || PersistError::ConstructorArgumentMismatch {
            type_name: type_name.clone(),
            parameter: match params.get(index) {
                Some(name) => String::from(*name),
                None => format!("#{index}"),
            },
        };
        let Some(value) = self.values.get_mut(index).and_then(Option::take) else {
            return Err(mismatch());
        };
        value.downcast::<T>().map(|v| *v).map_err(|_| mismatch())
    }
}

// -----------------------------------------------------------------------------
// ClassShape

/// Compile-time description of a class type: its properties in declaration
/// order, its constructors and an optional parameterless factory.
///
/// # Examples
///
/// A constructor-only type:
///
/// ```
/// use vc_persist::schema::{ClassShape, Constructor, Property};
/// # use vc_persist::Typed;
///
/// struct Point { x: i32, y: i32 }
/// # impl Typed for Point {
/// #     fn type_descriptor() -> vc_document::TypeDescriptor { vc_document::TypeDescriptor::new("Point") }
/// #     fn encode(&self, d: &vc_persist::ser::SerializeDriver<'_>) -> Result<vc_document::DocumentValue, vc_persist::PersistError> { d.encode_object(self) }
/// #     fn decode(v: &vc_document::DocumentValue, d: &vc_persist::de::DeserializeDriver<'_>) -> Result<Self, vc_persist::PersistError> { d.decode_object(v) }
/// # }
///
/// let shape = ClassShape::new()
///     .property(Property::readonly::<Point, i32>("X", |p| &p.x))
///     .property(Property::readonly::<Point, i32>("Y", |p| &p.y))
///     .constructor(Constructor::new::<Point>(&["x", "y"], |args| {
///         Ok(Point { x: args.take(0)?, y: args.take(1)? })
///     }));
///
/// assert_eq!(shape.properties().len(), 2);
/// assert!(!shape.has_parameterless_creation());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClassShape {
    properties: Vec<Property>,
    constructors: Vec<Constructor>,
    default: Option<fn() -> Box<dyn Any>>,
}

fn default_boxed<C: Default + Any>() -> Box<dyn Any> {
    Box::new(C::default())
}

impl ClassShape {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Uses `C::default()` as the parameterless factory.
    pub fn with_default<C: Typed + Default>(mut self) -> Self {
        self.default = Some(default_boxed::<C>);
        self
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    #[inline]
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// A default factory or a constructor without parameters.
    pub fn has_parameterless_creation(&self) -> bool {
        self.default.is_some() || self.constructors.iter().any(|c| c.arity() == 0)
    }

    /// Creates an instance without arguments.
    pub(crate) fn create(&self, type_name: &str) -> Result<Box<dyn Any>, PersistError> {
        if let Some(default) = self.default {
            return Ok(default());
        }
        match self.constructors.iter().find(|c| c.arity() == 0) {
            Some(ctor) => ctor.invoke(ConstructorArgs::new(type_name, &[], Vec::new())),
            None => Err(PersistError::UnsupportedType {
                type_name: String::from(type_name),
                reason: String::from("no parameterless constructor"),
            }),
        }
    }
}
