//! Documents to values.
//!
//! [`DeserializeDriver::deserialize`] is the root entry point: it runs the
//! version gate, upgrading stale documents with the configured
//! [`Converter`](vc_migrate::Converter), then dispatches on the target
//! type's [`Typed::decode`].
//!
//! Class types decode through [`DeserializeDriver::decode_object`]:
//!
//! - **Mutable**: create, then assign every settable member the document
//!   carries. Unknown fields are ignored and absent members keep their
//!   default.
//! - **Immutable**: decode one argument per constructor parameter and call
//!   the constructor. A missing argument is a
//!   [`PersistError::ConstructorArgumentMismatch`] unless its type decodes
//!   from null, as `Option` does.
//!
//! Polymorphic slots decode through [`DeserializeDriver::decode_dyn`] and
//! [`DeserializeDriver::decode_interface`], which resolve the `_t`
//! discriminator against the registry.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::{Any, type_name};

use vc_document::{Document, DocumentValue, TYPE_FIELD, TypeDescriptor, VALUE_FIELD, VERSION_FIELD};

use crate::registry::{TypeMeta, TypeRegistry, Upcast};
use crate::schema::{ConstructorArgs, MemberAccess, SchemaKind};
use crate::{Persist, PersistConfig, PersistError, Typed};

// -----------------------------------------------------------------------------
// DeserializeDriver

/// Deserialization context of one call.
#[derive(Clone, Copy, Debug)]
pub struct DeserializeDriver<'a> {
    registry: &'a TypeRegistry,
    config: &'a PersistConfig,
}

impl<'a> DeserializeDriver<'a> {
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

    /// Decodes a root document as a `T`, upgrading it first if its
    /// `_version` is older than [`PersistConfig::schema_version`].
    pub fn deserialize<T: Typed>(&self, doc: &DocumentValue) -> Result<T, PersistError> {
        let current = self.version_gate(doc)?;
        T::decode(&current, self)
    }

    /// Strips the `_version` stamp and upgrades stale documents.
    ///
    /// A missing stamp, or a root that is not a document, counts as
    /// version 0. Documents newer than the running schema are decoded as
    /// they are, with a warning. Without a converter, stale documents are
    /// decoded as they are too.
    ///
    /// # Examples
    ///
    /// ```
    /// use vc_document::DocumentValue;
    /// use vc_migrate::ConverterBuilder;
    /// use vc_persist::{PersistConfig, de::DeserializeDriver, registry::TypeRegistry};
    ///
    /// let converter = ConverterBuilder::new()
    ///     .rename_member("Geo.Point.Xpos", "X")
    ///     .build()
    ///     .unwrap();
    /// let config = PersistConfig::default()
    ///     .with_schema_version(2)
    ///     .with_converter(converter);
    /// let registry = TypeRegistry::new();
    /// let driver = DeserializeDriver::new(&registry, &config);
    ///
    /// let json = r#"{"_version":1,"_t":"Geo.Point","Xpos":3}"#;
    /// let old: DocumentValue = serde_json::from_str(json).unwrap();
    /// let current = driver.version_gate(&old).unwrap();
    /// assert_eq!(serde_json::to_string(&*current).unwrap(), r#"{"_t":"Geo.Point","X":3}"#);
    /// ```
    pub fn version_gate<'d>(&self, doc: &'d DocumentValue) -> Result<Cow<'d, DocumentValue>, PersistError> {
        let (version, current) = match doc {
            DocumentValue::Document(fields) => match fields.get(VERSION_FIELD) {
                None => (0, Cow::Borrowed(doc)),
                Some(DocumentValue::Int(version)) => {
                    let mut stripped = fields.clone();
                    stripped.remove(VERSION_FIELD);
                    (*version, Cow::Owned(DocumentValue::Document(stripped)))
                }
                Some(other) => return Err(PersistError::decode("an integer `_version`", other)),
            },
            _ => (0, Cow::Borrowed(doc)),
        };

        let running = i64::from(self.config.schema_version);
        if version > running {
            log::warn!("document version {version} is newer than the running schema version {running}");
            return Ok(current);
        }
        if version == running {
            return Ok(current);
        }
        let Some(converter) = self.config.converter.as_deref() else {
            log::debug!("document version {version} is stale but no converter is configured");
            return Ok(current);
        };

        let upgraded = match vc_migrate::upgrade(&current, converter)? {
            Cow::Owned(upgraded) => Some(upgraded),
            Cow::Borrowed(_) => None,
        };
        log::debug!(
            "upgraded document from version {version} to {running} ({})",
            if upgraded.is_some() { "changed" } else { "unchanged" },
        );
        Ok(match upgraded {
            Some(upgraded) => Cow::Owned(upgraded),
            None => current,
        })
    }

    /// Decodes a nested value as a `T`; no version gate.
    #[inline]
    pub fn decode<T: Typed>(&self, value: &DocumentValue) -> Result<T, PersistError> {
        T::decode(value, self)
    }

    /// Decodes a class value through its schema.
    ///
    /// A `_t` discriminator, if present, must name `C` itself. The payload
    /// is then read from `_v`, or from the document's own fields when there
    /// is no `_v`.
    pub fn decode_object<C: Typed>(&self, value: &DocumentValue) -> Result<C, PersistError> {
        let DocumentValue::Document(doc) = value else {
            return Err(PersistError::decode("a document", value));
        };
        let fields = Self::unwrap_discriminated::<C>(doc)?;
        let schema = self.registry.schema_of::<C>()?;
        let properties = schema.shape().properties();
        let class_name = C::type_descriptor().encode();

        let object: Box<dyn Any> = match schema.kind() {
            SchemaKind::Mutable => {
                let mut object = schema.shape().create(&class_name)?;
                for member in schema.members() {
                    if member.access != MemberAccess::Setter {
                        continue;
                    }
                    let Some((_, field)) = fields.get_ignore_case(member.name) else {
                        continue;
                    };
                    let property = &properties[member.property];
                    property
                        .decode(field, self)
                        .and_then(|decoded| property.set(&mut *object, decoded))
                        .map_err(|error| error.in_member(member.name))?;
                }
                object
            }
            SchemaKind::Immutable => {
                let Some(constructor) = schema.constructor() else {
                    return Err(PersistError::UnsupportedType {
                        type_name: class_name,
                        reason: String::from("immutable schema without a constructor"),
                    });
                };
                let params = constructor.params();
                let mut values = Vec::with_capacity(params.len());
                for (index, param) in params.iter().enumerate() {
                    let Some(member) = schema.parameter_member(index) else {
                        return Err(PersistError::ConstructorArgumentMismatch {
                            type_name: class_name,
                            parameter: String::from(*param),
                        });
                    };
                    let property = &properties[member.property];
                    let decoded = match fields.get_ignore_case(member.name) {
                        Some((_, field)) => property
                            .decode(field, self)
                            .map_err(|error| error.in_member(member.name))?,
                        None => property.decode(&DocumentValue::Null, self).map_err(|_| {
                            PersistError::ConstructorArgumentMismatch {
                                type_name: class_name.clone(),
                                parameter: String::from(*param),
                            }
                        })?,
                    };
                    values.push(Some(decoded));
                }
                constructor.invoke(ConstructorArgs::new(&class_name, params, values))?
            }
        };

        object
            .downcast::<C>()
            .map(|object| *object)
            .map_err(|_| PersistError::UnsupportedType {
                type_name: class_name,
                reason: format!("shape creates values of another type than `{}`", type_name::<C>()),
            })
    }

    /// The payload of a document that may carry a discriminator naming `C`.
    fn unwrap_discriminated<C: Typed>(doc: &Document) -> Result<&Document, PersistError> {
        let Some(tag) = doc.get(TYPE_FIELD) else {
            return Ok(doc);
        };
        let DocumentValue::String(text) = tag else {
            return Err(PersistError::decode("a string discriminator", tag));
        };
        let expected = C::type_descriptor();
        if TypeDescriptor::decode(text)? != expected {
            return Err(PersistError::TypeResolution {
                descriptor: text.clone(),
                reason: format!("a `{expected}` was expected here"),
            });
        }
        match doc.get(VALUE_FIELD) {
            None => Ok(doc),
            Some(DocumentValue::Document(inner)) => Ok(inner),
            Some(other) => Err(PersistError::decode("a document", other)),
        }
    }

    /// Resolves the `_t` discriminator of `value`.
    ///
    /// Returns the registered type and the payload to decode it from: the
    /// `_v` field, or the whole document when there is none.
    pub fn resolve_discriminator<'v>(
        &self,
        value: &'v DocumentValue,
    ) -> Result<(&'a TypeMeta, &'v DocumentValue), PersistError> {
        let Some(tag) = value.get(TYPE_FIELD) else {
            return Err(PersistError::decode("a document with a `_t` discriminator", value));
        };
        let DocumentValue::String(text) = tag else {
            return Err(PersistError::decode("a string discriminator", tag));
        };
        let descriptor = TypeDescriptor::decode(text)?;
        let meta = self.registry.resolve(&descriptor)?;
        if meta.is_interface() {
            return Err(PersistError::TypeResolution {
                descriptor: descriptor.encode(),
                reason: String::from("an interface cannot be instantiated"),
            });
        }
        Ok((meta, value.get(VALUE_FIELD).unwrap_or(value)))
    }

    /// Decodes a discriminated value as whatever type it names.
    pub fn decode_dyn(&self, value: &DocumentValue) -> Result<Box<dyn Persist>, PersistError> {
        let (meta, payload) = self.resolve_discriminator(value)?;
        meta.decode(payload, self)
    }

    /// Decodes a discriminated value into the interface `I`.
    ///
    /// The named type must have been registered with an [`Upcast<I>`], which
    /// `#[persist(implements(..))]` does.
    pub fn decode_interface<I: ?Sized + 'static>(&self, value: &DocumentValue) -> Result<Box<I>, PersistError> {
        let (meta, payload) = self.resolve_discriminator(value)?;
        let Some(upcast) = meta.get_trait::<Upcast<I>>() else {
            return Err(PersistError::TypeResolution {
                descriptor: String::from(meta.key()),
                reason: format!("the type does not implement `{}`", type_name::<I>()),
            });
        };
        let decoded = meta.decode(payload, self)?;
        upcast
            .cast(Persist::into_any(decoded))
            .map_err(|_| PersistError::UnsupportedType {
                type_name: String::from(meta.key()),
                reason: format!("registered cast to `{}` rejected the value", type_name::<I>()),
            })
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use vc_document::DocumentValue;
    use vc_migrate::ConverterBuilder;

    use crate::derive::Persist;
    use crate::registry::TypeRegistryArc;
    use crate::schema::SchemaKind;
    use crate::{Persist, PersistConfig, PersistError, impl_persist_interface};

    trait Shape: Persist + core::fmt::Debug {
        fn area(&self) -> f64;
    }

    impl_persist_interface!(Shape, "Shapes.IShape");

    #[derive(Persist, Debug, PartialEq)]
    #[persist(type_path = "Shapes.Circle", implements(Shape))]
    struct Circle {
        #[persist(rename = "Radius")]
        radius: f64,
    }

    impl Shape for Circle {
        fn area(&self) -> f64 {
            3.0 * self.radius * self.radius
        }
    }

    #[derive(Persist, Debug, PartialEq)]
    #[persist(type_path = "Geo.Point")]
    struct Point {
        #[persist(rename = "X")]
        x: i32,
        #[persist(rename = "Y")]
        y: i32,
    }

    #[derive(Persist)]
    #[persist(type_path = "Shapes.Drawing")]
    struct Drawing {
        #[persist(rename = "Main")]
        main: Circle,
        #[persist(rename = "Shapes")]
        shapes: Vec<Box<dyn Shape>>,
    }

    #[derive(Persist, Debug, Default, PartialEq)]
    #[persist(type_path = "Cfg.Settings", default, rename_all = "PascalCase")]
    struct Settings {
        title: String,
        retries: u32,
        tags: Vec<String>,
    }

    #[derive(Persist, Debug, PartialEq)]
    #[persist(type_path = "Cfg.Level")]
    enum Level {
        Low,
        #[persist(rename = "HIGH")]
        High,
    }

    fn json(doc: &DocumentValue) -> String {
        serde_json::to_string(doc).unwrap()
    }

    fn parse(text: &str) -> DocumentValue {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn interface_slot_carries_discriminator() {
        let registry = TypeRegistryArc::default();
        registry.register::<Circle>();
        let config = PersistConfig::default();

        let shape: Box<dyn Shape> = Box::new(Circle { radius: 5.0 });
        let doc = registry.serialize(&shape, &config).unwrap();
        assert_eq!(json(&doc), r#"{"_t":"Shapes.Circle","_v":{"Radius":5.0}}"#);

        let back: Box<dyn Shape> = registry.deserialize(&doc, &config).unwrap();
        assert_eq!(back.area(), 75.0);
        assert_eq!((*back).as_any().downcast_ref::<Circle>(), Some(&Circle { radius: 5.0 }));
    }

    #[test]
    fn monomorphic_slots_stay_bare() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let drawing = Drawing {
            main: Circle { radius: 1.0 },
            shapes: vec![Box::new(Circle { radius: 2.0 })],
        };
        let doc = registry.serialize(&drawing, &config).unwrap();
        assert_eq!(
            json(&doc),
            r#"{"Main":{"Radius":1.0},"Shapes":[{"_t":"Shapes.Circle","_v":{"Radius":2.0}}]}"#
        );

        let back: Drawing = registry.deserialize(&doc, &config).unwrap();
        assert_eq!(back.main, Circle { radius: 1.0 });
        assert_eq!(back.shapes.len(), 1);
        assert_eq!(back.shapes[0].area(), 12.0);
    }

    #[test]
    fn immutable_point_uses_constructor() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        assert_eq!(registry.schema_of::<Point>().unwrap().kind(), SchemaKind::Immutable);

        let doc = registry.serialize(&Point { x: 1, y: 2 }, &config).unwrap();
        assert_eq!(json(&doc), r#"{"X":1,"Y":2}"#);
        assert_eq!(registry.deserialize::<Point>(&doc, &config).unwrap(), Point { x: 1, y: 2 });

        // Parameters bind ignoring case.
        let lower = parse(r#"{"x":3,"y":4}"#);
        assert_eq!(registry.deserialize::<Point>(&lower, &config).unwrap(), Point { x: 3, y: 4 });
    }

    #[test]
    fn missing_constructor_field_is_reported() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let error = registry.deserialize::<Point>(&parse(r#"{"X":1}"#), &config).unwrap_err();
        match error {
            PersistError::ConstructorArgumentMismatch { type_name, parameter } => {
                assert_eq!(type_name, "Geo.Point");
                assert_eq!(parameter, "Y");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mutable_decode_ignores_unknown_fields() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        assert_eq!(registry.schema_of::<Settings>().unwrap().kind(), SchemaKind::Mutable);

        let doc = parse(r#"{"title":"x","Unknown":1,"Tags":["a"]}"#);
        let settings: Settings = registry.deserialize(&doc, &config).unwrap();
        assert_eq!(
            settings,
            Settings {
                title: String::from("x"),
                retries: 0,
                tags: vec![String::from("a")],
            }
        );

        let bare = registry.serialize(&settings, &config).unwrap();
        assert_eq!(json(&bare), r#"{"Title":"x","Retries":0,"Tags":["a"]}"#);

        let config = config.with_stamp_version(true);
        let stamped = registry.serialize(&settings, &config).unwrap();
        assert_eq!(json(&stamped), r#"{"Title":"x","Retries":0,"Tags":["a"],"_version":0}"#);
        assert_eq!(registry.deserialize::<Settings>(&stamped, &config).unwrap(), settings);
    }

    #[test]
    fn enums_use_variant_names() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        assert_eq!(registry.serialize(&Level::Low, &config).unwrap(), DocumentValue::from("Low"));
        assert_eq!(registry.deserialize::<Level>(&DocumentValue::from("HIGH"), &config).unwrap(), Level::High);

        let error = registry.deserialize::<Level>(&DocumentValue::from("Medium"), &config).unwrap_err();
        assert!(matches!(error, PersistError::UnknownVariant { ref value, .. } if value == "Medium"));
        assert!(matches!(
            registry.deserialize::<Level>(&DocumentValue::Int(1), &config),
            Err(PersistError::Decode { .. })
        ));
    }

    #[test]
    fn concrete_slots_check_discriminator() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let flattened = parse(r#"{"_t":"Geo.Point","X":1,"Y":2}"#);
        assert_eq!(registry.deserialize::<Point>(&flattened, &config).unwrap(), Point { x: 1, y: 2 });

        let foreign = parse(r#"{"_t":"Geo.Other","X":1,"Y":2}"#);
        assert!(matches!(
            registry.deserialize::<Point>(&foreign, &config),
            Err(PersistError::TypeResolution { .. })
        ));
    }

    #[test]
    fn interface_slot_rejects_unknown_and_foreign_types() {
        let registry = TypeRegistryArc::default();
        registry.register::<Point>();
        let config = PersistConfig::default();

        let unknown = parse(r#"{"_t":"Shapes.Square","_v":{"Side":1}}"#);
        let error = registry.deserialize::<Box<dyn Shape>>(&unknown, &config).unwrap_err();
        assert!(matches!(error, PersistError::TypeResolution { .. }));

        let point = parse(r#"{"_t":"Geo.Point","_v":{"X":1,"Y":2}}"#);
        let error = registry.deserialize::<Box<dyn Shape>>(&point, &config).unwrap_err();
        assert!(matches!(error, PersistError::TypeResolution { ref descriptor, .. } if descriptor == "Geo.Point"));

        let bare = parse(r#"{"Radius":1.0}"#);
        assert!(matches!(
            registry.deserialize::<Box<dyn Shape>>(&bare, &config),
            Err(PersistError::Decode { .. })
        ));
    }

    #[test]
    fn stale_documents_are_upgraded() {
        let registry = TypeRegistryArc::default();
        registry.register::<Circle>();

        let converter = ConverterBuilder::new()
            .rename_type("Old.Round", "Shapes.Circle")
            .rename_member("Old.Round.Rad", "Radius")
            .build()
            .unwrap();
        let config = PersistConfig::default().with_schema_version(2).with_converter(converter);

        let old = parse(r#"{"_version":1,"_t":"Old.Round","_v":{"Rad":5.0}}"#);
        let shape: Box<dyn Shape> = registry.deserialize(&old, &config).unwrap();
        assert_eq!(shape.area(), 75.0);

        // Current documents skip the converter.
        let current = parse(r#"{"_version":2,"_t":"Old.Round","_v":{"Rad":5.0}}"#);
        assert!(registry.deserialize::<Box<dyn Shape>>(&current, &config).is_err());
    }

    #[test]
    fn deleted_types_abort_decoding() {
        let registry = TypeRegistryArc::default();
        let converter = ConverterBuilder::new()
            .delete("Old.Obsolete", "Old.Obsolete was removed; re-create it as Shapes.Circle")
            .build()
            .unwrap();
        let config = PersistConfig::default().with_schema_version(1).with_converter(converter);

        let doc = parse(r#"[{"_t":"Old.Obsolete","_v":{}}]"#);
        let error = registry.deserialize::<Vec<Box<dyn Persist>>>(&doc, &config).unwrap_err();
        assert!(matches!(error, PersistError::Upgrade(_)));
        assert_eq!(error.to_string(), "Old.Obsolete was removed; re-create it as Shapes.Circle");
    }

    #[test]
    fn version_stamp_must_be_an_integer() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        let doc = parse(r#"{"_version":"1","X":1,"Y":2}"#);
        assert!(matches!(
            registry.deserialize::<Point>(&doc, &config),
            Err(PersistError::Decode { .. })
        ));

        // Newer documents decode as they are.
        let newer = parse(r#"{"_version":9,"X":1,"Y":2}"#);
        assert_eq!(registry.deserialize::<Point>(&newer, &config).unwrap(), Point { x: 1, y: 2 });
    }
}
