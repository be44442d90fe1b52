use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use vc_document::TypeDescriptor;

use crate::PersistError;
use crate::schema::{ClassShape, Constructor};

/// How a class is created on decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaKind {
    /// Parameterless creation, then setters.
    Mutable,
    /// A single constructor call.
    Immutable,
}

/// How a member is written back on decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberAccess {
    Setter,
    /// Position in the selected constructor.
    ConstructorParam(usize),
    /// Encoded, never decoded.
    ReadOnly,
}

/// One encoded member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberBinding {
    pub name: &'static str,
    pub declared: TypeDescriptor,
    pub access: MemberAccess,
    /// Index into [`ClassShape::properties`].
    pub property: usize,
}

/// The derived mapping between a class and its document form.
#[derive(Debug)]
pub struct ClassSchema {
    kind: SchemaKind,
    members: Vec<MemberBinding>,
    constructor: Option<usize>,
    shape: ClassShape,
}

impl ClassSchema {
    /// Derives the schema of `shape`. `type_name` only labels errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use vc_persist::schema::{ClassSchema, ClassShape, Constructor, MemberAccess, Property, SchemaKind};
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
    ///     .constructor(Constructor::new::<Point>(&["y"], |args| Ok(Point { x: 0, y: args.take(0)? })))
    ///     .constructor(Constructor::new::<Point>(&["x", "y"], |args| {
    ///         Ok(Point { x: args.take(0)?, y: args.take(1)? })
    ///     }));
    ///
    /// let schema = ClassSchema::derive(shape, "Point").unwrap();
    /// assert_eq!(schema.kind(), SchemaKind::Immutable);
    /// assert_eq!(schema.constructor().map(|c| c.arity()), Some(2));
    /// assert_eq!(schema.members()[1].access, MemberAccess::ConstructorParam(1));
    /// ```
    pub fn derive(shape: ClassShape, type_name: &str) -> Result<Self, PersistError> {
        let unsupported = |reason: String| PersistError::UnsupportedType {
            type_name: String::from(type_name),
            reason,
        };

        let any_setter = shape.properties().iter().any(|p| p.is_settable());
        let kind = if !shape.has_parameterless_creation() && !any_setter {
            SchemaKind::Immutable
        } else {
            SchemaKind::Mutable
        };

        let (constructor, bindings) = match kind {
            SchemaKind::Mutable => {
                if !shape.has_parameterless_creation() {
                    return Err(unsupported(String::from(
                        "settable members but no parameterless constructor",
                    )));
                }
                (None, Vec::new())
            }
            SchemaKind::Immutable => {
                let Some((index, bindings)) = select_constructor(&shape) else {
                    return Err(unsupported(String::from(
                        "no constructor whose parameters each match exactly one property",
                    )));
                };
                (Some(index), bindings)
            }
        };

        let members = shape
            .properties()
            .iter()
            .enumerate()
            .map(|(i, property)| {
                let access = match kind {
                    SchemaKind::Mutable if property.is_settable() => MemberAccess::Setter,
                    SchemaKind::Mutable => MemberAccess::ReadOnly,
                    SchemaKind::Immutable => match bindings.iter().position(|&bound| bound == i) {
                        Some(param) => MemberAccess::ConstructorParam(param),
                        None => MemberAccess::ReadOnly,
                    },
                };
                MemberBinding {
                    name: property.name(),
                    declared: property.declared_type(),
                    access,
                    property: i,
                }
            })
            .collect();

        Ok(Self {
            kind,
            members,
            constructor,
            shape,
        })
    }

    #[inline]
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// Members in declaration order.
    #[inline]
    pub fn members(&self) -> &[MemberBinding] {
        &self.members
    }

    #[inline]
    pub fn shape(&self) -> &ClassShape {
        &self.shape
    }

    /// The selected constructor of an immutable schema.
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.and_then(|i| self.shape.constructors().get(i))
    }

    /// The member bound to constructor parameter `param`.
    pub fn parameter_member(&self, param: usize) -> Option<&MemberBinding> {
        self.members
            .iter()
            .find(|m| m.access == MemberAccess::ConstructorParam(param))
    }

    pub fn describe(&self) -> String {
        let members: Vec<String> = self
            .members
            .iter()
            .map(|m| format!("{}: {} ({:?})", m.name, m.declared, m.access))
            .collect();
        format!("{:?} {{ {} }}", self.kind, members.join(", "))
    }
}

/// Picks the constructor of highest arity whose parameters bind 1:1 to
/// properties. Returns its index and, per parameter, the bound property.
fn select_constructor(shape: &ClassShape) -> Option<(usize, Vec<usize>)> {
    let mut best: Option<(usize, Vec<usize>)> = None;
    for (index, ctor) in shape.constructors().iter().enumerate() {
        if best.as_ref().is_some_and(|(b, _)| shape.constructors()[*b].arity() >= ctor.arity()) {
            continue;
        }
        if let Some(bindings) = bind_parameters(shape, ctor) {
            best = Some((index, bindings));
        }
    }
    best
}

fn bind_parameters(shape: &ClassShape, ctor: &Constructor) -> Option<Vec<usize>> {
    let mut bindings = Vec::with_capacity(ctor.arity());
    for param in ctor.params() {
        let mut matches = shape
            .properties()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.name().eq_ignore_ascii_case(param))
            .map(|(i, _)| i);
        let (Some(bound), None) = (matches.next(), matches.next()) else {
            return None;
        };
        if bindings.contains(&bound) {
            return None;
        }
        bindings.push(bound);
    }
    Some(bindings)
}

#[cfg(test)]
mod tests {
    use super::{ClassSchema, MemberAccess, SchemaKind};
    use crate::schema::{ClassShape, Constructor, Property};
    use crate::{PersistError, Typed};
    use vc_document::{DocumentValue, TypeDescriptor};

    #[derive(Default)]
    struct Pair {
        a: i32,
        b: i32,
    }

    impl Typed for Pair {
        fn type_descriptor() -> TypeDescriptor {
            TypeDescriptor::new("Test.Pair")
        }
        fn encode(&self, driver: &crate::ser::SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
            driver.encode_object(self)
        }
        fn decode(value: &DocumentValue, driver: &crate::de::DeserializeDriver<'_>) -> Result<Self, PersistError> {
            driver.decode_object(value)
        }
    }

    fn readonly() -> ClassShape {
        ClassShape::new()
            .property(Property::readonly::<Pair, i32>("A", |p| &p.a))
            .property(Property::readonly::<Pair, i32>("B", |p| &p.b))
    }

    #[test]
    fn ties_go_to_the_first_declared() {
        let shape = readonly()
            .constructor(Constructor::new::<Pair>(&["b", "a"], |args| {
                Ok(Pair { b: args.take(0)?, a: args.take(1)? })
            }))
            .constructor(Constructor::new::<Pair>(&["a", "b"], |args| {
                Ok(Pair { a: args.take(0)?, b: args.take(1)? })
            }));
        let schema = ClassSchema::derive(shape, "Pair").unwrap();
        assert_eq!(schema.constructor().unwrap().params(), ["b", "a"]);
        assert_eq!(schema.members()[0].access, MemberAccess::ConstructorParam(1));
        assert_eq!(schema.parameter_member(0).unwrap().name, "B");
    }

    #[test]
    fn unmatched_parameters_fall_back_to_lower_arity() {
        let shape = readonly()
            .constructor(Constructor::new::<Pair>(&["a", "c"], |_| Ok(Pair::default())))
            .constructor(Constructor::new::<Pair>(&["A"], |args| Ok(Pair { a: args.take(0)?, b: 0 })));
        let schema = ClassSchema::derive(shape, "Pair").unwrap();
        assert_eq!(schema.constructor().unwrap().arity(), 1);
        assert_eq!(schema.members()[1].access, MemberAccess::ReadOnly);
    }

    #[test]
    fn no_viable_constructor_is_unsupported() {
        let shape = readonly().constructor(Constructor::new::<Pair>(&["a", "a"], |_| Ok(Pair::default())));
        assert!(matches!(
            ClassSchema::derive(shape, "Pair"),
            Err(PersistError::UnsupportedType { .. })
        ));
        assert!(ClassSchema::derive(readonly(), "Pair").is_err());
    }

    #[test]
    fn setters_make_a_mutable_schema() {
        let shape = ClassShape::new()
            .with_default::<Pair>()
            .property(Property::settable::<Pair, i32>("A", |p| &p.a, |p, v| p.a = v))
            .property(Property::readonly::<Pair, i32>("B", |p| &p.b));
        let schema = ClassSchema::derive(shape, "Pair").unwrap();
        assert_eq!(schema.kind(), SchemaKind::Mutable);
        assert_eq!(schema.members()[0].access, MemberAccess::Setter);
        assert_eq!(schema.members()[1].access, MemberAccess::ReadOnly);

        let without_default =
            ClassShape::new().property(Property::settable::<Pair, i32>("A", |p| &p.a, |p, v| p.a = v));
        assert!(ClassSchema::derive(without_default, "Pair").is_err());
    }
}
