use alloc::format;
use alloc::string::String;

use vc_document::{DocumentValue, MethodRef, TypeDescriptor};

use crate::de::DeserializeDriver;
use crate::ser::SerializeDriver;
use crate::{PersistError, Typed};

// -----------------------------------------------------------------------------
// Integers

macro_rules! impl_integer {
    ($($ty:ident),* $(,)?) => {$(
        impl Typed for $ty {
            #[inline]
            fn type_descriptor() -> TypeDescriptor {
                TypeDescriptor::new(stringify!($ty))
            }

            fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
                i64::try_from(*self)
                    .map(DocumentValue::Int)
                    .map_err(|_| PersistError::Encode(format!("{} `{self}` is outside the document integer range", stringify!($ty))))
            }

            fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
                let DocumentValue::Int(int) = value else {
                    return Err(PersistError::decode(concat!("an integer (", stringify!($ty), ")"), value));
                };
                <$ty>::try_from(*int).map_err(|_| PersistError::Decode {
                    expected: String::from(concat!("an integer in range of ", stringify!($ty))),
                    found: format!("{int}"),
                })
            }
        }
    )*};
}

impl_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

// -----------------------------------------------------------------------------
// Floats

impl Typed for f64 {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("f64")
    }

    #[inline]
    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::Float(*self))
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        value.as_f64().ok_or_else(|| PersistError::decode("a number", value))
    }
}

impl Typed for f32 {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("f32")
    }

    #[inline]
    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::Float(f64::from(*self)))
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        let float = value.as_f64().ok_or_else(|| PersistError::decode("a number", value))?;
        // Infinities and NaN carry over; finite values must fit.
        if float.is_finite() && !(f64::from(f32::MIN)..=f64::from(f32::MAX)).contains(&float) {
            return Err(PersistError::Decode {
                expected: String::from("a number in range of f32"),
                found: format!("{float}"),
            });
        }
        Ok(float as f32)
    }
}

// -----------------------------------------------------------------------------
// Text and flags

impl Typed for bool {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("bool")
    }

    #[inline]
    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::Bool(*self))
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        value.as_bool().ok_or_else(|| PersistError::decode("a boolean", value))
    }
}

impl Typed for String {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("String")
    }

    #[inline]
    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::String(self.clone()))
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| PersistError::decode("a string", value))
    }
}

impl Typed for char {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("char")
    }

    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::String(String::from(*self)))
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        let text = value.as_str().ok_or_else(|| PersistError::decode("a character", value))?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(PersistError::Decode {
                expected: String::from("a single character"),
                found: format!("{:?}", text),
            }),
        }
    }
}

impl Typed for () {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("Unit")
    }

    #[inline]
    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::Null)
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        match value {
            DocumentValue::Null => Ok(()),
            other => Err(PersistError::decode("null", other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Document model

impl Typed for DocumentValue {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("DocumentValue")
    }

    #[inline]
    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(self.clone())
    }

    #[inline]
    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        Ok(value.clone())
    }
}

impl Typed for TypeDescriptor {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("TypeDescriptor")
    }

    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::Document(self.to_document()))
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        let doc = value
            .as_document()
            .ok_or_else(|| PersistError::decode("a type reference document", value))?;
        Ok(TypeDescriptor::from_document(doc)?)
    }
}

impl Typed for MethodRef {
    #[inline]
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::new("MethodRef")
    }

    fn encode(&self, _driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        Ok(DocumentValue::Document(self.to_document()))
    }

    fn decode(value: &DocumentValue, _driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        let doc = value
            .as_document()
            .ok_or_else(|| PersistError::decode("a method reference document", value))?;
        Ok(MethodRef::from_document(doc)?)
    }
}

#[cfg(test)]
mod tests {
    use vc_document::{DocumentValue, MethodRef, TypeDescriptor};

    use crate::de::DeserializeDriver;
    use crate::registry::TypeRegistry;
    use crate::ser::SerializeDriver;
    use crate::{PersistConfig, PersistError, Typed};

    #[test]
    fn integers_stay_in_range() {
        let registry = TypeRegistry::new();
        let config = PersistConfig::default();
        let ser = SerializeDriver::new(&registry, &config);
        let de = DeserializeDriver::new(&registry, &config);

        assert_eq!(7_u8.encode(&ser).unwrap(), DocumentValue::Int(7));
        assert!(matches!(u64::MAX.encode(&ser), Err(PersistError::Encode(_))));
        assert!(matches!(u8::decode(&DocumentValue::Int(300), &de), Err(PersistError::Decode { .. })));
        assert!(matches!(i32::decode(&DocumentValue::from("12"), &de), Err(PersistError::Decode { .. })));
    }

    #[test]
    fn floats_widen_integers() {
        let registry = TypeRegistry::new();
        let config = PersistConfig::default();
        let de = DeserializeDriver::new(&registry, &config);

        assert_eq!(f64::decode(&DocumentValue::Int(3), &de).unwrap(), 3.0);
        assert!(f32::decode(&DocumentValue::Bool(true), &de).is_err());
    }

    #[test]
    fn f32_rejects_out_of_range_values() {
        let registry = TypeRegistry::new();
        let config = PersistConfig::default();
        let de = DeserializeDriver::new(&registry, &config);

        assert_eq!(f32::decode(&DocumentValue::Float(1.5), &de).unwrap(), 1.5);
        assert_eq!(f32::decode(&DocumentValue::Float(f64::from(f32::MAX)), &de).unwrap(), f32::MAX);
        assert!(matches!(f32::decode(&DocumentValue::Float(1e300), &de), Err(PersistError::Decode { .. })));
        assert!(matches!(f32::decode(&DocumentValue::Float(-1e39), &de), Err(PersistError::Decode { .. })));
        assert!(f32::decode(&DocumentValue::Float(f64::INFINITY), &de).unwrap().is_infinite());
    }

    #[test]
    fn char_requires_one_character() {
        let registry = TypeRegistry::new();
        let config = PersistConfig::default();
        let de = DeserializeDriver::new(&registry, &config);

        assert_eq!(char::decode(&DocumentValue::from("x"), &de).unwrap(), 'x');
        assert!(char::decode(&DocumentValue::from("xy"), &de).is_err());
        assert!(char::decode(&DocumentValue::from(""), &de).is_err());
    }

    #[test]
    fn descriptor_uses_reference_form() {
        let registry = TypeRegistry::new();
        let config = PersistConfig::default();
        let ser = SerializeDriver::new(&registry, &config);
        let de = DeserializeDriver::new(&registry, &config);

        let list = TypeDescriptor::decode("Ns.List<Zoo.Animal>").unwrap();
        let doc = Typed::encode(&list, &ser).unwrap();
        assert_eq!(doc.get("_t"), Some(&DocumentValue::from("TypeDescriptor")));
        assert_eq!(doc.get("Name"), Some(&DocumentValue::from("Ns.List`1")));
        assert_eq!(<TypeDescriptor as Typed>::decode(&doc, &de).unwrap(), list);

        let method = MethodRef::new(TypeDescriptor::new("Geo.Shape"), "Scale", [TypeDescriptor::new("f64")]);
        let doc = method.encode(&ser).unwrap();
        assert_eq!(doc.get("_t"), Some(&DocumentValue::from("MethodRef")));
        assert_eq!(MethodRef::decode(&doc, &de).unwrap(), method);

        // A reference tagged as the other kind is refused.
        assert!(<TypeDescriptor as Typed>::decode(&doc, &de).is_err());
    }
}
