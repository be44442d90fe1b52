use alloc::format;
use alloc::vec::Vec;

use vc_document::{DocumentValue, TypeDescriptor};

use super::sequence::{decode_items, encode_items};
use crate::de::DeserializeDriver;
use crate::registry::TypeRegistry;
use crate::ser::SerializeDriver;
use crate::{PersistError, Typed};

fn length_mismatch(expected: usize, found: usize) -> PersistError {
    PersistError::Decode {
        expected: format!("an array of {expected} elements"),
        found: format!("{found} elements"),
    }
}

// -----------------------------------------------------------------------------
// Tuples

macro_rules! impl_tuple {
    ($len:literal: $($t:ident $idx:tt),+) => {
        impl<$($t: Typed),+> Typed for ($($t,)+) {
            fn type_descriptor() -> TypeDescriptor {
                TypeDescriptor::generic("Tuple", [$($t::type_descriptor()),+])
            }

            fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
                Ok(DocumentValue::Array(alloc::vec![
                    $(self.$idx.encode(driver).map_err(|error| error.in_element($idx))?),+
                ]))
            }

            fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
                let items = value
                    .as_array()
                    .ok_or_else(|| PersistError::decode("an array", value))?;
                if items.len() != $len {
                    return Err(length_mismatch($len, items.len()));
                }
                Ok(($($t::decode(&items[$idx], driver).map_err(|error| error.in_element($idx))?,)+))
            }

            fn register_dependencies(registry: &mut TypeRegistry) {
                $(registry.register::<$t>();)+
            }
        }
    };
}

impl_tuple!(1: P0 0);
impl_tuple!(2: P0 0, P1 1);
impl_tuple!(3: P0 0, P1 1, P2 2);
impl_tuple!(4: P0 0, P1 1, P2 2, P3 3);
impl_tuple!(5: P0 0, P1 1, P2 2, P3 3, P4 4);
impl_tuple!(6: P0 0, P1 1, P2 2, P3 3, P4 4, P5 5);

// -----------------------------------------------------------------------------
// Arrays

impl<T: Typed, const N: usize> Typed for [T; N] {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::generic(format!("Array{N}"), [T::type_descriptor()])
    }

    fn encode(&self, driver: &SerializeDriver<'_>) -> Result<DocumentValue, PersistError> {
        encode_items(self.iter(), driver).map(DocumentValue::Array)
    }

    fn decode(value: &DocumentValue, driver: &DeserializeDriver<'_>) -> Result<Self, PersistError> {
        let items: Vec<T> = decode_items(value, driver)?.collect::<Result<_, _>>()?;
        let found = items.len();
        <[T; N]>::try_from(items).map_err(|_| length_mismatch(N, found))
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use vc_document::TypeDescriptor;

    use crate::registry::TypeRegistryArc;
    use crate::{PersistConfig, PersistError, Typed};

    #[test]
    fn tuple_descriptor_and_round_trip() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        assert_eq!(<(i32, String)>::type_descriptor().encode(), "Tuple<i32,String>");

        let value = (3_i32, String::from("three"));
        let doc = registry.serialize(&value, &config).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"[3,"three"]"#);
        assert_eq!(registry.deserialize::<(i32, String)>(&doc, &config).unwrap(), value);
    }

    #[test]
    fn fixed_arrays_check_length() {
        let registry = TypeRegistryArc::default();
        let config = PersistConfig::default();

        assert_eq!(<[u8; 3]>::type_descriptor(), TypeDescriptor::generic("Array3", [TypeDescriptor::new("u8")]));

        let doc = registry.serialize(&[1_u8, 2, 3], &config).unwrap();
        assert_eq!(registry.deserialize::<[u8; 3]>(&doc, &config).unwrap(), [1, 2, 3]);
        assert!(matches!(
            registry.deserialize::<[u8; 2]>(&doc, &config),
            Err(PersistError::Decode { .. })
        ));
    }
}
