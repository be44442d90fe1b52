use crate::Typed;
use crate::registry::TypeRegistry;

/// A tuple of types registered together, as in
/// `registry.register_types::<(Circle, Square)>()`.
pub trait TypeList {
    fn register_all(registry: &mut TypeRegistry);
}

impl TypeList for () {
    #[inline]
    fn register_all(_registry: &mut TypeRegistry) {}
}

macro_rules! impl_type_list {
    ($($t:ident),+) => {
        impl<$($t: Typed),+> TypeList for ($($t,)+) {
            fn register_all(registry: &mut TypeRegistry) {
                $(registry.register::<$t>();)+
            }
        }
    };
}

impl_type_list!(A);
impl_type_list!(A, B);
impl_type_list!(A, B, C);
impl_type_list!(A, B, C, D);
impl_type_list!(A, B, C, D, E);
impl_type_list!(A, B, C, D, E, F);
impl_type_list!(A, B, C, D, E, F, G);
impl_type_list!(A, B, C, D, E, F, G, H);
impl_type_list!(A, B, C, D, E, F, G, H, I);
impl_type_list!(A, B, C, D, E, F, G, H, I, J);
impl_type_list!(A, B, C, D, E, F, G, H, I, J, K);
impl_type_list!(A, B, C, D, E, F, G, H, I, J, K, L);
