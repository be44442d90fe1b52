//! Items the derive output and `impl_persist_interface!` refer to.
//!
//! Not part of the public API.

pub use alloc::boxed::Box;
pub use alloc::string::String;
pub use core::any::Any;
pub use core::option::Option;
pub use core::result::Result;

pub use vc_document::{DocumentValue, TypeDescriptor};

pub use crate::registry::{TypeMeta, TypeRegistry, Upcast};
pub use crate::schema::{ClassShape, Constructor, Property};

#[cfg(feature = "auto_register")]
pub mod auto_register {
    pub use inventory;

    use crate::Typed;
    use crate::registry::TypeRegistry;

    /// A registration function submitted by `#[persist(auto_register)]`.
    pub struct __AutoRegisterFunc(pub fn(&mut TypeRegistry));

    inventory::collect!(__AutoRegisterFunc);

    /// The function the derive submits for `T`.
    pub fn __register<T: Typed>(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }

    /// Runs every submitted registration function and returns how many ran.
    pub fn __register_types(registry: &mut TypeRegistry) -> usize {
        let mut count = 0;
        for func in inventory::iter::<__AutoRegisterFunc> {
            (func.0)(registry);
            count += 1;
        }
        log::debug!("auto-registered {count} types");
        count
    }
}
