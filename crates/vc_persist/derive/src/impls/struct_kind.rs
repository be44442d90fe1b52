use proc_macro2::TokenStream;
use quote::quote;
use syn::FieldsNamed;

use super::PersistMeta;
use crate::attributes::FieldAttributes;

/// `encode` and `decode` through the class schema.
fn class_methods(meta: &PersistMeta) -> TokenStream {
    let vc_persist_path = &meta.vc_persist_path;
    let exports_ = crate::path::macro_exports_(vc_persist_path);

    quote! {
        #[inline]
        fn encode(
            &self,
            driver: &#vc_persist_path::ser::SerializeDriver<'_>,
        ) -> #exports_::Result<#exports_::DocumentValue, #vc_persist_path::PersistError> {
            driver.encode_object(self)
        }

        #[inline]
        fn decode(
            value: &#exports_::DocumentValue,
            driver: &#vc_persist_path::de::DeserializeDriver<'_>,
        ) -> #exports_::Result<Self, #vc_persist_path::PersistError> {
            driver.decode_object(value)
        }
    }
}

/// A class with one property per field.
///
/// With `default`, every property is settable and creation goes through
/// `Default`. Otherwise every property is read-only and a single
/// constructor takes all fields, by their serialized names.
pub(crate) fn named_struct_body(meta: &PersistMeta, fields: &FieldsNamed) -> syn::Result<TokenStream> {
    let exports_ = crate::path::macro_exports_(&meta.vc_persist_path);
    let mutable = meta.attrs.default.is_some();

    let mut names = Vec::with_capacity(fields.named.len());
    let mut properties = Vec::with_capacity(fields.named.len());
    let mut field_idents = Vec::with_capacity(fields.named.len());

    for field in &fields.named {
        let Some(ident) = &field.ident else {
            continue;
        };
        let attrs = FieldAttributes::parse_attrs(&field.attrs)?;
        let name = meta.attrs.member_name(ident, &attrs);
        if names.contains(&name) {
            return Err(syn::Error::new_spanned(ident, format!("duplicate member name `{name}`")));
        }

        let ty = &field.ty;
        properties.push(if mutable {
            quote! {
                .property(#exports_::Property::settable::<Self, #ty>(
                    #name,
                    |owner| &owner.#ident,
                    |owner, value| owner.#ident = value,
                ))
            }
        } else {
            quote! {
                .property(#exports_::Property::readonly::<Self, #ty>(#name, |owner| &owner.#ident))
            }
        });
        names.push(name);
        field_idents.push(ident);
    }

    let creation = if mutable {
        quote! {
            .with_default::<Self>()
        }
    } else if field_idents.is_empty() {
        quote! {
            .constructor(#exports_::Constructor::new::<Self>(&[], |_| #exports_::Result::Ok(Self {})))
        }
    } else {
        let indices = 0..field_idents.len();
        quote! {
            .constructor(#exports_::Constructor::new::<Self>(
                &[#(#names),*],
                |args| #exports_::Result::Ok(Self {
                    #(#field_idents: args.take(#indices)?,)*
                }),
            ))
        }
    };

    let methods = class_methods(meta);
    Ok(quote! {
        #methods

        fn class_shape() -> #exports_::Option<#exports_::ClassShape> {
            #exports_::Option::Some(
                #exports_::ClassShape::new()
                    #(#properties)*
                    #creation
            )
        }
    })
}

/// A class without members, created by a parameterless constructor.
pub(crate) fn unit_struct_body(meta: &PersistMeta) -> TokenStream {
    let exports_ = crate::path::macro_exports_(&meta.vc_persist_path);
    let methods = class_methods(meta);

    quote! {
        #methods

        fn class_shape() -> #exports_::Option<#exports_::ClassShape> {
            #exports_::Option::Some(
                #exports_::ClassShape::new()
                    .constructor(#exports_::Constructor::new::<Self>(&[], |_| #exports_::Result::Ok(Self)))
            )
        }
    }
}
