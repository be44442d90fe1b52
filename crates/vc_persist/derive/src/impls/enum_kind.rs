use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{DataEnum, Fields};

use super::PersistMeta;
use crate::attributes::FieldAttributes;

/// A unit-only enum, encoded as its variant name.
///
/// Decoding an undeclared name fails with `PersistError::UnknownVariant`.
pub(crate) fn unit_enum_body(meta: &PersistMeta, data: &DataEnum) -> syn::Result<TokenStream> {
    let vc_persist_path = &meta.vc_persist_path;
    let exports_ = crate::path::macro_exports_(vc_persist_path);

    let mut names = Vec::with_capacity(data.variants.len());
    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.fields.span(),
                "only enums whose variants are all units are supported",
            ));
        }
        let attrs = FieldAttributes::parse_attrs(&variant.attrs)?;
        let name = meta.attrs.member_name(&variant.ident, &attrs);
        if names.contains(&name) {
            return Err(syn::Error::new_spanned(&variant.ident, format!("duplicate variant name `{name}`")));
        }
        names.push(name);
        variants.push(&variant.ident);
    }

    Ok(quote! {
        fn encode(
            &self,
            _driver: &#vc_persist_path::ser::SerializeDriver<'_>,
        ) -> #exports_::Result<#exports_::DocumentValue, #vc_persist_path::PersistError> {
            let name: &str = match *self {
                #(Self::#variants => #names,)*
            };
            #exports_::Result::Ok(#exports_::DocumentValue::String(#exports_::String::from(name)))
        }

        fn decode(
            value: &#exports_::DocumentValue,
            _driver: &#vc_persist_path::de::DeserializeDriver<'_>,
        ) -> #exports_::Result<Self, #vc_persist_path::PersistError> {
            match value.as_str() {
                #(#exports_::Option::Some(#names) => #exports_::Result::Ok(Self::#variants),)*
                #exports_::Option::Some(other) => #exports_::Result::Err(#vc_persist_path::PersistError::UnknownVariant {
                    type_name: <Self as #vc_persist_path::Typed>::type_descriptor().encode(),
                    value: #exports_::String::from(other),
                }),
                #exports_::Option::None => #exports_::Result::Err(
                    #vc_persist_path::PersistError::decode("a variant name", value),
                ),
            }
        }
    })
}
