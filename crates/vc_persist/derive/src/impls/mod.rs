//! Code generation for `#[derive(Persist)]`.

// -----------------------------------------------------------------------------
// Modules

mod auto_register;
mod enum_kind;
mod struct_kind;
mod trait_typed;

// -----------------------------------------------------------------------------
// Internal API

use proc_macro2::TokenStream;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields};

use crate::attributes::TypeAttributes;

/// Everything the generators share about one derive input.
pub(crate) struct PersistMeta<'a> {
    pub ast: &'a DeriveInput,
    pub attrs: TypeAttributes,
    pub vc_persist_path: syn::Path,
}

pub(crate) fn impl_persist(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let meta = PersistMeta {
        ast,
        attrs: TypeAttributes::parse_attrs(&ast.attrs)?,
        vc_persist_path: crate::path::vc_persist(),
    };

    if let Some(lifetime) = ast.generics.lifetimes().next() {
        return Err(syn::Error::new(
            lifetime.span(),
            "persisted types must be `'static` and cannot have lifetime parameters",
        ));
    }

    let body = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => struct_kind::named_struct_body(&meta, fields)?,
            Fields::Unit => struct_kind::unit_struct_body(&meta),
            Fields::Unnamed(fields) => {
                return Err(syn::Error::new(
                    fields.span(),
                    "tuple structs are not supported; use named fields",
                ));
            }
        },
        Data::Enum(data) => {
            if let Some(span) = meta.attrs.default {
                return Err(syn::Error::new(span, "`default` only applies to structs"));
            }
            enum_kind::unit_enum_body(&meta, data)?
        }
        Data::Union(data) => {
            return Err(syn::Error::new(data.union_token.span, "unions are not supported"));
        }
    };

    let typed_impl = trait_typed::impl_typed(&meta, body);
    let auto_register = auto_register::get_auto_register_impl(&meta)?;

    Ok(quote::quote! {
        #typed_impl

        #auto_register
    })
}

#[inline(always)]
pub(crate) fn empty() -> TokenStream {
    TokenStream::new()
}
