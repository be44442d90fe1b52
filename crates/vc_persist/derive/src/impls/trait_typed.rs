use proc_macro2::TokenStream;
use quote::quote;
use syn::parse_quote;

use super::PersistMeta;

/// Wraps `body` into `impl Typed`, adding `type_descriptor` and, with
/// `implements(..)`, a `get_type_meta` that registers the interface casts.
pub(crate) fn impl_typed(meta: &PersistMeta, body: TokenStream) -> TokenStream {
    let vc_persist_path = &meta.vc_persist_path;
    let exports_ = crate::path::macro_exports_(vc_persist_path);
    let ident = &meta.ast.ident;

    let mut generics = meta.ast.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(#vc_persist_path::Typed));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let base = match &meta.attrs.type_path {
        Some(lit) => quote!(#lit),
        None => quote! {
            ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#ident))
        },
    };

    let type_params: Vec<_> = meta.ast.generics.type_params().map(|param| &param.ident).collect();
    let descriptor = if type_params.is_empty() {
        quote! {
            #exports_::TypeDescriptor::from_type_path(#base)
        }
    } else {
        quote! {
            #exports_::TypeDescriptor::generic(
                #exports_::TypeDescriptor::from_type_path(#base).full_name(),
                [#(<#type_params as #vc_persist_path::Typed>::type_descriptor()),*],
            )
        }
    };

    let type_meta = if meta.attrs.implements.is_empty() {
        crate::impls::empty()
    } else {
        let casts = meta.attrs.implements.iter().map(|interface| {
            quote! {
                meta.insert_trait(#exports_::Upcast::<dyn #interface>::new(|value| {
                    value
                        .downcast::<Self>()
                        .map(|value| value as #exports_::Box<dyn #interface>)
                }));
            }
        });
        quote! {
            fn get_type_meta() -> #exports_::TypeMeta {
                let mut meta = #exports_::TypeMeta::of::<Self>();
                #(#casts)*
                meta
            }
        }
    };

    quote! {
        impl #impl_generics #vc_persist_path::Typed for #ident #ty_generics #where_clause {
            fn type_descriptor() -> #exports_::TypeDescriptor {
                #descriptor
            }

            #body

            #type_meta
        }
    }
}
