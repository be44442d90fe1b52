use proc_macro2::TokenStream;

use super::PersistMeta;

/// Generates the `inventory` submission of `#[persist(auto_register)]`.
#[cfg(feature = "auto_register")]
pub(crate) fn get_auto_register_impl(meta: &PersistMeta) -> syn::Result<TokenStream> {
    let Some(span) = meta.attrs.auto_register else {
        return Ok(crate::impls::empty());
    };
    if meta.ast.generics.type_params().next().is_some() {
        return Err(syn::Error::new(
            span,
            "`auto_register` needs a concrete type; register generic instantiations by hand",
        ));
    }

    let auto_register_ = crate::path::auto_register_(&meta.vc_persist_path);
    let ident = &meta.ast.ident;

    Ok(quote::quote_spanned! { span =>
        #auto_register_::inventory::submit! {
            #auto_register_::__AutoRegisterFunc(#auto_register_::__register::<#ident>)
        }
    })
}

/// Generates the `inventory` submission of `#[persist(auto_register)]`.
#[cfg(not(feature = "auto_register"))]
pub(crate) fn get_auto_register_impl(_: &PersistMeta) -> syn::Result<TokenStream> {
    Ok(crate::impls::empty())
}
