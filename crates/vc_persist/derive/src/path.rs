//! Paths into `vc_persist` used by the generated code.

use proc_macro2::TokenStream;
use quote::quote;

// -----------------------------------------------------------------------------
// Crate Path

/// The path to the `vc_persist` crate as the caller sees it.
///
/// 1. Crates depending on `vc_persist` get `::vc_persist`.
/// 2. Crates depending on the `vc_store` facade get `::vc_store::persist`.
/// 3. Anything else gets `::vc_persist`, which may not resolve.
///
/// Reading the caller's manifest is not free, so the path is resolved once
/// per derive and passed around.
pub(crate) fn vc_persist() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("vc_persist"))
}

#[inline(always)]
pub(crate) fn macro_exports_(vc_persist_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_persist_path::__macro_exports
    }
}

#[cfg(feature = "auto_register")]
#[inline(always)]
pub(crate) fn auto_register_(vc_persist_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_persist_path::__macro_exports::auto_register
    }
}
