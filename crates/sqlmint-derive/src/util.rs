use proc_macro2::TokenStream;
use quote::quote;

/// Quote an optional string literal as `Some("..")` / `None`.
pub fn quote_opt_str(value: Option<&String>) -> TokenStream {
    match value {
        Some(s) => quote!(Some(#s)),
        None => quote!(None),
    }
}

/// Quote an optional integer literal as `Some(n)` / `None`.
pub fn quote_opt<T: quote::ToTokens>(value: Option<&T>) -> TokenStream {
    match value {
        Some(v) => quote!(Some(#v)),
        None => quote!(None),
    }
}
