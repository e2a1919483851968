#![forbid(unsafe_code)]

extern crate proc_macro;

mod derive_from_row;

mod attr {
    pub mod attr_util;
    pub mod column;
}

use proc_macro::TokenStream;

/// Implement `sorm::FromRow` for a struct with named fields.
///
/// Each field is read with `Row::try_get` from the column of the same name,
/// or from the column given by `#[sorm(column = "...")]`.
#[proc_macro_derive(FromRow, attributes(sorm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let from_row = syn::parse_macro_input!(input as derive_from_row::FromRowStruct);

    TokenStream::from(derive_from_row::gen_from_row(from_row))
}
