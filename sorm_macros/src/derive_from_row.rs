use quote::quote;
use syn::parse::ParseStream;
use syn::spanned::Spanned;

use crate::attr::attr_util;
use crate::attr::column::ColumnAttr;

pub struct FromRowStruct {
    ident: syn::Ident,
    generics: syn::Generics,
    fields: Vec<FromRowField>,
}

struct FromRowField {
    ident: syn::Ident,
    ty: syn::Type,
    column: syn::LitStr,
}

impl syn::parse::Parse for FromRowStruct {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let item: syn::ItemStruct = input.parse()?;

        let named = match &item.fields {
            syn::Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new(
                    item.fields.span(),
                    "Expected a struct with named fields",
                ))
            }
        };

        let fields = named
            .named
            .iter()
            .map(FromRowField::from_field)
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(Self {
            ident: item.ident,
            generics: item.generics,
            fields,
        })
    }
}

impl FromRowField {
    fn from_field(field: &syn::Field) -> syn::Result<Self> {
        let ident = match &field.ident {
            Some(ident) => ident.clone(),
            None => return Err(syn::Error::new(field.span(), "Expected a named field")),
        };

        let mut column = None;
        for attr in &field.attrs {
            if !attr_util::attr_has_simple_ident(attr, "sorm") {
                continue;
            }
            if column.is_some() {
                return Err(syn::Error::new(attr.span(), "Duplicate sorm attribute"));
            }
            let parsed: ColumnAttr = syn::parse2(attr.tokens.clone())?;
            column = Some(parsed.column);
        }

        let column = column.unwrap_or_else(|| {
            let name = ident.to_string();
            syn::LitStr::new(name.trim_start_matches("r#"), ident.span())
        });

        Ok(Self {
            ident,
            ty: field.ty.clone(),
            column,
        })
    }
}

pub fn gen_from_row(from_row: FromRowStruct) -> proc_macro2::TokenStream {
    let ident = &from_row.ident;
    let (impl_generics, ty_generics, where_clause) = from_row.generics.split_for_impl();

    let field_inits = from_row.fields.iter().map(|field| {
        let field_ident = &field.ident;
        let ty = &field.ty;
        let column = &field.column;

        quote! {
            #field_ident: row.try_get::<#ty>(#column)?
        }
    });

    quote! {
        impl #impl_generics ::sorm::FromRow for #ident #ty_generics #where_clause {
            fn from_row(row: &::sorm::Row) -> ::sorm::SormResult<Self> {
                Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    }
}
