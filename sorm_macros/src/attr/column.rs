use syn::parse::ParseStream;

/// The parenthesized part of `#[sorm(column = "name")]`.
pub struct ColumnAttr {
    pub column: syn::LitStr,
}

impl syn::parse::Parse for ColumnAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let content;
        let _paren_token = syn::parenthesized!(content in input);

        let key: syn::Ident = content.parse()?;
        if key != "column" {
            return Err(syn::Error::new(key.span(), "Expected `column`"));
        }

        let _eq: syn::token::Eq = content.parse()?;
        let column: syn::LitStr = content.parse()?;

        if !content.is_empty() {
            return Err(content.error("Unexpected tokens after column name"));
        }

        Ok(Self { column })
    }
}
