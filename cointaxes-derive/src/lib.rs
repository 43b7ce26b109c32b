use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, LitStr, Meta, Token, Type};

/// Derive macro describing the CSV columns an exchange export record expects.
///
/// For each field, extracts:
/// - Column name (respects #[serde(rename = "...")])
/// - Accepted alternative column names (#[serde(alias = "...")])
/// - Required (false for Option<T> or #[serde(default)] fields)
/// - Description (from doc comments)
///
/// Generates an `impl crate::csv_schema::CsvSchema` for the struct.
#[proc_macro_derive(CsvSchema, attributes(serde))]
pub fn derive_csv_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct ColumnAttrs {
    rename: Option<String>,
    aliases: Vec<String>,
    has_default: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "CsvSchema only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "CsvSchema only supports structs")),
    };

    let mut entries = Vec::new();
    for field in fields {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let attrs = serde_column_attrs(&field.attrs)?;
        let column = attrs.rename.unwrap_or_else(|| ident.to_string());
        let aliases = attrs.aliases;
        let required = !attrs.has_default && !is_option_type(&field.ty);
        let description = get_doc_comment(&field.attrs);

        entries.push(quote! {
            crate::csv_schema::CsvField {
                name: #column,
                aliases: &[#(#aliases),*],
                required: #required,
                description: #description,
            }
        });
    }

    Ok(quote! {
        impl crate::csv_schema::CsvSchema for #name {
            fn csv_schema() -> &'static [crate::csv_schema::CsvField] {
                static SCHEMA: &[crate::csv_schema::CsvField] = &[
                    #(#entries),*
                ];
                SCHEMA
            }
        }
    })
}

fn serde_column_attrs(attrs: &[syn::Attribute]) -> syn::Result<ColumnAttrs> {
    let mut column = ColumnAttrs {
        rename: None,
        aliases: Vec::new(),
        has_default: false,
    };

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                column.rename = Some(lit.value());
            } else if meta.path.is_ident("alias") {
                let lit: LitStr = meta.value()?.parse()?;
                column.aliases.push(lit.value());
            } else if meta.path.is_ident("default") {
                column.has_default = true;
                if meta.input.peek(Token![=]) {
                    let _: LitStr = meta.value()?.parse()?;
                }
            } else if meta.input.peek(Token![=]) {
                // deserialize_with and friends don't affect the column layout
                let _: syn::Expr = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }

    Ok(column)
}

fn get_doc_comment(attrs: &[syn::Attribute]) -> String {
    attrs
        .iter()
        .filter_map(|attr| {
            if !attr.path().is_ident("doc") {
                return None;
            }
            if let Meta::NameValue(meta) = &attr.meta {
                if let syn::Expr::Lit(expr_lit) = &meta.value {
                    if let Lit::Str(lit_str) = &expr_lit.lit {
                        return Some(lit_str.value().trim().to_string());
                    }
                }
            }
            None
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}
