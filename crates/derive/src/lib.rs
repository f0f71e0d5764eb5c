//! Derive macros for Modcompat's store models.
//!
//! `#[derive(Model)]` on a struct with named fields generates the SQL statements and named
//! parameter lists used to read and write rows of the struct's table, along with a
//! `TryFrom<&rusqlite::Row>` implementation. The table name defaults to the struct's name in
//! snake case and can be overridden with `#[table_name = "..."]`. Fields marked `#[index]` form
//! the `WHERE` clause of the `select` and `delete` statements.

extern crate proc_macro;

mod attrs;

use heck::SnakeCase;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, DeriveInput, FieldsNamed, Ident, Type};
use thiserror::Error;

const INDEX_ATTRIBUTE: &str = "index";
const TABLE_NAME_ATTRIBUTE: &str = "table_name";

#[derive(Error, Debug)]
enum MacroError {
    #[error("the Model derive can only be used on structs")]
    NotAStruct(Span),
    #[error("the Model derive can only be used on structs with named fields")]
    NoNamedFields(Span),
    #[error("field has no identifier")]
    NoIdentOnField(Span),
    #[error("expected a string literal")]
    ExpectedStringLiteral(Span),
}

#[derive(Debug)]
struct MacroField {
    is_index: bool,
    ident: Ident,
    ty: Type,
}

#[proc_macro_derive(Model, attributes(index, table_name))]
pub fn model(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let output = match run_macro(&input) {
        Ok(token_stream) => token_stream,
        Err(err) => match err {
            MacroError::NoNamedFields(span)
            | MacroError::NotAStruct(span)
            | MacroError::NoIdentOnField(span)
            | MacroError::ExpectedStringLiteral(span) => syn::Error::new(span, err.to_string()).to_compile_error(),
        },
    };

    proc_macro::TokenStream::from(output)
}

fn run_macro(input: &DeriveInput) -> Result<TokenStream, MacroError> {
    let fields = attrs::named_fields(input)?;
    let ident = &input.ident;
    let table_name = match attrs::string_value(&input.attrs, TABLE_NAME_ATTRIBUTE)? {
        Some(name) => name,
        None => ident.to_string().to_snake_case(),
    };

    let macro_fields = parse_fields(fields)?;

    let select = select_clause(&table_name, &macro_fields);
    let insert_into = insert_clause("INSERT", &table_name, &macro_fields);
    let replace_into = insert_clause("REPLACE", &table_name, &macro_fields);
    let delete = delete_clause(&table_name, &macro_fields);

    let select_params = select_params_fn(&macro_fields);
    let all_params = all_params_fn(&macro_fields);
    let from_row = from_row_impl(ident, &macro_fields);

    Ok(quote!(
        impl #ident {
            #select_params

            #all_params

            pub fn select() -> &'static str {
                #select
            }

            pub fn insert_into() -> &'static str {
                #insert_into
            }

            pub fn replace_into() -> &'static str {
                #replace_into
            }

            pub fn delete() -> &'static str {
                #delete
            }
        }

        #from_row
    ))
}

fn parse_fields(fields: &FieldsNamed) -> Result<Vec<MacroField>, MacroError> {
    let mut macro_fields = Vec::new();

    for field in &fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| MacroError::NoIdentOnField(field.span()))?;
        let ty = field.ty.clone();

        macro_fields.push(MacroField {
            is_index: attrs::is_marked(&field.attrs, INDEX_ATTRIBUTE),
            ident,
            ty,
        });
    }

    Ok(macro_fields)
}

/// `:column`
fn sql_parameter(column: &str) -> String {
    format!(":{}", column)
}

/// ` WHERE a = :a AND b = :b` over the given columns, or nothing if there are none.
fn where_clause(columns: &[String]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let conditions: Vec<String> = columns
        .iter()
        .map(|column| format!("{} = {}", column, sql_parameter(column)))
        .collect();
    format!(" WHERE {}", conditions.join(" AND "))
}

fn index_columns(fields: &[MacroField]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| field.is_index)
        .map(|field| field.ident.to_string())
        .collect()
}

fn select_clause(table_name: &str, fields: &[MacroField]) -> String {
    // SELECT * FROM dependency WHERE id = :id
    format!("SELECT * FROM {}{}", table_name, where_clause(&index_columns(fields)))
}

fn insert_clause(verb: &str, table_name: &str, fields: &[MacroField]) -> String {
    // REPLACE INTO pin_platform_link (mod_version, platform_version) VALUES (:mod_version, :platform_version)
    let mut field_names = Vec::new();
    let mut values = Vec::new();

    for field in fields {
        let ident = field.ident.to_string();
        values.push(sql_parameter(&ident));
        field_names.push(ident);
    }

    format!(
        "{} INTO {} ({}) VALUES ({})",
        verb,
        table_name,
        field_names.join(", "),
        values.join(", "),
    )
}

fn delete_clause(table_name: &str, fields: &[MacroField]) -> String {
    // DELETE FROM resolved_dependency WHERE dependency = :dependency
    format!("DELETE FROM {}{}", table_name, where_clause(&index_columns(fields)))
}

fn select_params_fn(fields: &[MacroField]) -> TokenStream {
    let mut fn_params = Vec::new();
    let mut sql_params = Vec::new();

    for field in fields {
        if !field.is_index {
            continue;
        }

        let ident = &field.ident;
        let ty = &field.ty;
        let sql_param = sql_parameter(&ident.to_string());

        fn_params.push(quote!(#ident: &'a #ty));
        sql_params.push(quote!((#sql_param, #ident as &dyn ::rusqlite::ToSql)));
    }

    // vec![(":id", id as &dyn ::rusqlite::ToSql)]
    quote!(
        pub fn select_params<'a>(#(#fn_params),*) -> Vec<(&'static str, &'a dyn ::rusqlite::ToSql)> {
            vec![#(#sql_params),*]
        }
    )
}

fn all_params_fn(fields: &[MacroField]) -> TokenStream {
    let sql_params = fields.iter().map(|field| {
        let ident = &field.ident;
        let sql_param = sql_parameter(&ident.to_string());
        quote!((#sql_param, &self.#ident as &dyn ::rusqlite::ToSql))
    });

    quote!(
        pub fn all_params(&self) -> Vec<(&'static str, &dyn ::rusqlite::ToSql)> {
            vec![#(#sql_params),*]
        }
    )
}

fn from_row_impl(ident: &Ident, fields: &[MacroField]) -> TokenStream {
    let idents: Vec<&Ident> = fields.iter().map(|field| &field.ident).collect();
    let columns: Vec<String> = fields.iter().map(|field| field.ident.to_string()).collect();

    quote!(
        impl ::std::convert::TryFrom<&::rusqlite::Row<'_>> for #ident {
            type Error = ::rusqlite::Error;

            fn try_from(row: &::rusqlite::Row<'_>) -> ::std::result::Result<Self, Self::Error> {
                Ok(Self {
                    #(#idents: row.get(#columns)?),*
                })
            }
        }
    )
}
