//! Reading the derive input: its named fields and the `#[index]` and `#[table_name]` attributes.

use super::MacroError;
use syn::{spanned::Spanned, Attribute, Data, DeriveInput, Fields, FieldsNamed, Lit, Meta};

/// Returns the named fields of a struct.
pub(crate) fn named_fields(input: &DeriveInput) -> Result<&FieldsNamed, MacroError> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields),
            _ => Err(MacroError::NoNamedFields(input.span())),
        },
        _ => Err(MacroError::NotAStruct(input.span())),
    }
}

/// Returns whether a bare marker attribute such as `#[index]` is present.
pub(crate) fn is_marked(attrs: &[Attribute], name: &str) -> bool {
    attrs
        .iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .any(|meta| matches!(meta, Meta::Path(path) if path.is_ident(name)))
}

/// Returns the string value of a `#[name = "value"]` attribute, if present.
pub(crate) fn string_value(attrs: &[Attribute], name: &str) -> Result<Option<String>, MacroError> {
    for attr in attrs {
        if let Ok(Meta::NameValue(pair)) = attr.parse_meta() {
            if !pair.path.is_ident(name) {
                continue;
            }

            return match pair.lit {
                Lit::Str(value) => Ok(Some(value.value())),
                _ => Err(MacroError::ExpectedStringLiteral(attr.span())),
            };
        }
    }

    Ok(None)
}
