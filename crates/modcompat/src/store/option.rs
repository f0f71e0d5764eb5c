//! Key-value options kept in the store's `options` table.

use derive::Model;
use strum_macros::{Display, EnumString};

/// The option fields the store knows of.
#[derive(Debug, PartialEq, Copy, Clone, EnumString, Display)]
pub enum Field {
    /// The checksum of the schema the store was last set up with.
    SchemaChecksum,
    /// The sweep chunk size, overriding the config file.
    ChunkSize,
}

/// A single stored option.
#[derive(Debug, Model)]
#[table_name = "options"]
pub struct Value {
    #[index]
    field: Field,
    value: Option<String>,
}

impl Value {
    /// Returns a new option value for a given field.
    pub fn new(field: Field, value: Option<String>) -> Self {
        Self { field, value }
    }

    /// Returns the stored value, if any.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

text_column!(Field);
