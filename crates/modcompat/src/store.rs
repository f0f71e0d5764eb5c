//! The catalog store, an SQLite database holding the catalog read model, the resolution state
//! written back into it and the program's stored options.

/// Implements `ToSql` and `FromSql` for a type stored as the text its `Display` and `FromStr`
/// implementations produce and accept.
macro_rules! text_column {
    ($ty:ty) => {
        impl ::rusqlite::ToSql for $ty {
            fn to_sql(&self) -> ::rusqlite::Result<::rusqlite::types::ToSqlOutput<'_>> {
                Ok(::rusqlite::types::ToSqlOutput::from(self.to_string()))
            }
        }

        impl ::rusqlite::types::FromSql for $ty {
            fn column_result(
                value: ::rusqlite::types::ValueRef<'_>,
            ) -> ::rusqlite::types::FromSqlResult<Self> {
                <$ty as ::std::str::FromStr>::from_str(value.as_str()?)
                    .map_err(|e| ::rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

pub mod catalog;
pub mod models;
pub mod option;

use crate::{error::StoreError, util};
pub use catalog::Catalog;
use log::*;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use std::{
    convert::TryFrom,
    path::Path,
    sync::{Arc, Mutex},
};
use tokio::task;

include!(concat!(env!("OUT_DIR"), "/store_consts.rs"));

/// The special value interpreted as using an in-memory SQLite database.
pub(crate) const MEMORY_STORE: &str = "_memory";

/// Provides access to the catalog store. New instances are created with a [`Builder`](Builder).
pub struct Store {
    /// The connection to the SQLite database file.
    conn: Arc<Mutex<Connection>>,
}

/// Builds new [`Store`](Store) instances.
pub struct Builder<P>
where
    P: AsRef<Path>,
{
    /// The SQL schema to use for the SQLite database.
    schema: String,
    /// An optional pre-calculated checksum for the SQL schema.
    schema_checksum: Option<String>,
    /// Location for the store database. Either a filesystem path, or in-memory.
    store_location: StoreLocation<P>,
    /// Should the schema checksum not be stored as an option in the store.
    skip_storing_checksum: bool,
}

/// Specifies the location for the store database.
pub enum StoreLocation<P: AsRef<Path>> {
    /// Specifies an in-memory database.
    Memory,
    /// Specifies a filesystem path to save the database in.
    File(P),
}

impl<P> Builder<P>
where
    P: AsRef<Path>,
{
    /// Returns a new `Builder` with a given database location. The schema and its checksum are the
    /// defaults which are found in the constants `SCHEMA` and `SCHEMA_CHECKSUM`.
    pub fn from_location(store_location: StoreLocation<P>) -> Self {
        Self {
            schema: String::from(SCHEMA),
            schema_checksum: Some(String::from(SCHEMA_CHECKSUM)),
            store_location,
            skip_storing_checksum: false,
        }
    }

    /// Specifies a different schema. The pre-calculated schema checksum will be cleared and
    /// recalculated when finalising the builder.
    pub fn with_schema(self, schema: &str) -> Self {
        Self {
            schema: String::from(schema),
            schema_checksum: None,
            ..self
        }
    }

    /// Specify whether to skip storing the schema checksum in the store options.
    pub fn skip_storing_checksum(self, skip: bool) -> Self {
        Self {
            skip_storing_checksum: skip,
            ..self
        }
    }

    /// Finalise the builder and return a new `Store`.
    pub async fn build(self) -> anyhow::Result<Store> {
        let schema_checksum = if let Some(checksum) = self.schema_checksum {
            checksum
        } else {
            trace!("Missing schema checksum, calculating");
            util::checksum::blake2b_string(&self.schema)
        };
        trace!("Store database schema checksum: {}", schema_checksum);

        let conn = match self.store_location {
            StoreLocation::Memory => Connection::open_in_memory()?,
            StoreLocation::File(path) => {
                debug!("Opening store database in {}", path.as_ref().display());
                Connection::open(path)?
            }
        };
        let store = Store {
            conn: Arc::new(Mutex::new(conn)),
        };

        let checksums_match = checksum_matches_meta(&store, &schema_checksum).await?;
        debug!("Schema checksums match: {}", checksums_match);

        if !checksums_match {
            apply_store_schema(&store, &self.schema).await?;

            if !self.skip_storing_checksum {
                store_schema_checksum(&store, &schema_checksum).await?;
            }
        }

        Ok(store)
    }
}

/// Applies a given SQL schema to a given `Store`.
async fn apply_store_schema(store: &Store, schema: &str) -> anyhow::Result<()> {
    trace!("Applying database schema...");
    trace!("{}", schema);

    store.apply_schema(schema).await?;
    Ok(())
}

/// Stores a given schema checksum to the store's `SchemaChecksum` option.
async fn store_schema_checksum(store: &Store, checksum: &str) -> anyhow::Result<()> {
    trace!("Storing schema checksum...");

    store
        .set_option(option::Value::new(
            option::Field::SchemaChecksum,
            Some(String::from(checksum)),
        ))
        .await?;
    Ok(())
}

impl<P> From<P> for StoreLocation<P>
where
    P: AsRef<Path>,
{
    fn from(p: P) -> Self {
        if p.as_ref() == Path::new(MEMORY_STORE) {
            StoreLocation::Memory
        } else {
            StoreLocation::File(p)
        }
    }
}

/// Compares a given store schema checksum string to what a given store's options possibly
/// contain. Returns `Ok(false)` if the store doesn't have an options table yet or the table doesn't
/// contain the [schema checksum field][Field]. Returns an error if reading the database fails.
///
/// [Field]: option::Field#variant.SchemaChecksum
async fn checksum_matches_meta(store: &Store, wanted_checksum: &str) -> anyhow::Result<bool> {
    if !store.has_options_table().await? {
        trace!("Store has no options table");
        return Ok(false);
    }

    if let Some(option) = store.get_option(option::Field::SchemaChecksum).await? {
        if let Some(existing_checksum) = option.value() {
            trace!("Got existing schema checksum: {}", existing_checksum);
            return Ok(wanted_checksum == existing_checksum);
        }
    }

    Ok(false)
}

/// Accepts a reference to an `Arc<Mutex<Connection>>` and a block where that reference can be used
/// to access the database connection. The block will run on a blocking thread with
/// `task::spawn_blocking`. Returns what the given block returns. With `mut`, the connection is
/// bound mutably, as required for starting transactions.
///
/// ```ignore
/// let conn = &self.conn;
/// sql!(conn => {
///     // use conn
/// })
/// ```
#[macro_export]
macro_rules! sql {
    (mut $conn:ident => $b:block) => {
        Ok({
            let _c = Arc::clone(&$conn);
            task::spawn_blocking(move || -> anyhow::Result<_> {
                #[allow(unused_mut)]
                let mut $conn = _c.lock().map_err(|_| StoreError::ConnectionPoisoned)?;
                $b
            })
            .await??
        })
    };
    ($conn:ident => $b:block) => {
        Ok({
            let _c = Arc::clone(&$conn);
            task::spawn_blocking(move || -> anyhow::Result<_> {
                let $conn = _c.lock().map_err(|_| StoreError::ConnectionPoisoned)?;
                $b
            })
            .await??
        })
    };
}

impl Store {
    /// Applies a given schema to the database.
    async fn apply_schema(&self, schema: &str) -> anyhow::Result<()> {
        let conn = &self.conn;
        let schema = String::from(schema);
        sql!(conn => {
            conn.execute_batch(&format!("BEGIN TRANSACTION; {} COMMIT;", schema))?;
            Ok(())
        })
    }

    /// Returns whether the database has an `options` table.
    async fn has_options_table(&self) -> anyhow::Result<bool> {
        let conn = &self.conn;
        sql!(conn => {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'options'",
                [],
                |row| row.get(0),
            )?;

            Ok(count > 0)
        })
    }

    /// Runs a given closure with read access to the catalog on a blocking thread. Returns what the
    /// closure returns.
    pub async fn read<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Catalog) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = &self.conn;
        sql!(conn => {
            f(&Catalog::new(&conn))
        })
    }

    /// Runs a given closure inside a single immediate transaction on a blocking thread. The
    /// transaction is committed if the closure returns `Ok`, and rolled back otherwise. Returns what
    /// the closure returns.
    pub async fn write<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Catalog) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = &self.conn;
        sql!(mut conn => {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let result = f(&Catalog::new(&tx))?;
            tx.commit()?;

            Ok(result)
        })
    }

    /// Retrieves an option value from the option table with a given option field.
    pub async fn get_option(&self, field: option::Field) -> anyhow::Result<Option<option::Value>> {
        let conn = &self.conn;
        sql!(conn => {
            let mut stmt = conn.prepare(option::Value::select())?;

            Ok(stmt
                .query_row(option::Value::select_params(&field).as_slice(), |row| {
                    option::Value::try_from(row)
                })
                .optional()?)
        })
    }

    /// Stores an option value to the options table.
    pub async fn set_option(&self, value: option::Value) -> anyhow::Result<()> {
        let conn = &self.conn;
        sql!(conn => {
            conn.execute(option::Value::replace_into(), value.all_params().as_slice())?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store, testing::*};

    const OPTIONS_SCHEMA: &str = r#"CREATE TABLE "options" (
"field"	TEXT NOT NULL,
"value"	TEXT,
PRIMARY KEY("field")
);"#;

    async fn get_test_store(schema: &str) -> Store {
        store::Builder::<String>::from_location(StoreLocation::Memory)
            .with_schema(schema)
            .skip_storing_checksum(true)
            .build()
            .await
            .expect("failed to build test store")
    }

    #[tokio::test]
    async fn set_and_get_option() {
        let store = get_test_store(OPTIONS_SCHEMA).await;

        store
            .set_option(option::Value::new(
                option::Field::ChunkSize,
                Some(String::from("100")),
            ))
            .await
            .expect("failed to set option value");

        let got_value = store
            .get_option(option::Field::ChunkSize)
            .await
            .expect("failed to get option value")
            .expect("store returned no value");

        assert_eq!(got_value.value(), Some("100"));
    }

    #[tokio::test]
    async fn default_schema_stores_checksum() {
        let store = memory_store().await.expect("failed to build store");

        let checksum = store
            .get_option(option::Field::SchemaChecksum)
            .await
            .expect("failed to get option value")
            .expect("store returned no checksum");

        assert_eq!(checksum.value(), Some(SCHEMA_CHECKSUM));
    }

    #[tokio::test]
    async fn reopening_file_store_keeps_data() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.sqlite");

        let store = Builder::from_location(StoreLocation::from(&path)).build().await?;
        store
            .write(|catalog| catalog.set_package(&mod_package(1, "rails")))
            .await?;
        drop(store);

        let store = Builder::from_location(StoreLocation::from(&path)).build().await?;
        let package = store.read(|catalog| catalog.package(1)).await?;
        assert_eq!(package.map(|p| p.slug), Some(String::from("rails")));

        Ok(())
    }

    #[tokio::test]
    async fn failed_write_rolls_back() -> anyhow::Result<()> {
        let store = memory_store().await?;

        let result = store
            .write(|catalog| -> anyhow::Result<()> {
                catalog.set_package(&mod_package(1, "rails"))?;
                Err(anyhow::anyhow!("interrupted"))
            })
            .await;
        assert!(result.is_err());

        let package = store.read(|catalog| catalog.package(1)).await?;
        assert_eq!(package, None);

        Ok(())
    }

    #[test]
    fn memory_location() {
        assert!(matches!(
            StoreLocation::from(MEMORY_STORE),
            StoreLocation::Memory
        ));
        assert!(matches!(
            StoreLocation::from("store.sqlite"),
            StoreLocation::File(_)
        ));
    }
}
