//! Provides the `StoreConfig` object, used to access config values from the catalog store's
//! options.

use super::{Config, ConfigSource};
use crate::{
    error::StoreError,
    store::{option::Field, Store},
};
use serde::Deserialize;

/// Contains the config values from the catalog store.
#[derive(Debug, Deserialize, Default)]
pub struct StoreConfig {
    /// Corresponds to the `Field::ChunkSize` option.
    pub chunk_size: Option<u64>,
}

impl StoreConfig {
    /// Returns a new `StoreConfig` built from a given catalog store.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidOption`] if the stored chunk size isn't an unsigned integer.
    pub async fn from_store(store: &Store) -> anyhow::Result<Self> {
        let chunk_size = match store
            .get_option(Field::ChunkSize)
            .await?
            .as_ref()
            .and_then(|v| v.value())
        {
            Some(value) => Some(value.trim().parse().map_err(|_| StoreError::InvalidOption {
                field: Field::ChunkSize.to_string(),
                value: String::from(value),
            })?),
            None => None,
        };

        Ok(Self { chunk_size })
    }
}

impl ConfigSource for StoreConfig {
    fn apply_to_config(self, config: Config) -> Config {
        Config {
            chunk_size: self.chunk_size.unwrap_or(config.chunk_size),
            ..config
        }
    }
}
