//! The configuration framework for Modcompat.
//!
//! A [`Config`](Config) is built with a [`Builder`](Builder) by layering config sources on top of
//! the defaults: the config file, the store options, the environment and finally the command
//! line. Each later source overrides the values an earlier one set.

mod env_config;
mod file_config;
mod opts_config;
mod store_config;

use crate::{error::ConfigError, opts::Opts, store::Store, util::LogLevel};
use env_config::EnvConfig;
use file_config::FileConfig;
use log::*;
use opts_config::OptsConfig;
use std::io::Read;
use store_config::StoreConfig;

pub const DEFAULT_CONFIG_FILE_LOCATION: &str = "modcompat.toml";
pub const DEFAULT_STORE_FILE_LOCATION: &str = "modcompat.sqlite";
/// The default number of package versions resolved per sweep chunk.
pub const DEFAULT_CHUNK_SIZE: u64 = 500;

/// The program's configuration.
#[derive(Debug)]
pub struct Config {
    /// The log level to use.
    log_level: LogLevel,
    /// The number of package versions resolved per sweep chunk.
    chunk_size: u64,
}

/// A source of config values that can be applied on top of an existing `Config`.
pub trait ConfigSource {
    /// Applies the contained config values to a given `Config`, returning a new `Config` with the
    /// values set.
    fn apply_to_config(self, config: Config) -> Config;
}

/// Builds a [`Config`](Config) out of several config sources.
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Returns a new `Builder` starting from the config defaults.
    pub fn new() -> Builder {
        Builder {
            config: Config::default(),
        }
    }

    fn get_env_config() -> anyhow::Result<EnvConfig> {
        if cfg!(debug_assertions) {
            if let Err(e) = dotenv::dotenv() {
                trace!("Not loading .env file: {}", e);
            }
        }

        EnvConfig::from_env()
    }

    fn apply<S>(self, source: S) -> Self
    where
        S: ConfigSource,
    {
        Builder {
            config: source.apply_to_config(self.config),
        }
    }

    /// Applies the values in a given TOML config file reader.
    pub fn apply_config_file<R>(self, file: &mut R) -> anyhow::Result<Self>
    where
        R: Read,
    {
        let file_config = FileConfig::from_file(file)?;
        Ok(self.apply(file_config))
    }

    /// Applies the values in the environment variables prefixed with
    /// [`APP_PREFIX`](crate::APP_PREFIX).
    pub fn apply_env(self) -> anyhow::Result<Self> {
        let env_config = Builder::get_env_config()?;
        Ok(self.apply(env_config))
    }

    /// Applies the values in a given store's options.
    pub async fn apply_store(self, store: &Store) -> anyhow::Result<Self> {
        let store_config = StoreConfig::from_store(store).await?;
        Ok(self.apply(store_config))
    }

    /// Applies the values given on the command line.
    pub fn apply_opts(self, opts: &Opts) -> Self {
        self.apply(OptsConfig::new(opts))
    }

    /// Finalises the builder and returns the built `Config`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidChunkSize`] if the chunk size is zero.
    pub fn build(self) -> anyhow::Result<Config> {
        if self.config.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.config.chunk_size).into());
        }

        Ok(self.config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}
