//! Provides the `EnvConfig` object, used to access config values from the environment variables.

use super::{Config, ConfigSource};
use crate::{util, util::LogLevel, APP_PREFIX};
use anyhow::Context;
use serde::Deserialize;

/// Contains the config values from the environment variables prefixed with
/// [`APP_PREFIX`](crate::APP_PREFIX).
#[derive(Debug, Deserialize, Default)]
pub struct EnvConfig {
    /// Corresponds to `MODCOMPAT_LOG_LEVEL`.
    log_level: Option<LogLevel>,
    /// Corresponds to `MODCOMPAT_CHUNK_SIZE`.
    chunk_size: Option<u64>,
}

impl EnvConfig {
    /// Returns a new `EnvConfig` built from the current process' environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        envy::prefixed(APP_PREFIX)
            .from_env::<Self>()
            .with_context(|| {
                format!(
                    "Failed to load config from environment variables:\n{}",
                    util::env::dump_string(APP_PREFIX)
                )
            })
    }
}

impl ConfigSource for EnvConfig {
    fn apply_to_config(self, config: Config) -> Config {
        Config {
            log_level: self.log_level.unwrap_or(config.log_level),
            chunk_size: self.chunk_size.unwrap_or(config.chunk_size),
        }
    }
}
