//! Provides the `OptsConfig` object, used to access config values from the running program's
//! command line arguments.

use super::{Config, ConfigSource};
use crate::{opts::Opts, util::LogLevel};

/// Contains the config values from the running program's command line arguments.
#[derive(Debug, Default)]
pub struct OptsConfig {
    /// Corresponds to the `--log-level` option.
    log_level: Option<LogLevel>,
    /// Corresponds to the `--chunk-size` option.
    chunk_size: Option<u64>,
}

impl ConfigSource for OptsConfig {
    fn apply_to_config(self, config: Config) -> Config {
        Config {
            log_level: self.log_level.unwrap_or(config.log_level),
            chunk_size: self.chunk_size.unwrap_or(config.chunk_size),
        }
    }
}

impl OptsConfig {
    /// Returns a new `OptsConfig` built from a given `Opts` object.
    pub fn new(opts: &Opts) -> Self {
        Self {
            log_level: opts.log_level,
            chunk_size: opts.chunk_size,
        }
    }
}
