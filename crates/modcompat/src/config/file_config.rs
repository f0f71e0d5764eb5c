//! Provides the `FileConfig` object, used to access config values from a config file.

use super::{Config, ConfigSource};
use crate::util::LogLevel;
use serde::Deserialize;
use std::io::Read;

/// Contains the config values from a config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    /// General config options
    general: GeneralOptions,
    /// Resolver config options
    resolver: ResolverOptions,
}

/// Contains the config values from the `[general]` section of a config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GeneralOptions {
    /// The log level to use.
    log_level: Option<LogLevel>,
}

/// Contains the config values from the `[resolver]` section of a config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ResolverOptions {
    /// The number of package versions resolved per sweep chunk.
    chunk_size: Option<u64>,
}

impl FileConfig {
    /// Returns a new `FileConfig` built from a given config file reader.
    pub fn from_file<R>(file: &mut R) -> anyhow::Result<Self>
    where
        R: Read,
    {
        let mut file_contents = String::new();
        file.read_to_string(&mut file_contents)?;
        Ok(toml::from_str(&file_contents)?)
    }
}

impl ConfigSource for FileConfig {
    fn apply_to_config(self, config: Config) -> Config {
        Config {
            log_level: self.general.log_level.unwrap_or(config.log_level),
            chunk_size: self.resolver.chunk_size.unwrap_or(config.chunk_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file() -> anyhow::Result<()> {
        let file_config = FileConfig::from_file(&mut "".as_bytes())?;

        assert_eq!(file_config.general.log_level, None);
        assert_eq!(file_config.resolver.chunk_size, None);

        Ok(())
    }

    #[test]
    fn invalid_log_level() {
        let mut file = "[general]\nlog_level = \"loud\"\n".as_bytes();
        assert!(FileConfig::from_file(&mut file).is_err());
    }
}
