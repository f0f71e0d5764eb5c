//! Provides the [`Opts`](Opts) struct, used to read and access the program's command line
//! arguments.

use crate::{config, error::OptsError, store::models::VersionId, sweep::SweepTarget, util::LogLevel};
use chrono::{DateTime, Utc};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use common::Identifier;
use std::{path::PathBuf, str::FromStr};
use strum::VariantNames;

/// Stores command line parameters.
#[derive(Debug)]
pub struct Opts {
    /// Path to the config file.
    pub config: PathBuf,
    /// Path to the catalog store database file.
    pub store: PathBuf,
    /// Whether to skip applying configuration from the environment variables.
    pub no_env: bool,
    /// Whether to skip applying configuration from the configuration file.
    pub no_conf: bool,
    /// The log level to use.
    pub log_level: Option<LogLevel>,
    /// The number of package versions resolved per sweep chunk.
    pub chunk_size: Option<u64>,
    /// The point in time the catalog is looked at. Defaults to now.
    pub as_of: Option<DateTime<Utc>>,
    /// The command to run.
    pub command: Command,
}

/// The commands the program runs.
#[derive(Debug, PartialEq)]
pub enum Command {
    /// Resolves a single package version.
    Resolve(VersionId),
    /// Resolves every version of a kind of packages.
    Sweep(SweepTarget),
    /// Resolves every version of one package.
    SweepPackage(Identifier),
    /// Prints the dependency tree of a package version.
    Tree(VersionId),
    /// Prints the host mod versions an addon version is compatible with.
    Compatible(VersionId),
    /// Publishes mod versions whose pinned platform versions have been published.
    PropagatePins,
    /// Imports a catalog snapshot file.
    Import(PathBuf),
}

impl Opts {
    /// Builds a new `clap::App` used to parse a given set of command line parameters.
    fn build_app() -> App<'static, 'static> {
        App::new(clap::crate_name!())
            .version(clap::crate_version!())
            .author(clap::crate_authors!())
            .about(clap::crate_description!())
            .setting(AppSettings::SubcommandRequiredElseHelp)
            .arg(
                Arg::with_name("config")
                    .short("c")
                    .long("config")
                    .value_name("FILE")
                    .default_value(config::DEFAULT_CONFIG_FILE_LOCATION)
                    .help("Sets a custom config file")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("store")
                    .long("store")
                    .value_name("FILE")
                    .default_value(config::DEFAULT_STORE_FILE_LOCATION)
                    .help(
                        "Sets a custom catalog store file. The special value '_memory' specifies an ephemeral \
                         in-memory store, which is primarily used for debugging purposes.",
                    )
                    .takes_value(true),
            )
            .arg(Arg::with_name("no-env").long("no-env").help(
                "Skip loading configuration values from the environment variables. Primarily used for debugging \
                 purposes.",
            ))
            .arg(
                Arg::with_name("no-conf").long("no-conf").help(
                    "Skip loading configuration values from the config file. Primarily used for debugging purposes.",
                ),
            )
            .arg(
                Arg::with_name("log-level")
                    .long("log-level")
                    .value_name("LOG LEVEL")
                    .possible_values(LogLevel::VARIANTS)
                    .takes_value(true)
                    .help("Specify the log level to use."),
            )
            .arg(
                Arg::with_name("chunk-size")
                    .long("chunk-size")
                    .value_name("VERSIONS")
                    .takes_value(true)
                    .help("Specify how many package versions a sweep resolves per chunk."),
            )
            .arg(
                Arg::with_name("as-of")
                    .long("as-of")
                    .value_name("RFC3339")
                    .takes_value(true)
                    .help("Look at the catalog as it is at a given point in time instead of now."),
            )
            .subcommand(
                SubCommand::with_name("resolve")
                    .about("Resolves a single package version")
                    .arg(Arg::with_name("VERSION_ID").required(true).index(1)),
            )
            .subcommand(
                SubCommand::with_name("sweep")
                    .about("Resolves every version of mods, addons or all packages")
                    .arg(
                        Arg::with_name("TARGET")
                            .required(true)
                            .possible_values(SweepTarget::VARIANTS)
                            .index(1),
                    ),
            )
            .subcommand(
                SubCommand::with_name("sweep-package")
                    .about("Resolves every version of a package")
                    .arg(Arg::with_name("ID_OR_SLUG").required(true).index(1)),
            )
            .subcommand(
                SubCommand::with_name("tree")
                    .about("Prints the dependency tree of a package version as JSON")
                    .arg(Arg::with_name("VERSION_ID").required(true).index(1)),
            )
            .subcommand(
                SubCommand::with_name("compatible")
                    .about("Prints the host mod versions an addon version is compatible with as JSON")
                    .arg(Arg::with_name("ADDON_VERSION_ID").required(true).index(1)),
            )
            .subcommand(
                SubCommand::with_name("propagate-pins")
                    .about("Publishes mod versions whose pinned platform versions have been published"),
            )
            .subcommand(
                SubCommand::with_name("import")
                    .about("Imports a JSON catalog snapshot into the store")
                    .arg(Arg::with_name("FILE").required(true).index(1)),
            )
    }

    /// Returns a new `Opts` object from a given set of matched command line parameters.
    fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        Ok(Opts {
            config: matches
                .value_of_os("config")
                .map_or_else(|| config::DEFAULT_CONFIG_FILE_LOCATION.into(), PathBuf::from),
            store: matches
                .value_of_os("store")
                .map_or_else(|| config::DEFAULT_STORE_FILE_LOCATION.into(), PathBuf::from),
            no_env: matches.is_present("no-env"),
            no_conf: matches.is_present("no-conf"),
            log_level: parse_value(matches, "log-level")?,
            chunk_size: parse_value(matches, "chunk-size")?,
            as_of: parse_value(matches, "as-of")?,
            command: Command::from_matches(matches)?,
        })
    }

    /// Returns a new `Opts` object built from the program's command line parameters.
    pub fn get() -> anyhow::Result<Opts> {
        Opts::from_matches(&Opts::build_app().get_matches())
    }

    /// Returns a new `Opts` object built from custom command line parameters.
    pub fn custom_args(args: &[&str]) -> anyhow::Result<Opts> {
        let mut full_args = vec!["modcompat"];
        full_args.extend_from_slice(args);
        Opts::from_matches(&Opts::build_app().get_matches_from_safe(&full_args)?)
    }
}

impl Command {
    fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let command = match matches.subcommand() {
            ("resolve", Some(sub)) => Command::Resolve(required_value(sub, "VERSION_ID")?),
            ("sweep", Some(sub)) => Command::Sweep(required_value(sub, "TARGET")?),
            ("sweep-package", Some(sub)) => Command::SweepPackage(required_value(sub, "ID_OR_SLUG")?),
            ("tree", Some(sub)) => Command::Tree(required_value(sub, "VERSION_ID")?),
            ("compatible", Some(sub)) => Command::Compatible(required_value(sub, "ADDON_VERSION_ID")?),
            ("propagate-pins", _) => Command::PropagatePins,
            ("import", Some(sub)) => Command::Import(
                sub.value_of_os("FILE")
                    .map(PathBuf::from)
                    .ok_or(OptsError::MissingCommand)?,
            ),
            _ => return Err(OptsError::MissingCommand.into()),
        };

        Ok(command)
    }
}

/// Parses an optional argument's value.
fn parse_value<T>(matches: &ArgMatches, name: &'static str) -> Result<Option<T>, OptsError>
where
    T: FromStr,
{
    matches
        .value_of(name)
        .map(|value| {
            value.parse().map_err(|_| OptsError::InvalidValue {
                name,
                value: String::from(value),
            })
        })
        .transpose()
}

/// Parses a required argument's value.
fn required_value<T>(matches: &ArgMatches, name: &'static str) -> Result<T, OptsError>
where
    T: FromStr,
{
    parse_value(matches, name)?.ok_or(OptsError::MissingCommand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let opts = Opts::custom_args(&["propagate-pins"])?;

        assert_eq!(opts.config, PathBuf::from(config::DEFAULT_CONFIG_FILE_LOCATION));
        assert_eq!(opts.store, PathBuf::from(config::DEFAULT_STORE_FILE_LOCATION));
        assert!(!opts.no_env);
        assert_eq!(opts.log_level, None);
        assert_eq!(opts.as_of, None);
        assert_eq!(opts.command, Command::PropagatePins);

        Ok(())
    }

    #[test]
    fn global_options() -> anyhow::Result<()> {
        let opts = Opts::custom_args(&[
            "--store",
            "_memory",
            "--no-env",
            "--log-level",
            "debug",
            "--chunk-size",
            "20",
            "--as-of",
            "2026-10-16T12:00:00Z",
            "resolve",
            "42",
        ])?;

        assert_eq!(opts.store, PathBuf::from("_memory"));
        assert!(opts.no_env);
        assert_eq!(opts.log_level, Some(LogLevel::Debug));
        assert_eq!(opts.chunk_size, Some(20));
        assert_eq!(opts.as_of, Some(crate::testing::now()));
        assert_eq!(opts.command, Command::Resolve(42));

        Ok(())
    }

    #[test]
    fn subcommands() -> anyhow::Result<()> {
        assert_eq!(
            Opts::custom_args(&["sweep", "addons"])?.command,
            Command::Sweep(SweepTarget::Addons)
        );
        assert_eq!(
            Opts::custom_args(&["sweep-package", "rails"])?.command,
            Command::SweepPackage(Identifier::BySlug(String::from("rails")))
        );
        assert_eq!(
            Opts::custom_args(&["sweep-package", "12"])?.command,
            Command::SweepPackage(Identifier::ById(12))
        );
        assert_eq!(
            Opts::custom_args(&["import", "catalog.json"])?.command,
            Command::Import(PathBuf::from("catalog.json"))
        );

        Ok(())
    }

    #[test]
    fn invalid_values() {
        assert!(Opts::custom_args(&["resolve", "latest"]).is_err());
        assert!(Opts::custom_args(&["--chunk-size", "many", "propagate-pins"]).is_err());
        assert!(Opts::custom_args(&["sweep", "everything"]).is_err());
        assert!(Opts::custom_args(&[]).is_err());
    }
}
