//! Provides all error types the program uses.

use crate::store::models::VersionId;
use common::Identifier;
use thiserror::Error;

/// Represents all types of errors that can occur when parsing [`Version`s][Version].
///
/// [Version]: crate::version::Version
#[derive(Debug, Error, PartialEq)]
pub enum VersionError {
    /// The version string is empty.
    #[error("Empty version string")]
    Empty,
    /// A component of the version's numeric core is missing, such as in `1..2`.
    #[error("Missing version component in: {0}")]
    MissingComponent(String),
    /// The version's numeric core has more than three components.
    #[error("Too many version components in: {0}")]
    TooManyComponents(String),
    /// A component of the version's numeric core isn't an unsigned integer.
    #[error("Invalid version component '{component}' in: {version}")]
    InvalidComponent {
        /// The offending component.
        component: String,
        /// The whole version string.
        version: String,
    },
    /// The version has a `-` separator but no pre-release label after it.
    #[error("Empty pre-release label in: {0}")]
    EmptyLabel(String),
}

/// Represents all types of errors that can occur when parsing [`Constraint`s][Constraint].
///
/// [Constraint]: crate::constraint::Constraint
#[derive(Debug, Error, PartialEq)]
pub enum ConstraintError {
    /// The constraint string is empty.
    #[error("Empty constraint string")]
    Empty,
    /// One of the `||`-separated alternatives is empty.
    #[error("Empty alternative in constraint: {0}")]
    EmptyAlternative(String),
    /// A comparison operator isn't followed by a version.
    #[error("Operator without a version in constraint: {0}")]
    DanglingOperator(String),
    /// A hyphen range is missing one of its ends.
    #[error("Incomplete hyphen range in constraint: {0}")]
    DanglingHyphen(String),
    /// A comparator uses an operator that isn't recognised.
    #[error("Unknown operator in comparator: {0}")]
    UnknownOperator(String),
    /// A comparator's operator can't be combined with a wildcard version.
    #[error("Operator cannot be used with a wildcard: {0}")]
    UnsupportedWildcard(String),
    /// A wildcard component is followed by a non-wildcard component, such as in `1.*.3`.
    #[error("Wildcard must be the last given component: {0}")]
    WildcardNotTrailing(String),
    /// A comparator's version part is invalid.
    #[error("Invalid version in comparator: {0}")]
    InvalidVersion(#[from] VersionError),
}

/// Represents all types of errors that can occur when resolving or traversing the catalog.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Returned when looking up a package version that doesn't exist in the catalog.
    #[error("No such package version: {0}")]
    NoSuchVersion(VersionId),
    /// Returned when looking up a package that doesn't exist in the catalog.
    #[error("No such package: {0}")]
    NoSuchPackage(Identifier),
}

/// Represents all types of errors that can occur when interacting with the [`catalog
/// store`](crate::store::Store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A thread panicked while holding the store's connection, leaving it in an unknown state.
    #[error("Store connection mutex is poisoned")]
    ConnectionPoisoned,
    /// A stored option value couldn't be interpreted.
    #[error("Invalid value for store option {field}: {value}")]
    InvalidOption {
        /// The option's field.
        field: String,
        /// The stored value.
        value: String,
    },
}

/// Represents all types of errors that correspond to invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The sweep chunk size must be at least one.
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(u64),
}

/// Represents all types of errors that can occur when reading the command line.
#[derive(Debug, Error)]
pub enum OptsError {
    /// A command line value couldn't be parsed.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// The argument's name.
        name: &'static str,
        /// The given value.
        value: String,
    },
    /// No subcommand was given.
    #[error("No command given")]
    MissingCommand,
}
