//! Provides [`Version`](Version), the semantic version every package version and platform version
//! in the catalog is ordered by.
//!
//! Catalog versions are written by humans, so parsing is lenient in the same places humans tend
//! to be sloppy, while still rejecting anything that can't be ordered reliably.

use crate::error::VersionError;
use serde::{de, de::Visitor, Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt::{self, Display},
    str::FromStr,
};

/// A semantic version.
///
/// Consists of the numeric [`major`](#structfield.major), [`minor`](#structfield.minor) and
/// [`patch`](#structfield.patch) components and an optional pre-release
/// [`label`](#structfield.label) (empty if the version has none).
///
/// # Parsing from a string
///
/// A `Version` is parsed from a string in the form of `major.minor.patch-label+build`. The
/// following restrictions and allowances apply:
/// * The `major` component is required.
/// * The `minor` and `patch` components are optional. If they're missing, they're defaulted to `0`.
/// * Each numeric component consists only of ASCII digits and fits into a `u64`.
/// * The pre-release label is everything after the first `-` and may not be empty.
/// * Build metadata after a `+` is accepted and discarded.
/// * A leading `v` or `V` and surrounding whitespace are ignored.
///
/// Examples of valid version strings:
/// * `1.0.0`
/// * `v2.1`
/// * `1.4.0-beta.2`
/// * `3.0.0+20201012`
///
/// # Ordering
///
/// Versions are ordered by their numeric components first. When those are equal, a version
/// without a label ranks above one with a label (a release beats its pre-releases) and two
/// labels are compared lexicographically.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Version {
    /// The major component.
    pub major: u64,
    /// The minor component.
    pub minor: u64,
    /// The patch component.
    pub patch: u64,
    /// The pre-release label. Empty for releases.
    pub label: String,
}

impl Version {
    /// Returns a new release version with the given numeric components.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            label: String::new(),
        }
    }

    /// Returns this version with a given pre-release label.
    pub fn with_label(self, label: &str) -> Self {
        Self {
            label: String::from(label),
            ..self
        }
    }

    /// Returns whether this version has a pre-release label.
    pub fn is_prerelease(&self) -> bool {
        !self.label.is_empty()
    }

    /// Returns the version's numeric components as a tuple.
    pub fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.core().cmp(&other.core()).then_with(|| {
            match (self.label.is_empty(), other.label.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.label.cmp(&other.label),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parses a single numeric version component.
pub(crate) fn parse_component(component: &str, version: &str) -> Result<u64, VersionError> {
    if component.is_empty() {
        return Err(VersionError::MissingComponent(version.to_owned()));
    }

    // u64's own parser accepts a leading '+'
    if !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidComponent {
            component: component.to_owned(),
            version: version.to_owned(),
        });
    }

    component.parse::<u64>().map_err(|_| VersionError::InvalidComponent {
        component: component.to_owned(),
        version: version.to_owned(),
    })
}

/// Splits a version string into its core and its optional label, dropping a leading `v`, build
/// metadata and surrounding whitespace.
pub(crate) fn split_label(s: &str) -> Result<(&str, &str), VersionError> {
    let trimmed = s.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    let without_build = trimmed.split('+').next().unwrap_or_default();

    match without_build.find('-') {
        Some(index) => {
            let label = &without_build[index + 1..];
            if label.is_empty() {
                Err(VersionError::EmptyLabel(s.to_owned()))
            } else {
                Ok((&without_build[..index], label))
            }
        }
        None => Ok((without_build, "")),
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(VersionError::Empty);
        }

        let (core, label) = split_label(s)?;
        let args: Vec<&str> = core.split('.').collect();
        if args.len() > 3 {
            return Err(VersionError::TooManyComponents(s.to_owned()));
        }

        let major = parse_component(args[0], s)?;
        let minor = args.get(1).map_or(Ok(0), |c| parse_component(c, s))?;
        let patch = args.get(2).map_or(Ok(0), |c| parse_component(c, s))?;

        Ok(Self {
            major,
            minor,
            patch,
            label: String::from(label),
        })
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.is_prerelease() {
            write!(f, "-{}", self.label)?;
        }

        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct VersionVisitor;

        impl<'de> Visitor<'de> for VersionVisitor {
            type Value = Version;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("version string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse::<Self::Value>()
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}
