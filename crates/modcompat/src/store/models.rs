//! Store models used to map rows in the catalog tables to/from structs.
//!
//! Each model struct derives [`Model`], which provides functions to build SQL queries and
//! parameters from them, along with a conversion from a row.
//!
//! [Model]: derive::Model

use crate::{error::VersionError, version::Version};
use chrono::{DateTime, Utc};
use derive::Model;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The catalog ID of a [`Package`](Package).
pub type PackageId = i64;
/// The catalog ID of a [`PackageVersion`](PackageVersion).
pub type VersionId = i64;
/// The catalog ID of a [`Dependency`](Dependency).
pub type DependencyId = i64;
/// The catalog ID of a [`PlatformVersion`](PlatformVersion).
pub type PlatformVersionId = i64;

/// The kind of a [`Package`](Package).
#[derive(Debug, PartialEq, Eq, Copy, Clone, EnumString, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// A mod, which depends on the platform and possibly on other mods.
    #[strum(serialize = "mod")]
    Mod,
    /// An addon, which attaches to a single host mod.
    #[strum(serialize = "addon")]
    Addon,
}

/// A mod or an addon in the catalog.
///
/// Uses the [`id`](#structfield.id) field as index when querying the store database.
#[derive(Debug, PartialEq, Clone, Model, Serialize, Deserialize)]
pub struct Package {
    /// The package's catalog ID.
    #[index]
    pub id: PackageId,
    /// The package's unique human-facing identifier.
    pub slug: String,
    /// The package's kind.
    pub kind: PackageKind,
    /// The host mod an addon attaches to. Always `None` for mods.
    pub host_package: Option<PackageId>,
    /// Whether the package has been disabled by its author or a moderator.
    #[serde(default)]
    pub disabled: bool,
    /// When the package was published, if ever.
    pub published_at: Option<DateTime<Utc>>,
}

/// A single published version of a [`Package`](Package).
///
/// Uses the [`id`](#structfield.id) field as index when querying the store database.
#[derive(Debug, PartialEq, Clone, Model, Serialize, Deserialize)]
pub struct PackageVersion {
    /// The version's catalog ID.
    #[index]
    pub id: VersionId,
    /// The package this version belongs to. Corresponds to the [`id`][Package#structfield.id]
    /// field of a [`Package`].
    pub package: PackageId,
    /// The raw version string. Parsed on use, since the catalog doesn't validate it.
    pub version: String,
    /// Whether the version has been disabled.
    #[serde(default)]
    pub disabled: bool,
    /// When the version was published, if ever.
    pub published_at: Option<DateTime<Utc>>,
    /// A mod version's constraint on the platform version.
    pub platform_constraint: Option<String>,
    /// An addon version's constraint on its host mod's version.
    pub mod_constraint: Option<String>,
    /// The best platform version satisfying the [`platform
    /// constraint`](#structfield.platform_constraint), cached by the resolver.
    pub resolved_platform_version: Option<PlatformVersionId>,
}

/// A [`PackageVersion`'s](PackageVersion) dependency on another package.
///
/// Uses the [`id`](#structfield.id) field as index when querying the store database.
#[derive(Debug, PartialEq, Clone, Model, Serialize, Deserialize)]
pub struct Dependency {
    /// The dependency's catalog ID.
    #[index]
    pub id: DependencyId,
    /// The version that declares this dependency.
    pub source_version: VersionId,
    /// The package depended on.
    pub target_package: PackageId,
    /// The constraint on the target package's versions.
    pub version_constraint: String,
}

/// The version a [`Dependency`](Dependency) resolved to.
///
/// Uses the [`dependency`](#structfield.dependency) field as index when querying the store
/// database.
#[derive(Debug, PartialEq, Clone, Model, Serialize)]
pub struct ResolvedDependency {
    /// The resolved dependency. Corresponds to the [`id`][Dependency#structfield.id] field of a
    /// [`Dependency`].
    #[index]
    pub dependency: DependencyId,
    /// The best version of the dependency's target package.
    pub target_version: VersionId,
}

/// A host mod version an addon version is compatible with.
///
/// Uses the [`addon_version`](#structfield.addon_version) field as index when querying the store
/// database, so selecting and deleting apply to an addon version's whole compatibility set.
#[derive(Debug, PartialEq, Clone, Model, Serialize)]
pub struct AddonCompatibility {
    /// The addon version.
    #[index]
    pub addon_version: VersionId,
    /// The compatible host mod version.
    pub mod_version: VersionId,
}

/// A version of the platform mods run on.
///
/// Uses the [`id`](#structfield.id) field as index when querying the store database.
#[derive(Debug, PartialEq, Clone, Model, Serialize, Deserialize)]
pub struct PlatformVersion {
    /// The platform version's catalog ID.
    #[index]
    pub id: PlatformVersionId,
    /// The raw version string.
    pub version: String,
    /// When the platform version was published, if it has been scheduled or published at all.
    pub published_at: Option<DateTime<Utc>>,
}

/// Holds back publishing a mod version until a platform version has been published.
///
/// Uses both fields as indices when querying the store database.
#[derive(Debug, PartialEq, Clone, Model, Serialize, Deserialize)]
pub struct PinPlatformLink {
    /// The pinned mod version.
    #[index]
    pub mod_version: VersionId,
    /// The platform version the mod version waits for.
    #[index]
    pub platform_version: PlatformVersionId,
}

/// A row that carries a raw version string identified by a catalog ID.
pub trait RawVersion {
    /// Returns the row's catalog ID.
    fn id(&self) -> i64;
    /// Returns the row's raw version string.
    fn raw_version(&self) -> &str;

    /// Parses the row's version string.
    fn parse_version(&self) -> Result<Version, VersionError> {
        self.raw_version().parse()
    }
}

fn is_published(published_at: Option<DateTime<Utc>>, as_of: DateTime<Utc>) -> bool {
    published_at.map_or(false, |published_at| published_at <= as_of)
}

impl Package {
    /// Returns whether the package is visible at a given time: it isn't disabled and has been
    /// published at or before that time.
    pub fn is_visible(&self, as_of: DateTime<Utc>) -> bool {
        !self.disabled && is_published(self.published_at, as_of)
    }
}

impl PackageVersion {
    /// Returns whether the version is visible at a given time. Both the version and the package it
    /// belongs to must be visible.
    pub fn is_visible(&self, package: &Package, as_of: DateTime<Utc>) -> bool {
        package.id == self.package
            && package.is_visible(as_of)
            && !self.disabled
            && is_published(self.published_at, as_of)
    }
}

impl PlatformVersion {
    /// Returns whether the platform version has been published at or before a given time.
    pub fn is_visible(&self, as_of: DateTime<Utc>) -> bool {
        is_published(self.published_at, as_of)
    }
}

impl RawVersion for PackageVersion {
    fn id(&self) -> i64 {
        self.id
    }

    fn raw_version(&self) -> &str {
        &self.version
    }
}

impl RawVersion for PlatformVersion {
    fn id(&self) -> i64 {
        self.id
    }

    fn raw_version(&self) -> &str {
        &self.version
    }
}

text_column!(PackageKind);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    fn package(published_at: Option<DateTime<Utc>>) -> Package {
        Package {
            id: 1,
            slug: String::from("rails"),
            kind: PackageKind::Mod,
            host_package: None,
            disabled: false,
            published_at,
        }
    }

    fn version(published_at: Option<DateTime<Utc>>) -> PackageVersion {
        PackageVersion {
            id: 10,
            package: 1,
            version: String::from("1.0.0"),
            disabled: false,
            published_at,
            platform_constraint: None,
            mod_constraint: None,
            resolved_platform_version: None,
        }
    }

    #[test]
    fn package_visibility() {
        assert!(package(Some(now())).is_visible(now()));
        assert!(!package(Some(now() + Duration::seconds(1))).is_visible(now()));
        assert!(!package(None).is_visible(now()));

        let mut disabled = package(Some(now()));
        disabled.disabled = true;
        assert!(!disabled.is_visible(now()));
    }

    #[test]
    fn version_visibility_needs_visible_package() {
        let yesterday = Some(now() - Duration::days(1));

        assert!(version(yesterday).is_visible(&package(yesterday), now()));
        assert!(!version(yesterday).is_visible(&package(None), now()));
        assert!(!version(None).is_visible(&package(yesterday), now()));

        let mut disabled = version(yesterday);
        disabled.disabled = true;
        assert!(!disabled.is_visible(&package(yesterday), now()));
    }

    #[test]
    fn package_kind_strings() -> anyhow::Result<()> {
        assert_eq!("addon".parse::<PackageKind>()?, PackageKind::Addon);
        assert_eq!(PackageKind::Mod.to_string(), "mod");
        assert_eq!(serde_json::to_string(&PackageKind::Addon)?, "\"addon\"");

        Ok(())
    }

    #[test]
    fn deserialize_version_with_defaults() -> anyhow::Result<()> {
        let parsed: PackageVersion =
            serde_json::from_str(r#"{"id": 10, "package": 1, "version": "1.0.0"}"#)?;

        assert_eq!(parsed, version(None));
        assert_eq!(parsed.parse_version()?, Version::new(1, 0, 0));

        Ok(())
    }
}
