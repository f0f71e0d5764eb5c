//! Resolves the version constraints a package version declares into concrete versions of other
//! packages and of the platform, and writes the results back into the catalog.
//!
//! Every flow gathers its candidates, keeps the visible ones, parses their versions (dropping and
//! logging invalid ones), applies the constraint and fully replaces the state it owns for the
//! version it resolves.

mod addon;
mod candidates;
mod dependency;
mod platform;

use crate::{
    constraint::Constraint,
    error::ResolveError,
    store::{
        models::{Package, PackageKind, PackageVersion, VersionId},
        Catalog,
    },
};
use chrono::{DateTime, Utc};
use log::*;
use serde::Serialize;
use std::{fmt::Display, ops::AddAssign};

/// Counts of what resolving one or more package versions did.
#[derive(Debug, Default, PartialEq, Clone, Serialize)]
pub struct ResolveReport {
    /// Package versions resolved.
    pub versions: usize,
    /// Dependencies processed.
    pub dependencies: usize,
    /// Dependencies and platform constraints that resolved to a version.
    pub resolved: usize,
    /// Dependencies and platform constraints without a matching version.
    pub cleared: usize,
    /// Stored resolutions that changed.
    pub changed: usize,
    /// Host mod versions found compatible with addon versions.
    pub compatible: usize,
    /// Candidate versions ignored because their version string is invalid.
    pub invalid_versions: usize,
    /// Constraints ignored because they're invalid.
    pub invalid_constraints: usize,
}

/// Resolves package versions against a catalog at a given point in time.
pub struct Resolver<'a, 'c> {
    catalog: &'a Catalog<'c>,
    as_of: DateTime<Utc>,
}

impl<'a, 'c> Resolver<'a, 'c> {
    /// Returns a new `Resolver` that treats the catalog as it's visible at `as_of`.
    pub fn new(catalog: &'a Catalog<'c>, as_of: DateTime<Utc>) -> Self {
        Self { catalog, as_of }
    }

    /// Runs every resolution flow that applies to a given package version: its dependencies
    /// always, its platform constraint if it's a mod version and its host mod compatibility if it's
    /// an addon version.
    ///
    /// # Errors
    /// Returns [`ResolveError::NoSuchVersion`] if the version doesn't exist. Storage errors are
    /// returned as-is. Invalid versions and constraints are never errors.
    pub fn resolve(&self, version_id: VersionId) -> anyhow::Result<ResolveReport> {
        let version = self
            .catalog
            .version(version_id)?
            .ok_or(ResolveError::NoSuchVersion(version_id))?;
        let mut report = ResolveReport {
            versions: 1,
            ..ResolveReport::default()
        };

        dependency::resolve_dependencies(self, &version, &mut report)?;

        match self.catalog.package(version.package)? {
            Some(package) => match package.kind {
                PackageKind::Mod => platform::resolve_platform(self, &version, &mut report)?,
                PackageKind::Addon => {
                    addon::resolve_addon_compatibility(self, &version, &package, &mut report)?
                }
            },
            None => debug!(
                "Version {} belongs to missing package {}, resolved dependencies only",
                version.id, version.package
            ),
        }

        trace!("Resolved version {}: {:?}", version_id, report);
        Ok(report)
    }
}

/// Returns the visible host mod versions an addon version was last resolved to be compatible
/// with, in ID order.
///
/// # Errors
/// Returns [`ResolveError::NoSuchVersion`] if the addon version doesn't exist.
pub fn compatible_host_versions(
    catalog: &Catalog,
    addon_version: VersionId,
    as_of: DateTime<Utc>,
) -> anyhow::Result<Vec<(Package, PackageVersion)>> {
    if catalog.version(addon_version)?.is_none() {
        return Err(ResolveError::NoSuchVersion(addon_version).into());
    }

    let mut compatible = Vec::new();
    for mod_version in catalog.compatible_versions_of(addon_version)? {
        match catalog.visible_version(mod_version, as_of)? {
            Some(host) => compatible.push(host),
            None => trace!(
                "Compatible host version {} of addon version {} isn't visible",
                mod_version,
                addon_version
            ),
        }
    }

    Ok(compatible)
}

impl AddAssign for ResolveReport {
    fn add_assign(&mut self, other: Self) {
        self.versions += other.versions;
        self.dependencies += other.dependencies;
        self.resolved += other.resolved;
        self.cleared += other.cleared;
        self.changed += other.changed;
        self.compatible += other.compatible;
        self.invalid_versions += other.invalid_versions;
        self.invalid_constraints += other.invalid_constraints;
    }
}

/// Parses a constraint belonging to `owner`. An invalid constraint is logged, counted and
/// returned as `None`.
fn parse_constraint<D>(raw: &str, owner: D, report: &mut ResolveReport) -> Option<Constraint>
where
    D: Display,
{
    match raw.parse() {
        Ok(constraint) => Some(constraint),
        Err(e) => {
            warn!("Ignoring invalid constraint '{}' of {}: {}", raw, owner, e);
            report.invalid_constraints += 1;
            None
        }
    }
}

/// Returns a nullable constraint column's value, treating a blank string as missing.
fn present(constraint: &Option<String>) -> Option<&str> {
    constraint.as_deref().filter(|raw| !raw.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn missing_version_is_an_error() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);

        let err = Resolver::new(&catalog, now())
            .resolve(404)
            .expect_err("resolving a missing version succeeded");
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::NoSuchVersion(404))
        ));

        Ok(())
    }

    #[test]
    fn version_without_dependencies() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        catalog.set_package(&mod_package(1, "rails"))?;
        catalog.set_version(&mod_version(10, 1, "1.0.0"))?;

        let report = Resolver::new(&catalog, now()).resolve(10)?;
        assert_eq!(report.versions, 1);
        assert_eq!(report.dependencies, 0);
        assert_eq!(report.changed, 0);

        Ok(())
    }

    #[test]
    fn compatible_host_versions_are_visible_ones() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        catalog.set_package(&mod_package(1, "rails"))?;
        for (id, version) in &[(10, "1.0.0"), (11, "1.5.0"), (12, "2.0.0")] {
            catalog.set_version(&mod_version(*id, 1, version))?;
        }
        catalog.set_package(&addon_package(2, "rails-skins", Some(1)))?;
        catalog.set_version(&addon_version(20, 2, "1.0", Some(">=1.0.0 <2.0.0")))?;

        Resolver::new(&catalog, now()).resolve(20)?;
        let compatible: Vec<String> = compatible_host_versions(&catalog, 20, now())?
            .into_iter()
            .map(|(_, version)| version.version)
            .collect();
        assert_eq!(compatible, vec!["1.0.0", "1.5.0"]);

        let mut disabled = mod_version(11, 1, "1.5.0");
        disabled.disabled = true;
        catalog.set_version(&disabled)?;
        assert_eq!(compatible_host_versions(&catalog, 20, now())?.len(), 1);

        assert!(compatible_host_versions(&catalog, 404, now()).is_err());

        Ok(())
    }

    #[test]
    fn reports_add_up() {
        let mut total = ResolveReport::default();
        total += ResolveReport {
            versions: 1,
            resolved: 2,
            ..ResolveReport::default()
        };
        total += ResolveReport {
            versions: 1,
            cleared: 1,
            invalid_versions: 3,
            ..ResolveReport::default()
        };

        assert_eq!(total.versions, 2);
        assert_eq!(total.resolved, 2);
        assert_eq!(total.cleared, 1);
        assert_eq!(total.invalid_versions, 3);
    }

    #[test]
    fn blank_constraints_are_missing() {
        assert_eq!(present(&None), None);
        assert_eq!(present(&Some(String::from("  "))), None);
        assert_eq!(present(&Some(String::from(">=1.0"))), Some(">=1.0"));
    }
}
