//! Resolves a package version's dependencies on other packages, each to the single best visible
//! version of its target package.

use super::{
    candidates::{self, Candidate},
    parse_constraint, ResolveReport, Resolver,
};
use crate::store::models::{PackageId, PackageVersion};
use log::*;
use std::collections::{hash_map::Entry, HashMap};

pub(super) fn resolve_dependencies(
    resolver: &Resolver,
    version: &PackageVersion,
    report: &mut ResolveReport,
) -> anyhow::Result<()> {
    let catalog = resolver.catalog;
    let dependencies = catalog.dependencies_of(version.id)?;
    // several dependencies of one version may target the same package
    let mut candidates: HashMap<PackageId, Vec<Candidate>> = HashMap::new();

    for dependency in &dependencies {
        report.dependencies += 1;

        let constraint = parse_constraint(
            &dependency.version_constraint,
            format_args!("dependency {} of version {}", dependency.id, version.id),
            report,
        );
        let best = match constraint {
            Some(constraint) => {
                let targets = match candidates.entry(dependency.target_package) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert(candidates::package_candidates(
                        catalog,
                        dependency.target_package,
                        resolver.as_of,
                        report,
                    )?),
                };

                constraint.best(targets).map(|(id, _)| *id)
            }
            None => None,
        };

        match best {
            Some(target_version) => {
                trace!(
                    "Dependency {} of version {} resolved to version {}",
                    dependency.id,
                    version.id,
                    target_version
                );
                report.resolved += 1;
            }
            None => {
                trace!(
                    "Dependency {} of version {} has no matching version",
                    dependency.id,
                    version.id
                );
                report.cleared += 1;
            }
        }

        if catalog.replace_resolved_dependency(dependency.id, best)? {
            report.changed += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::Catalog, testing::*};

    fn setup(catalog: &Catalog) -> anyhow::Result<()> {
        catalog.set_package(&mod_package(1, "rails"))?;
        catalog.set_package(&mod_package(2, "trains"))?;
        catalog.set_version(&mod_version(10, 1, "1.0.0"))?;
        for (id, version) in &[(20, "1.0.0"), (21, "1.1.0"), (22, "2.0.0"), (23, "1.2.0")] {
            catalog.set_version(&mod_version(*id, 2, version))?;
        }

        Ok(())
    }

    #[test]
    fn resolves_to_best_visible_version() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;
        let mut disabled = mod_version(23, 2, "1.2.0");
        disabled.disabled = true;
        catalog.set_version(&disabled)?;
        catalog.set_dependency(&dependency(1, 10, 2, ">=1.0.0 <2.0.0"))?;

        let report = Resolver::new(&catalog, now()).resolve(10)?;

        assert_eq!(
            catalog.resolved_dependency(1)?.map(|r| r.target_version),
            Some(21)
        );
        assert_eq!(report.resolved, 1);
        assert_eq!(report.changed, 1);

        Ok(())
    }

    #[test]
    fn resolving_twice_changes_nothing() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;
        catalog.set_dependency(&dependency(1, 10, 2, "^1.0"))?;
        catalog.set_dependency(&dependency(2, 10, 2, "*"))?;

        let resolver = Resolver::new(&catalog, now());
        let first = resolver.resolve(10)?;
        let second = resolver.resolve(10)?;

        assert_eq!(first.changed, 2);
        assert_eq!(second.changed, 0);
        assert_eq!(
            catalog.resolved_dependency(1)?.map(|r| r.target_version),
            Some(23)
        );
        assert_eq!(
            catalog.resolved_dependency(2)?.map(|r| r.target_version),
            Some(22)
        );

        Ok(())
    }

    #[test]
    fn no_match_clears_previous_resolution() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;
        catalog.set_dependency(&dependency(1, 10, 2, "^2"))?;

        let resolver = Resolver::new(&catalog, now());
        resolver.resolve(10)?;
        assert_eq!(
            catalog.resolved_dependency(1)?.map(|r| r.target_version),
            Some(22)
        );

        let mut disabled = mod_version(22, 2, "2.0.0");
        disabled.disabled = true;
        catalog.set_version(&disabled)?;

        let report = resolver.resolve(10)?;
        assert_eq!(catalog.resolved_dependency(1)?, None);
        assert_eq!(report.cleared, 1);
        assert_eq!(report.changed, 1);

        Ok(())
    }

    #[test]
    fn addon_target_matches_nothing() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;
        catalog.set_package(&addon_package(3, "skins", Some(2)))?;
        catalog.set_version(&addon_version(30, 3, "1.0.0", Some("*")))?;
        catalog.set_dependency(&dependency(1, 10, 3, "*"))?;

        let report = Resolver::new(&catalog, now()).resolve(10)?;

        assert_eq!(catalog.resolved_dependency(1)?, None);
        assert_eq!(report.resolved, 0);
        assert_eq!(report.cleared, 1);

        Ok(())
    }

    #[test]
    fn invalid_constraint_matches_nothing() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;
        catalog.set_dependency(&dependency(1, 10, 2, ">= banana"))?;
        catalog.set_dependency(&dependency(2, 10, 2, "1.0.0"))?;

        let report = Resolver::new(&catalog, now()).resolve(10)?;

        assert_eq!(catalog.resolved_dependency(1)?, None);
        assert_eq!(
            catalog.resolved_dependency(2)?.map(|r| r.target_version),
            Some(20)
        );
        assert_eq!(report.invalid_constraints, 1);
        assert_eq!(report.dependencies, 2);

        Ok(())
    }

    #[test]
    fn invalid_candidate_versions_are_skipped() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;
        catalog.set_version(&mod_version(24, 2, "9.0.0-"))?;
        catalog.set_dependency(&dependency(1, 10, 2, "*"))?;

        let report = Resolver::new(&catalog, now()).resolve(10)?;

        assert_eq!(
            catalog.resolved_dependency(1)?.map(|r| r.target_version),
            Some(22)
        );
        assert_eq!(report.invalid_versions, 1);

        Ok(())
    }

    #[test]
    fn future_versions_are_invisible_until_as_of() -> anyhow::Result<()> {
        let conn = memory_connection()?;
        let catalog = Catalog::new(&conn);
        setup(&catalog)?;
        let mut scheduled = mod_version(24, 2, "3.0.0");
        scheduled.published_at = Some(days_ago(-2));
        catalog.set_version(&scheduled)?;
        catalog.set_dependency(&dependency(1, 10, 2, ">=1"))?;

        Resolver::new(&catalog, now()).resolve(10)?;
        assert_eq!(
            catalog.resolved_dependency(1)?.map(|r| r.target_version),
            Some(22)
        );

        Resolver::new(&catalog, days_ago(-3)).resolve(10)?;
        assert_eq!(
            catalog.resolved_dependency(1)?.map(|r| r.target_version),
            Some(24)
        );

        Ok(())
    }
}
